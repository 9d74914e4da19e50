//! Client for this crate's own `/api` passthrough endpoints
//!
//! Lets a capture client run without holding any provider credentials: the
//! server adds the keys and forwards to the hosted services.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{AUDIO_MPEG, AudioClip, FeedbackGenerator, SynthesizedAudio, Synthesizer, Transcriber};
use crate::conversation::ConversationTurn;
use crate::{Error, Result};

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: Option<String>,
}

#[derive(Serialize)]
struct FeedbackRequest<'a> {
    text: &'a str,
    conversations: &'a [ConversationTurn],
}

#[derive(Deserialize)]
struct FeedbackResponse {
    feedback: Option<String>,
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for a running tutor server
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the server at `base_url` (e.g. `http://127.0.0.1:3000`)
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, route: &str) -> String {
        format!("{}/api/{route}", self.base_url)
    }
}

/// Pull the server's `{"error": ...}` message out of a failed response
async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) => format!("{status}: {}", parsed.error),
        Err(_) if body.is_empty() => status.to_string(),
        Err(_) => format!("{status}: {body}"),
    }
}

#[async_trait]
impl Transcriber for ApiClient {
    async fn transcribe(&self, clip: &AudioClip) -> Result<String> {
        if clip.is_empty() {
            return Err(Error::InputMissing("No file provided".to_string()));
        }

        let file = reqwest::multipart::Part::bytes(clip.bytes.clone())
            .file_name(clip.file_name.clone())
            .mime_str(&clip.mime_type)
            .map_err(|e| Error::Transcription(e.to_string()))?;

        let form = reqwest::multipart::Form::new()
            .part("file", file)
            .text("model", clip.model.clone())
            .text("language", clip.language.clone());

        let response = self
            .client
            .post(self.endpoint("speech-to-text"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Transcription(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Transcription(error_message(response).await));
        }

        let body: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| Error::Transcription(format!("invalid response: {e}")))?;

        body.text
            .ok_or_else(|| Error::Transcription("response has no text".to_string()))
    }
}

#[async_trait]
impl FeedbackGenerator for ApiClient {
    async fn generate_feedback(
        &self,
        user_text: &str,
        history: &[ConversationTurn],
    ) -> Result<String> {
        let request = FeedbackRequest {
            text: user_text,
            conversations: history,
        };

        let response = self
            .client
            .post(self.endpoint("generate-feedback"))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Feedback(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Feedback(error_message(response).await));
        }

        let body: FeedbackResponse = response
            .json()
            .await
            .map_err(|e| Error::Feedback(format!("invalid response: {e}")))?;

        body.feedback
            .filter(|f| !f.trim().is_empty())
            .ok_or_else(|| Error::Feedback("response has no feedback".to_string()))
    }
}

#[async_trait]
impl Synthesizer for ApiClient {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio> {
        let response = self
            .client
            .post(self.endpoint("text-to-speech"))
            .json(&SpeechRequest { text })
            .send()
            .await
            .map_err(|e| Error::Synthesis(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Synthesis(error_message(response).await));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(AUDIO_MPEG)
            .to_string();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Synthesis(e.to_string()))?;

        if bytes.is_empty() {
            return Err(Error::Synthesis("server returned no audio".to_string()));
        }

        Ok(SynthesizedAudio {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}
