//! `OpenAI` provider: Whisper transcription and chat-completion feedback

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::conversation::ConversationTurn;
use crate::gateway::{AudioClip, FeedbackGenerator, Transcriber};
use crate::prompt::{self, ChatMessage};
use crate::{Error, Result};

/// Default API base URL
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default chat model for feedback
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4";

/// Response from the Whisper transcription API
#[derive(Deserialize)]
struct WhisperResponse {
    text: Option<String>,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Client for the `OpenAI` audio and chat APIs
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    base_url: String,
    chat_model: String,
    system_prompt: String,
}

impl OpenAiClient {
    /// Create a client; a missing key is reported on first use
    #[must_use]
    pub fn new(api_key: Option<SecretString>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            system_prompt: prompt::TUTOR_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Point the client at another API root (proxies, tests)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    #[must_use]
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    /// Whether an API key is configured
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn bearer(&self) -> Result<String> {
        self.api_key
            .as_ref()
            .map(|key| format!("Bearer {}", key.expose_secret()))
            .ok_or_else(|| Error::Config("OpenAI API key not configured".to_string()))
    }
}

#[async_trait]
impl Transcriber for OpenAiClient {
    async fn transcribe(&self, clip: &AudioClip) -> Result<String> {
        let auth = self.bearer()?;
        if clip.is_empty() {
            return Err(Error::InputMissing("No file provided".to_string()));
        }

        tracing::debug!(
            audio_bytes = clip.len(),
            model = %clip.model,
            language = %clip.language,
            "starting Whisper transcription"
        );

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
            .post(format!("{}/audio/transcriptions", self.base_url))
            .header("Authorization", auth)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Whisper request failed");
                Error::Transcription(e.to_string())
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Transcription(format!(
                "Whisper API error {status}: {body}"
            )));
        }

        let result: WhisperResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse response");
            Error::Transcription(e.to_string())
        })?;

        let text = result
            .text
            .ok_or_else(|| Error::Transcription("response has no text".to_string()))?;

        tracing::info!(transcript = %text, "transcription complete");
        Ok(text)
    }
}

#[async_trait]
impl FeedbackGenerator for OpenAiClient {
    async fn generate_feedback(
        &self,
        user_text: &str,
        history: &[ConversationTurn],
    ) -> Result<String> {
        let auth = self.bearer()?;

        let request = ChatCompletionRequest {
            model: &self.chat_model,
            messages: prompt::build_messages(&self.system_prompt, history, user_text),
        };

        tracing::debug!(
            model = %self.chat_model,
            history_turns = history.len(),
            "requesting feedback"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", auth)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "chat completion request failed");
                Error::Feedback(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "chat completion API error");
            return Err(Error::Feedback(format!(
                "OpenAI API error {status}: {body}"
            )));
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Feedback(format!("failed to parse response: {e}")))?;

        let feedback = result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| Error::Feedback("model returned no content".to_string()))?;

        tracing::info!(chars = feedback.len(), "feedback generated");
        Ok(feedback)
    }
}
