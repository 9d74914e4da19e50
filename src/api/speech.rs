//! Speech passthrough endpoints
//!
//! `POST /speech-to-text`, `POST /generate-feedback` and `POST /text-to-speech`
//! add the server-held credentials and forward to the configured gateways.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, State, multipart::MultipartRejection,
        rejection::JsonRejection,
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};

use super::ApiState;
use crate::Error;
use crate::conversation::ConversationTurn;
use crate::gateway::{AudioClip, DEFAULT_LANGUAGE, DEFAULT_STT_MODEL};

/// Upload ceiling for recordings, matching the Whisper API limit
const MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

/// Build speech router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/speech-to-text", post(speech_to_text))
        .route("/generate-feedback", post(generate_feedback))
        .route("/text-to-speech", post(text_to_speech))
        .layer(DefaultBodyLimit::max(MAX_AUDIO_BYTES))
        .with_state(state)
}

/// Transcription response
#[derive(Debug, Serialize)]
pub struct TranscriptionResponse {
    pub text: String,
}

/// Transcribe an uploaded recording
///
/// Multipart fields: `file` (required), `model` and `language` (optional)
async fn speech_to_text(
    State(state): State<Arc<ApiState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<TranscriptionResponse>, ApiError> {
    let mut multipart = multipart.map_err(|_| ApiError::BadRequest("No file provided".to_string()))?;

    let mut file: Option<(Vec<u8>, Option<String>, Option<String>)> = None;
    let mut model = None;
    let mut language = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("failed to read file: {e}")))?;
                file = Some((bytes.to_vec(), file_name, content_type));
            }
            "model" | "language" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("invalid {name} field: {e}")))?;
                let value = Some(value).filter(|v| !v.trim().is_empty());
                if name == "model" {
                    model = value;
                } else {
                    language = value;
                }
            }
            other => tracing::debug!(field = other, "ignoring multipart field"),
        }
    }

    let Some((bytes, file_name, content_type)) = file.filter(|(b, _, _)| !b.is_empty()) else {
        return Err(ApiError::BadRequest("No file provided".to_string()));
    };

    let mut clip = AudioClip::wav(bytes).with_hints(
        model.unwrap_or_else(|| DEFAULT_STT_MODEL.to_string()),
        language.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
    );
    if let Some(file_name) = file_name {
        clip.file_name = file_name;
    }
    if let Some(content_type) = content_type {
        clip.mime_type = content_type;
    }

    tracing::debug!(
        audio_bytes = clip.len(),
        file_name = %clip.file_name,
        model = %clip.model,
        "transcription request"
    );

    let text = state.transcriber.transcribe(&clip).await?;
    Ok(Json(TranscriptionResponse { text }))
}

/// Feedback request
#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub conversations: Vec<ConversationTurn>,
}

/// Feedback response
#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub feedback: String,
}

/// Generate tutor feedback for a learner utterance
async fn generate_feedback(
    State(state): State<Arc<ApiState>>,
    request: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Result<Json<FeedbackResponse>, ApiError> {
    let Json(request) = request.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let text = required_text(request.text)?;
    tracing::debug!(
        chars = text.len(),
        history_turns = request.conversations.len(),
        "feedback request"
    );

    let feedback = state
        .feedback
        .generate_feedback(&text, &request.conversations)
        .await?;

    Ok(Json(FeedbackResponse { feedback }))
}

/// Synthesis request
#[derive(Debug, Deserialize)]
pub struct SpeechRequest {
    #[serde(default)]
    pub text: Option<String>,
}

/// Synthesize speech; returns the audio bytes with their declared length
///
/// The body is validated before the synthesizer is consulted, so a request
/// without text is a 400 even when no voice is configured.
async fn text_to_speech(
    State(state): State<Arc<ApiState>>,
    request: Result<Json<SpeechRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = request.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let text = required_text(request.text)?;
    let audio = state.synthesizer.synthesize(&text).await?;
    let length = audio.content_length();

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, audio.content_type),
            (header::CONTENT_LENGTH, length.to_string()),
        ],
        audio.bytes,
    )
        .into_response())
}

fn required_text(text: Option<String>) -> Result<String, ApiError> {
    text.filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Text is required".to_string()))
}

/// Speech API errors, rendered as `{"error": "..."}`
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::InputMissing(msg) => Self::BadRequest(msg),
            other => {
                tracing::error!(error = %other, "speech request failed");
                Self::Internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        let (status, error) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}
