//! Gateways to the speech-to-text, feedback, and text-to-speech services
//!
//! Each gateway is a trait so the turn pipeline can talk either to the hosted
//! providers directly (see [`crate::providers`]) or to this crate's own HTTP
//! passthrough endpoints (see [`remote::ApiClient`]).

pub mod remote;

pub use remote::ApiClient;

use async_trait::async_trait;

use crate::Result;
use crate::conversation::ConversationTurn;

/// Default speech recognition model hint
pub const DEFAULT_STT_MODEL: &str = "whisper-1";

/// Default recognition language (ISO 639-1)
pub const DEFAULT_LANGUAGE: &str = "en";

/// Content type of synthesized speech
pub const AUDIO_MPEG: &str = "audio/mpeg";

/// A recorded utterance ready for transcription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
    /// Recognition model hint (e.g. "whisper-1")
    pub model: String,
    /// Language hint (e.g. "en")
    pub language: String,
}

impl AudioClip {
    /// Wrap WAV bytes with the default model and language hints
    #[must_use]
    pub fn wav(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            file_name: "audio.wav".to_string(),
            mime_type: "audio/wav".to_string(),
            model: DEFAULT_STT_MODEL.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }

    /// Override the model and language hints
    #[must_use]
    pub fn with_hints(mut self, model: impl Into<String>, language: impl Into<String>) -> Self {
        self.model = model.into();
        self.language = language.into();
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Encoded speech returned by a synthesizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl SynthesizedAudio {
    #[must_use]
    pub fn mpeg(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            content_type: AUDIO_MPEG.to_string(),
        }
    }

    /// Declared length of the payload in bytes
    #[must_use]
    pub fn content_length(&self) -> usize {
        self.bytes.len()
    }
}

/// Converts an audio clip to text
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe the clip using its model and language hints
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Transcription`] if the service is unreachable,
    /// answers with a non-success status, or returns no text
    async fn transcribe(&self, clip: &AudioClip) -> Result<String>;
}

/// Produces tutor feedback for a learner utterance
#[async_trait]
pub trait FeedbackGenerator: Send + Sync {
    /// Generate feedback for `user_text` given the prior conversation
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Feedback`] if the service is unreachable,
    /// answers with a non-success status, or returns empty content
    async fn generate_feedback(
        &self,
        user_text: &str,
        history: &[ConversationTurn],
    ) -> Result<String>;
}

/// Converts text to speech
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize `text` with the configured voice
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if the credential or voice id is
    /// missing, or [`crate::Error::Synthesis`] if the service fails or returns
    /// no audio
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio>;
}
