//! Error types for the tutor

use thiserror::Error;

/// Result type alias for tutor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running a conversational turn or serving the API
#[derive(Debug, Error)]
pub enum Error {
    /// Required input (audio or text) was not supplied
    #[error("{0}")]
    InputMissing(String),

    /// Configuration error (missing credential, voice id, or invalid setting)
    #[error("configuration error: {0}")]
    Config(String),

    /// Speech-to-text failed
    #[error("transcription failed: {0}")]
    Transcription(String),

    /// Feedback generation failed
    #[error("feedback generation failed: {0}")]
    Feedback(String),

    /// Text-to-speech failed
    #[error("speech synthesis failed: {0}")]
    Synthesis(String),

    /// Microphone access denied or no input device
    #[error("microphone unavailable: {0}")]
    MicrophoneUnavailable(String),

    /// Local audio device or codec error
    #[error("audio error: {0}")]
    Audio(String),

    /// Pipeline asked to do something its current state does not allow
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error came from one of the hosted services
    #[must_use]
    pub const fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Transcription(_) | Self::Feedback(_) | Self::Synthesis(_)
        )
    }
}
