//! TOML configuration file loading
//!
//! Supports `~/.config/tutor-voice/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TutorConfigFile {
    #[serde(default)]
    pub server: ServerFileConfig,

    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,

    #[serde(default)]
    pub speech: SpeechFileConfig,

    #[serde(default)]
    pub capture: CaptureFileConfig,

    #[serde(default)]
    pub client: ClientFileConfig,
}

/// HTTP server configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Directory of static files (browser UI) served as fallback
    pub static_dir: Option<String>,
    /// Requests per minute across the API; unset disables limiting
    pub rate_limit_rpm: Option<u32>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
    pub elevenlabs: Option<String>,
}

/// Speech and language model configuration
#[derive(Debug, Default, Deserialize)]
pub struct SpeechFileConfig {
    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,
    /// Recognition language (e.g. "en")
    pub language: Option<String>,
    /// Chat model for feedback (e.g. "gpt-4")
    pub llm_model: Option<String>,
    /// TTS model (e.g. `eleven_monolingual_v1`)
    pub tts_model: Option<String>,
    /// `ElevenLabs` voice identifier
    pub voice_id: Option<String>,
    pub stability: Option<f32>,
    pub similarity_boost: Option<f32>,
    pub openai_base_url: Option<String>,
    pub elevenlabs_base_url: Option<String>,
}

/// Push-to-talk capture configuration
#[derive(Debug, Default, Deserialize)]
pub struct CaptureFileConfig {
    /// Minimum hold before recording starts, in milliseconds
    pub hold_ms: Option<u64>,
    /// Level meter refresh interval, in milliseconds
    pub level_interval_ms: Option<u64>,
}

/// Talk client configuration
#[derive(Debug, Default, Deserialize)]
pub struct ClientFileConfig {
    /// Base URL of a running `tutor serve`
    pub server_url: Option<String>,
}

/// Parse configuration file contents
///
/// # Errors
///
/// Returns error if the contents are not valid TOML for this schema
pub fn parse_config(content: &str) -> Result<TutorConfigFile> {
    toml::from_str(content).map_err(|e| Error::Config(format!("invalid config file: {e}")))
}

/// Load the TOML config file
///
/// An explicit path must exist and parse. The standard path is optional:
/// a missing or unparsable file falls back to defaults with a warning.
///
/// # Errors
///
/// Returns error if an explicitly given file cannot be read or parsed
pub fn load_config_file(explicit: Option<&Path>) -> Result<TutorConfigFile> {
    if let Some(path) = explicit {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        let config = parse_config(&content)?;
        tracing::info!(path = %path.display(), "loaded config file");
        return Ok(config);
    }

    let Some(path) = config_file_path() else {
        return Ok(TutorConfigFile::default());
    };

    if !path.exists() {
        return Ok(TutorConfigFile::default());
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match parse_config(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                Ok(config)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                Ok(TutorConfigFile::default())
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            Ok(TutorConfigFile::default())
        }
    }
}

/// Return the config file path: `~/.config/tutor-voice/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("tutor-voice").join("config.toml"))
}
