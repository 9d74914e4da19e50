//! Configuration management for the tutor

pub mod file;

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;

use crate::gateway::{DEFAULT_LANGUAGE, DEFAULT_STT_MODEL};
use crate::providers::elevenlabs::{DEFAULT_ELEVENLABS_BASE_URL, DEFAULT_TTS_MODEL};
use crate::providers::openai::{DEFAULT_CHAT_MODEL, DEFAULT_OPENAI_BASE_URL};
use crate::{Error, Result};

use file::TutorConfigFile;

/// Default API server port
pub const DEFAULT_PORT: u16 = 3000;

/// Default press-and-hold threshold before recording starts
pub const DEFAULT_HOLD_THRESHOLD: Duration = Duration::from_millis(500);

/// Default level meter refresh (roughly one animation frame)
pub const DEFAULT_LEVEL_INTERVAL: Duration = Duration::from_millis(16);

/// Tutor configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP API server configuration
    pub server: ServerConfig,

    /// API keys
    pub api_keys: ApiKeys,

    /// Speech, language and voice model configuration
    pub speech: SpeechConfig,

    /// Push-to-talk capture configuration
    pub capture: CaptureConfig,

    /// Talk client configuration
    pub client: ClientConfig,
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Path to static files directory (browser UI)
    pub static_dir: Option<PathBuf>,

    /// Global requests-per-minute limit for the API
    pub rate_limit_rpm: Option<u32>,
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (Whisper and chat completions)
    pub openai: Option<SecretString>,

    /// `ElevenLabs` API key (speech synthesis)
    pub elevenlabs: Option<SecretString>,
}

/// Speech and model configuration
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub stt_model: String,
    pub language: String,
    pub llm_model: String,
    pub tts_model: String,
    /// `ElevenLabs` voice; synthesis is refused while unset
    pub voice_id: Option<String>,
    pub stability: f32,
    pub similarity_boost: f32,
    pub openai_base_url: String,
    pub elevenlabs_base_url: String,
}

/// Push-to-talk capture configuration
#[derive(Debug, Clone, Copy)]
pub struct CaptureConfig {
    pub hold_threshold: Duration,
    pub level_interval: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            hold_threshold: DEFAULT_HOLD_THRESHOLD,
            level_interval: DEFAULT_LEVEL_INTERVAL,
        }
    }
}

/// Talk client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the tutor API server
    pub server_url: String,
}

impl Config {
    /// Load configuration from the environment and the config file
    ///
    /// Precedence is env > toml > default.
    ///
    /// # Errors
    ///
    /// Returns error if an explicit config file is unreadable or a setting is
    /// out of range
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let fc = file::load_config_file(config_path)?;
        Self::from_sources(|key| std::env::var(key).ok(), fc)
    }

    /// Build configuration from an environment lookup and a parsed file
    ///
    /// # Errors
    ///
    /// Returns error if a setting is out of range
    pub fn from_sources<F>(env: F, fc: TutorConfigFile) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty variables count as unset
        let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let api_keys = ApiKeys {
            openai: var("OPENAI_API_KEY")
                .or(fc.api_keys.openai)
                .map(SecretString::from),
            elevenlabs: var("ELEVENLABS_API_KEY")
                .or(fc.api_keys.elevenlabs)
                .map(SecretString::from),
        };

        let server = ServerConfig {
            host: var("TUTOR_HOST")
                .or(fc.server.host)
                .unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_var(&var, "TUTOR_PORT")
                .or(fc.server.port)
                .unwrap_or(DEFAULT_PORT),
            static_dir: var("TUTOR_STATIC_DIR")
                .or(fc.server.static_dir)
                .map(PathBuf::from),
            rate_limit_rpm: parse_var(&var, "TUTOR_RATE_LIMIT_RPM").or(fc.server.rate_limit_rpm),
        };

        let speech = SpeechConfig {
            stt_model: var("TUTOR_STT_MODEL")
                .or(fc.speech.stt_model)
                .unwrap_or_else(|| DEFAULT_STT_MODEL.to_string()),
            language: var("TUTOR_LANGUAGE")
                .or(fc.speech.language)
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            llm_model: var("TUTOR_LLM_MODEL")
                .or(fc.speech.llm_model)
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            tts_model: var("TUTOR_TTS_MODEL")
                .or(fc.speech.tts_model)
                .unwrap_or_else(|| DEFAULT_TTS_MODEL.to_string()),
            voice_id: var("ELEVENLABS_VOICE_ID").or(fc.speech.voice_id),
            stability: fc.speech.stability.unwrap_or(0.5),
            similarity_boost: fc.speech.similarity_boost.unwrap_or(0.5),
            openai_base_url: var("TUTOR_OPENAI_BASE_URL")
                .or(fc.speech.openai_base_url)
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            elevenlabs_base_url: var("TUTOR_ELEVENLABS_BASE_URL")
                .or(fc.speech.elevenlabs_base_url)
                .unwrap_or_else(|| DEFAULT_ELEVENLABS_BASE_URL.to_string()),
        };

        let capture = CaptureConfig {
            hold_threshold: parse_var(&var, "TUTOR_HOLD_MS")
                .or(fc.capture.hold_ms)
                .map_or(DEFAULT_HOLD_THRESHOLD, Duration::from_millis),
            level_interval: fc
                .capture
                .level_interval_ms
                .map_or(DEFAULT_LEVEL_INTERVAL, Duration::from_millis),
        };

        let client = ClientConfig {
            server_url: var("TUTOR_SERVER_URL")
                .or(fc.client.server_url)
                .unwrap_or_else(|| format!("http://{}:{}", server.host, server.port)),
        };

        let config = Self {
            server,
            api_keys,
            speech,
            capture,
            client,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("stability", self.speech.stability),
            ("similarity_boost", self.speech.similarity_boost),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "{name} must be between 0.0 and 1.0, got {value}"
                )));
            }
        }

        if self.capture.level_interval.is_zero() {
            return Err(Error::Config("level_interval_ms must be positive".to_string()));
        }

        if self.server.rate_limit_rpm == Some(0) {
            return Err(Error::Config("rate_limit_rpm must be positive".to_string()));
        }

        Ok(())
    }
}

/// Parse a numeric variable, ignoring (with a warning) values that don't parse
fn parse_var<T, F>(var: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = var(key)?;
    raw.trim().parse().map_or_else(
        |_| {
            tracing::warn!(key, value = %raw, "ignoring unparsable setting");
            None
        },
        Some,
    )
}
