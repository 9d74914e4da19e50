//! `ElevenLabs` text-to-speech provider

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::gateway::{AUDIO_MPEG, SynthesizedAudio, Synthesizer};
use crate::{Error, Result};

/// Default API base URL
pub const DEFAULT_ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io/v1";

/// Default synthesis model
pub const DEFAULT_TTS_MODEL: &str = "eleven_monolingual_v1";

/// Voice tuning parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.5,
        }
    }
}

#[derive(Serialize)]
struct ElevenLabsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

/// Synthesizes speech through the `ElevenLabs` API
pub struct ElevenLabsClient {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    voice_id: Option<String>,
    base_url: String,
    model: String,
    settings: VoiceSettings,
}

impl ElevenLabsClient {
    /// Create a client; missing key or voice id is reported on first use
    /// without touching the network
    #[must_use]
    pub fn new(api_key: Option<SecretString>, voice_id: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            voice_id: voice_id.filter(|v| !v.trim().is_empty()),
            base_url: DEFAULT_ELEVENLABS_BASE_URL.to_string(),
            model: DEFAULT_TTS_MODEL.to_string(),
            settings: VoiceSettings::default(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub const fn with_settings(mut self, settings: VoiceSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Whether both the API key and a voice id are configured
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.voice_id.is_some()
    }

    /// Synthesize `text` with an explicit voice
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] without any request when the API key or the
    /// voice is missing, [`Error::Synthesis`] on upstream failure or empty
    /// audio
    pub async fn synthesize_with_voice(&self, text: &str, voice_id: &str) -> Result<SynthesizedAudio> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| Error::Config("ElevenLabs API key not configured".to_string()))?;
        if voice_id.trim().is_empty() {
            return Err(Error::Config("ElevenLabs Voice ID not configured".to_string()));
        }

        if text.trim().is_empty() {
            return Err(Error::InputMissing("No text provided".to_string()));
        }

        let url = self.speech_url(voice_id)?;
        let request = ElevenLabsRequest {
            text,
            model_id: &self.model,
            voice_settings: self.settings,
        };

        tracing::debug!(voice_id, chars = text.len(), "requesting speech synthesis");

        let response = self
            .client
            .post(url)
            .header("Accept", AUDIO_MPEG)
            .header("xi-api-key", api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "ElevenLabs request failed");
                Error::Synthesis(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = status.as_u16(),
                reason = status.canonical_reason().unwrap_or_default(),
                body = %body,
                "ElevenLabs API error"
            );
            return Err(Error::Synthesis(format!("ElevenLabs API error: {status}")));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| Error::Synthesis(e.to_string()))?;

        if audio.is_empty() {
            return Err(Error::Synthesis("ElevenLabs returned empty audio".to_string()));
        }

        tracing::info!(audio_bytes = audio.len(), "speech synthesized");
        Ok(SynthesizedAudio::mpeg(audio.to_vec()))
    }

    /// `{base}/text-to-speech/{voice}` with the voice as one escaped segment
    fn speech_url(&self, voice_id: &str) -> Result<reqwest::Url> {
        let invalid = || Error::Config(format!("invalid ElevenLabs base URL: {}", self.base_url));

        let mut url = reqwest::Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|()| invalid())?
            .pop_if_empty()
            .push("text-to-speech")
            .push(voice_id);
        Ok(url)
    }
}

#[async_trait]
impl Synthesizer for ElevenLabsClient {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio> {
        if self.api_key.is_none() {
            return Err(Error::Config("ElevenLabs API key not configured".to_string()));
        }
        let voice_id = self
            .voice_id
            .as_deref()
            .ok_or_else(|| Error::Config("ElevenLabs Voice ID not configured".to_string()))?;

        self.synthesize_with_voice(text, voice_id).await
    }
}
