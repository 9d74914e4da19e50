//! Clients for the hosted speech and language services

pub mod elevenlabs;
pub mod openai;

pub use elevenlabs::{ElevenLabsClient, VoiceSettings};
pub use openai::OpenAiClient;

use std::sync::Arc;

use crate::Config;

/// Provider clients built from configuration
#[derive(Clone)]
pub struct Providers {
    pub openai: Arc<OpenAiClient>,
    pub elevenlabs: Arc<ElevenLabsClient>,
}

impl Providers {
    /// Build provider clients; missing credentials surface on first use
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let speech = &config.speech;

        if config.api_keys.openai.is_none() {
            tracing::warn!("OPENAI_API_KEY not set - transcription and feedback unavailable");
        }
        if config.api_keys.elevenlabs.is_none() || speech.voice_id.is_none() {
            tracing::warn!("ElevenLabs key or voice id not set - speech synthesis unavailable");
        }

        let openai = OpenAiClient::new(config.api_keys.openai.clone())
            .with_base_url(&speech.openai_base_url)
            .with_chat_model(&speech.llm_model);

        let elevenlabs =
            ElevenLabsClient::new(config.api_keys.elevenlabs.clone(), speech.voice_id.clone())
                .with_base_url(&speech.elevenlabs_base_url)
                .with_model(&speech.tts_model)
                .with_settings(VoiceSettings {
                    stability: speech.stability,
                    similarity_boost: speech.similarity_boost,
                });

        Self {
            openai: Arc::new(openai),
            elevenlabs: Arc::new(elevenlabs),
        }
    }
}
