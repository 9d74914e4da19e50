//! Tutor Voice - spoken English practice for young learners
//!
//! This library provides the pieces of a push-to-talk voice tutor:
//! - Microphone capture with a press-and-hold gesture and live level meter
//! - Gateways to speech-to-text, feedback generation, and text-to-speech
//! - The turn pipeline that ties them together and keeps the conversation
//! - An HTTP server that proxies the gateways so clients never hold API keys
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  Capture client                      │
//! │   Push-to-talk  │  Mic capture  │  Level  │  Player │
//! └────────────────────┬────────────────────────────────┘
//!                      │ AudioClip
//! ┌────────────────────▼────────────────────────────────┐
//! │                  Turn pipeline                       │
//! │   Transcribe  →  Feedback (with history)  →  Speak  │
//! └────────────────────┬────────────────────────────────┘
//!                      │ direct, or via /api passthrough
//! ┌────────────────────▼────────────────────────────────┐
//! │            Hosted services                           │
//! │   Whisper  │  Chat completions  │  ElevenLabs       │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod conversation;
pub mod error;
pub mod gateway;
pub mod pipeline;
pub mod prompt;
pub mod providers;
pub mod voice;

pub use config::Config;
pub use conversation::{ConversationHistory, ConversationTurn, Exchange, Role};
pub use error::{Error, Result};
pub use gateway::{
    ApiClient, AudioClip, FeedbackGenerator, SynthesizedAudio, Synthesizer, Transcriber,
};
pub use pipeline::{Gateways, TurnOutcome, TurnPipeline, TurnState};
pub use providers::{ElevenLabsClient, OpenAiClient, Providers};
