//! Turn pipeline: capture → transcribe → feedback → synthesize → play
//!
//! One [`TurnPipeline`] owns the conversation history of a session. A turn
//! moves through [`TurnState`] strictly in order; the user/assistant pair is
//! staged while the gateways run and committed to history only once speech
//! has been synthesized. Any gateway failure discards the staged pair, so the
//! history only ever contains exchanges that completed.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::Instrument;
use uuid::Uuid;

use crate::conversation::{ConversationHistory, ConversationTurn, Exchange};
use crate::gateway::{AudioClip, FeedbackGenerator, SynthesizedAudio, Synthesizer, Transcriber};
use crate::voice::Player;
use crate::{Error, Result};

/// Capacity of the state-change broadcast channel
const STATE_CHANNEL_CAPACITY: usize = 32;

/// Where the current turn is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Capturing,
    Transcribing,
    GeneratingFeedback,
    Synthesizing,
    Playing,
    Errored { message: String },
}

impl TurnState {
    /// Whether a new capture may begin
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Short label for status lines
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Capturing => "recording",
            Self::Transcribing => "transcribing",
            Self::GeneratingFeedback => "thinking",
            Self::Synthesizing => "synthesizing",
            Self::Playing => "playing",
            Self::Errored { .. } => "error",
        }
    }
}

/// Result of a completed turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub transcript: String,
    pub feedback: String,
    pub audio_bytes: usize,
}

/// The gateways a pipeline drives
#[derive(Clone)]
pub struct Gateways {
    pub transcriber: Arc<dyn Transcriber>,
    pub feedback: Arc<dyn FeedbackGenerator>,
    pub synthesizer: Arc<dyn Synthesizer>,
}

/// Coordinates one conversational turn at a time
pub struct TurnPipeline {
    gateways: Gateways,
    player: Box<dyn Player>,
    history: ConversationHistory,
    state: TurnState,
    events: broadcast::Sender<TurnState>,
    session_id: Uuid,
}

impl TurnPipeline {
    #[must_use]
    pub fn new(gateways: Gateways, player: Box<dyn Player>) -> Self {
        let (events, _) = broadcast::channel(STATE_CHANNEL_CAPACITY);
        let session_id = Uuid::new_v4();
        tracing::debug!(%session_id, "turn pipeline created");

        Self {
            gateways,
            player,
            history: ConversationHistory::new(),
            state: TurnState::Idle,
            events,
            session_id,
        }
    }

    /// Committed conversation so far
    #[must_use]
    pub const fn history(&self) -> &ConversationHistory {
        &self.history
    }

    #[must_use]
    pub const fn state(&self) -> &TurnState {
        &self.state
    }

    #[must_use]
    pub const fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Receive every state transition from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TurnState> {
        self.events.subscribe()
    }

    /// Enter `Capturing`; ignored unless idle
    ///
    /// Returns whether capture may begin.
    pub fn begin_capture(&mut self) -> bool {
        if !self.state.is_idle() {
            tracing::debug!(state = self.state.label(), "capture request ignored");
            return false;
        }
        self.transition(TurnState::Capturing);
        true
    }

    /// Leave `Capturing` without running a turn
    pub fn cancel_capture(&mut self) {
        if self.state == TurnState::Capturing {
            self.transition(TurnState::Idle);
        }
    }

    /// Run the rest of the turn for a finished recording
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if no capture is in progress. Gateway
    /// and playback failures are returned after the pipeline has passed
    /// through `Errored` back to `Idle`.
    pub async fn complete_turn(&mut self, clip: AudioClip) -> Result<TurnOutcome> {
        if self.state != TurnState::Capturing {
            return Err(Error::InvalidState(format!(
                "cannot complete a turn while {}",
                self.state.label()
            )));
        }

        let turn = self.history.len() / 2 + 1;
        let span = tracing::info_span!("turn", session_id = %self.session_id, turn);
        self.run_turn(clip).instrument(span).await
    }

    async fn run_turn(&mut self, clip: AudioClip) -> Result<TurnOutcome> {
        let (exchange, audio) = match self.run_gateways(&clip).await {
            Ok(staged) => staged,
            Err(e) => {
                self.fail(&e);
                return Err(e);
            }
        };

        let outcome = TurnOutcome {
            transcript: exchange.user().text().to_string(),
            feedback: exchange.assistant().text().to_string(),
            audio_bytes: audio.content_length(),
        };

        self.history.commit(exchange);
        self.transition(TurnState::Playing);

        if let Err(e) = self.player.start(audio) {
            self.fail(&e);
            return Err(e);
        }

        tracing::info!(history_len = self.history.len(), "turn complete");
        self.transition(TurnState::Idle);
        Ok(outcome)
    }

    /// Call the three gateways in order, staging the exchange
    async fn run_gateways(
        &mut self,
        clip: &AudioClip,
    ) -> Result<(Exchange, SynthesizedAudio)> {
        self.transition(TurnState::Transcribing);
        let transcript = self.gateways.transcriber.transcribe(clip).await?;
        let transcript = transcript.trim().to_string();
        if transcript.is_empty() {
            return Err(Error::Transcription("no speech recognized".to_string()));
        }
        tracing::info!(transcript = %transcript, "learner said");

        self.transition(TurnState::GeneratingFeedback);
        let prior: &[ConversationTurn] = self.history.turns();
        let feedback = self
            .gateways
            .feedback
            .generate_feedback(&transcript, prior)
            .await?;
        tracing::info!(feedback = %feedback, "tutor replied");

        self.transition(TurnState::Synthesizing);
        let audio = self.gateways.synthesizer.synthesize(&feedback).await?;
        if audio.bytes.is_empty() {
            return Err(Error::Synthesis("empty audio payload".to_string()));
        }

        Ok((Exchange::new(transcript, feedback), audio))
    }

    fn fail(&mut self, error: &Error) {
        tracing::warn!(error = %error, state = self.state.label(), "turn failed");
        self.transition(TurnState::Errored {
            message: error.to_string(),
        });
        self.transition(TurnState::Idle);
    }

    fn transition(&mut self, next: TurnState) {
        tracing::debug!(from = self.state.label(), to = next.label(), "turn state");
        self.state = next.clone();
        // No subscribers is fine
        let _ = self.events.send(next);
    }
}
