//! Push-to-talk session: joins the record gesture, the capture controller and
//! the turn pipeline
//!
//! The driver (a terminal loop, a key handler) only reports edges and the hold
//! deadline; every rule about when recording starts and when a turn runs
//! lives here.

use std::time::{Duration, Instant};

use tokio::io::{AsyncBufRead, Lines};

use super::capture::AudioInput;
use super::controller::CaptureController;
use super::gesture::{PushToTalk, ReleaseOutcome};
use crate::Result;
use crate::pipeline::{TurnOutcome, TurnPipeline};

/// Result of releasing the record control
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Release {
    /// No press was in progress
    Ignored,
    /// Released before recording started; no clip, no gateway calls
    Cancelled,
    /// The recording went through a full turn
    Completed(TurnOutcome),
}

/// One learner's push-to-talk session
pub struct TalkSession<I: AudioInput> {
    capture: CaptureController<I>,
    pipeline: TurnPipeline,
    gesture: PushToTalk,
}

impl<I: AudioInput> TalkSession<I> {
    #[must_use]
    pub const fn new(
        capture: CaptureController<I>,
        pipeline: TurnPipeline,
        hold_threshold: Duration,
    ) -> Self {
        Self {
            capture,
            pipeline,
            gesture: PushToTalk::new(hold_threshold),
        }
    }

    #[must_use]
    pub const fn capture(&self) -> &CaptureController<I> {
        &self.capture
    }

    #[must_use]
    pub const fn pipeline(&self) -> &TurnPipeline {
        &self.pipeline
    }

    /// True between a press and its release
    #[must_use]
    pub const fn is_holding(&self) -> bool {
        self.gesture.is_pending() || self.gesture.is_recording()
    }

    #[must_use]
    pub const fn is_recording(&self) -> bool {
        self.gesture.is_recording()
    }

    /// Register a press of the record control
    ///
    /// Returns the instant at which [`poll`](Self::poll) should be called.
    /// A press while a turn is in flight is ignored.
    pub fn press(&mut self, now: Instant) -> Option<Instant> {
        if !self.pipeline.state().is_idle() || self.gesture.is_recording() {
            tracing::debug!(state = self.pipeline.state().label(), "press ignored");
            return None;
        }
        self.gesture.press(now)
    }

    /// Start recording if the pending press has been held long enough
    ///
    /// Returns true when recording started.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MicrophoneUnavailable`] if the input cannot
    /// start; the session is back to idle afterwards
    pub fn poll(&mut self, now: Instant) -> Result<bool> {
        if !self.gesture.poll(now) {
            return Ok(false);
        }

        if !self.pipeline.begin_capture() {
            self.gesture.reset();
            return Ok(false);
        }

        if let Err(e) = self.capture.begin_capture() {
            self.pipeline.cancel_capture();
            self.gesture.reset();
            return Err(e);
        }

        Ok(true)
    }

    /// Register a release and run the turn if a recording was in progress
    ///
    /// # Errors
    ///
    /// Returns the capture error if the recording is unusable, or the first
    /// failing stage of the turn
    pub async fn release(&mut self) -> Result<Release> {
        match self.gesture.release() {
            ReleaseOutcome::Ignored => Ok(Release::Ignored),
            ReleaseOutcome::Cancelled => {
                tracing::debug!("tap discarded");
                Ok(Release::Cancelled)
            }
            ReleaseOutcome::EndCapture => {
                let clip = match self.capture.end_capture() {
                    Ok(clip) => clip,
                    Err(e) => {
                        self.pipeline.cancel_capture();
                        return Err(e);
                    }
                };
                self.pipeline
                    .complete_turn(clip)
                    .await
                    .map(Release::Completed)
            }
        }
    }

    /// Like [`release`](Self::release), but keeps consuming `input` while the
    /// turn runs
    ///
    /// Lines arriving before the pipeline is idle again are dropped so they
    /// cannot turn into a press afterwards. Input that reaches end of file
    /// is left alone.
    ///
    /// # Errors
    ///
    /// Same as [`release`](Self::release)
    pub async fn release_discarding_input<R>(&mut self, input: &mut Lines<R>) -> Result<Release>
    where
        R: AsyncBufRead + Unpin,
    {
        let turn = self.release();
        tokio::pin!(turn);

        let mut input_open = true;
        loop {
            tokio::select! {
                biased;
                line = input.next_line(), if input_open => match line {
                    Ok(Some(_)) => tracing::debug!("input discarded while the turn runs"),
                    Ok(None) => input_open = false,
                    Err(e) => {
                        tracing::warn!(error = %e, "input closed while the turn runs");
                        input_open = false;
                    }
                },
                result = &mut turn => return result,
            }
        }
    }

    /// Drop any press or recording in progress
    pub fn cancel(&mut self) {
        self.capture.cancel_capture();
        self.pipeline.cancel_capture();
        self.gesture.reset();
    }
}
