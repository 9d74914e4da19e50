//! Press-and-hold debounce for the record control
//!
//! A press only turns into a recording once it has been held for the hold
//! threshold. Releasing earlier is a tap and is discarded.

use std::time::{Duration, Instant};

/// What a release means for the recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Released before the threshold; nothing was recorded
    Cancelled,
    /// Released after recording started; the clip should be finished
    EndCapture,
    /// Release without a matching press
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HoldState {
    Released,
    Pending { deadline: Instant },
    Recording,
}

/// Push-to-talk gesture tracker
#[derive(Debug, Clone)]
pub struct PushToTalk {
    threshold: Duration,
    state: HoldState,
}

impl PushToTalk {
    #[must_use]
    pub const fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            state: HoldState::Released,
        }
    }

    #[must_use]
    pub const fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Register a press; returns the instant at which recording should begin
    ///
    /// A press while already held keeps the original deadline.
    pub fn press(&mut self, now: Instant) -> Option<Instant> {
        match self.state {
            HoldState::Released => {
                let deadline = now + self.threshold;
                self.state = HoldState::Pending { deadline };
                Some(deadline)
            }
            HoldState::Pending { deadline } => Some(deadline),
            HoldState::Recording => None,
        }
    }

    /// Check whether a pending press has been held long enough
    ///
    /// Returns true exactly once, on the transition to recording.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.state {
            HoldState::Pending { deadline } if now >= deadline => {
                self.state = HoldState::Recording;
                true
            }
            _ => false,
        }
    }

    /// Register a release
    ///
    /// Only a press already promoted by [`poll`](Self::poll) ends a capture.
    /// A pending press is cancelled even if its deadline has passed, since
    /// recording never started for it.
    pub fn release(&mut self) -> ReleaseOutcome {
        let outcome = match self.state {
            HoldState::Released => ReleaseOutcome::Ignored,
            HoldState::Pending { .. } => ReleaseOutcome::Cancelled,
            HoldState::Recording => ReleaseOutcome::EndCapture,
        };
        self.state = HoldState::Released;
        outcome
    }

    /// Drop any pending or active hold
    pub const fn reset(&mut self) {
        self.state = HoldState::Released;
    }

    #[must_use]
    pub const fn is_recording(&self) -> bool {
        matches!(self.state, HoldState::Recording)
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.state, HoldState::Pending { .. })
    }
}
