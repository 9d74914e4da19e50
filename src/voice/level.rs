//! Live input level for the record indicator
//!
//! While recording, a [`LevelSampler`] task reads the tail of the capture
//! buffer once per frame and publishes a 0.0-1.0 level on a watch channel.
//! Stopping or dropping the sampler aborts the task and resets the level.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::capture::SampleTap;

/// Samples inspected per tick (~64ms at 16kHz)
pub const LEVEL_WINDOW: usize = 1024;

/// RMS treated as full scale; normal speech peaks around here
const FULL_SCALE_RMS: f32 = 0.3;

/// Normalized 0.0-1.0 level of a block of samples
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn normalized_level(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    let rms = (sum_squares / samples.len() as f32).sqrt();
    (rms / FULL_SCALE_RMS).clamp(0.0, 1.0)
}

/// Periodic reader of the capture buffer
pub struct LevelSampler {
    handle: JoinHandle<()>,
    level_tx: watch::Sender<f32>,
}

impl LevelSampler {
    /// Spawn the sampling task
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(tap: SampleTap, level_tx: watch::Sender<f32>, interval: Duration) -> Self {
        let tx = level_tx.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                tx.send_replace(normalized_level(&tap.recent(LEVEL_WINDOW)));
            }
        });

        tracing::trace!(?interval, "level sampler started");
        Self { handle, level_tx }
    }

    /// Stop sampling and reset the level to zero
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for LevelSampler {
    fn drop(&mut self) {
        self.handle.abort();
        self.level_tx.send_replace(0.0);
        tracing::trace!("level sampler stopped");
    }
}
