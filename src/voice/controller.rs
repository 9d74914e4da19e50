//! Capture controller: turns a held record control into an [`AudioClip`]

use std::time::Duration;

use tokio::sync::watch;

use super::capture::{AudioInput, samples_to_wav};
use super::level::LevelSampler;
use crate::gateway::{AudioClip, DEFAULT_LANGUAGE, DEFAULT_STT_MODEL};
use crate::{Error, Result};

/// Hints attached to every clip
#[derive(Debug, Clone)]
pub struct ClipHints {
    pub model: String,
    pub language: String,
}

impl Default for ClipHints {
    fn default() -> Self {
        Self {
            model: DEFAULT_STT_MODEL.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

/// Owns the audio input and the level sampler for one recording at a time
pub struct CaptureController<I: AudioInput> {
    input: I,
    hints: ClipHints,
    level_interval: Duration,
    level_tx: watch::Sender<f32>,
    sampler: Option<LevelSampler>,
}

impl<I: AudioInput> CaptureController<I> {
    #[must_use]
    pub fn new(input: I, hints: ClipHints, level_interval: Duration) -> Self {
        let (level_tx, _) = watch::channel(0.0);
        Self {
            input,
            hints,
            level_interval,
            level_tx,
            sampler: None,
        }
    }

    /// Subscribe to the live 0.0-1.0 input level
    #[must_use]
    pub fn level(&self) -> watch::Receiver<f32> {
        self.level_tx.subscribe()
    }

    #[must_use]
    pub fn is_capturing(&self) -> bool {
        self.input.is_capturing()
    }

    /// Open the microphone and start the level sampler
    ///
    /// # Errors
    ///
    /// Returns [`Error::MicrophoneUnavailable`] if the input cannot start; the
    /// sampler is not left running in that case
    pub fn begin_capture(&mut self) -> Result<()> {
        if self.input.is_capturing() {
            return Ok(());
        }

        if let Err(e) = self.input.start() {
            tracing::warn!(error = %e, "microphone unavailable");
            self.input.stop();
            return Err(e);
        }

        self.sampler = Some(LevelSampler::start(
            self.input.tap(),
            self.level_tx.clone(),
            self.level_interval,
        ));
        tracing::debug!("capture started");
        Ok(())
    }

    /// Stop recording and package everything captured into a clip
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if nothing is being recorded,
    /// [`Error::InputMissing`] if the recording is empty, or
    /// [`Error::Audio`] if encoding fails
    pub fn end_capture(&mut self) -> Result<AudioClip> {
        if !self.input.is_capturing() {
            return Err(Error::InvalidState("not capturing".to_string()));
        }

        self.input.stop();
        self.stop_sampler();

        let samples = self.input.tap().take();
        if samples.is_empty() {
            return Err(Error::InputMissing("no audio captured".to_string()));
        }

        let wav = samples_to_wav(&samples, self.input.sample_rate())?;
        tracing::debug!(
            samples = samples.len(),
            wav_bytes = wav.len(),
            "capture finished"
        );

        Ok(AudioClip::wav(wav).with_hints(&self.hints.model, &self.hints.language))
    }

    /// Abandon the recording without producing a clip
    pub fn cancel_capture(&mut self) {
        self.input.stop();
        self.stop_sampler();
        self.input.tap().clear();
        tracing::debug!("capture cancelled");
    }

    fn stop_sampler(&mut self) {
        if let Some(sampler) = self.sampler.take() {
            sampler.stop();
        }
        self.level_tx.send_replace(0.0);
    }
}

impl<I: AudioInput> Drop for CaptureController<I> {
    fn drop(&mut self) {
        self.input.stop();
        self.stop_sampler();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::capture::SampleTap;

    struct FakeInput {
        tap: SampleTap,
        capturing: bool,
        fail: bool,
        feed: Vec<f32>,
    }

    impl FakeInput {
        fn with_samples(feed: Vec<f32>) -> Self {
            Self {
                tap: SampleTap::new(),
                capturing: false,
                fail: false,
                feed,
            }
        }
    }

    impl AudioInput for FakeInput {
        fn start(&mut self) -> Result<()> {
            if self.fail {
                return Err(Error::MicrophoneUnavailable("permission denied".to_string()));
            }
            self.capturing = true;
            self.tap.push(&self.feed);
            Ok(())
        }

        fn stop(&mut self) {
            self.capturing = false;
        }

        fn tap(&self) -> SampleTap {
            self.tap.clone()
        }

        fn sample_rate(&self) -> u32 {
            16000
        }

        fn is_capturing(&self) -> bool {
            self.capturing
        }
    }

    fn controller(input: FakeInput) -> CaptureController<FakeInput> {
        CaptureController::new(input, ClipHints::default(), Duration::from_millis(5))
    }

    #[tokio::test]
    async fn test_capture_produces_wav_clip() {
        let mut ctl = controller(FakeInput::with_samples(vec![0.2; 1600]));

        ctl.begin_capture().unwrap();
        assert!(ctl.is_capturing());

        let clip = ctl.end_capture().unwrap();
        assert_eq!(&clip.bytes[..4], b"RIFF");
        assert_eq!(clip.model, "whisper-1");
        assert_eq!(clip.language, "en");
        assert!(!ctl.is_capturing());
    }

    #[tokio::test]
    async fn test_level_reset_after_end() {
        let mut ctl = controller(FakeInput::with_samples(vec![0.3; 2048]));
        let mut level = ctl.level();

        ctl.begin_capture().unwrap();
        level.changed().await.unwrap();
        assert!(*level.borrow_and_update() > 0.5);

        ctl.end_capture().unwrap();
        assert!(*level.borrow() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_empty_recording_is_input_missing() {
        let mut ctl = controller(FakeInput::with_samples(Vec::new()));

        ctl.begin_capture().unwrap();
        assert!(matches!(ctl.end_capture(), Err(Error::InputMissing(_))));
    }

    #[tokio::test]
    async fn test_denied_microphone_leaves_no_sampler() {
        let mut input = FakeInput::with_samples(vec![0.1; 10]);
        input.fail = true;
        let mut ctl = controller(input);

        let err = ctl.begin_capture().unwrap_err();
        assert!(matches!(err, Error::MicrophoneUnavailable(_)));
        assert!(ctl.sampler.is_none());
        assert!(matches!(ctl.end_capture(), Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_cancel_discards_audio() {
        let mut ctl = controller(FakeInput::with_samples(vec![0.1; 100]));

        ctl.begin_capture().unwrap();
        ctl.cancel_capture();

        assert!(!ctl.is_capturing());
        assert!(ctl.input.tap().is_empty());
    }
}
