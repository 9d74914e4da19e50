//! Shared test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tutor_voice::voice::{AudioInput, CaptureController, ClipHints, Player, SampleTap};
use tutor_voice::{
    AudioClip, ConversationTurn, Error, FeedbackGenerator, Gateways, Result, SynthesizedAudio,
    Synthesizer, Transcriber,
};

/// Gateways that answer from scripted queues and record every call
///
/// Once a queue runs dry the gateway falls back to a fixed success reply.
#[derive(Default)]
pub struct ScriptedGateways {
    transcripts: Mutex<VecDeque<Result<String>>>,
    feedback: Mutex<VecDeque<Result<String>>>,
    audio: Mutex<VecDeque<Result<SynthesizedAudio>>>,
    pub transcribe_calls: AtomicUsize,
    pub feedback_calls: AtomicUsize,
    pub synthesize_calls: AtomicUsize,
    /// History passed to each feedback call, in call order
    pub seen_histories: Mutex<Vec<Vec<ConversationTurn>>>,
}

impl ScriptedGateways {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_transcript(&self, reply: Result<String>) {
        self.transcripts.lock().unwrap().push_back(reply);
    }

    pub fn push_feedback(&self, reply: Result<String>) {
        self.feedback.lock().unwrap().push_back(reply);
    }

    pub fn push_audio(&self, reply: Result<SynthesizedAudio>) {
        self.audio.lock().unwrap().push_back(reply);
    }

    pub fn calls(&self) -> (usize, usize, usize) {
        (
            self.transcribe_calls.load(Ordering::SeqCst),
            self.feedback_calls.load(Ordering::SeqCst),
            self.synthesize_calls.load(Ordering::SeqCst),
        )
    }

    pub fn gateways(self: &Arc<Self>) -> Gateways {
        Gateways {
            transcriber: self.clone(),
            feedback: self.clone(),
            synthesizer: self.clone(),
        }
    }
}

#[async_trait]
impl Transcriber for ScriptedGateways {
    async fn transcribe(&self, _clip: &AudioClip) -> Result<String> {
        self.transcribe_calls.fetch_add(1, Ordering::SeqCst);
        self.transcripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("hello".to_string()))
    }
}

#[async_trait]
impl FeedbackGenerator for ScriptedGateways {
    async fn generate_feedback(
        &self,
        _user_text: &str,
        history: &[ConversationTurn],
    ) -> Result<String> {
        self.feedback_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_histories.lock().unwrap().push(history.to_vec());
        self.feedback
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("Hi there! What is your favorite color?".to_string()))
    }
}

#[async_trait]
impl Synthesizer for ScriptedGateways {
    async fn synthesize(&self, _text: &str) -> Result<SynthesizedAudio> {
        self.synthesize_calls.fetch_add(1, Ordering::SeqCst);
        self.audio
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(SynthesizedAudio::mpeg(vec![0xFF, 0xFB, 0x90, 0x00])))
    }
}

/// Player that records what it was asked to play
#[derive(Clone, Default)]
pub struct RecordingPlayer {
    pub started: Arc<AtomicUsize>,
    pub fail: bool,
}

impl RecordingPlayer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

impl Player for RecordingPlayer {
    fn start(&mut self, _audio: SynthesizedAudio) -> Result<()> {
        if self.fail {
            return Err(Error::Audio("no output device available".to_string()));
        }
        self.started.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A small WAV clip standing in for a recording
pub fn test_clip() -> AudioClip {
    let samples = vec![0.1_f32; 1600];
    let wav = tutor_voice::voice::samples_to_wav(&samples, tutor_voice::voice::SAMPLE_RATE)
        .expect("failed to encode test clip");
    AudioClip::wav(wav)
}

/// Microphone stand-in: starting it drops `feed` into the tap
#[derive(Clone, Default)]
pub struct FakeInput {
    pub tap: SampleTap,
    pub capturing: Arc<AtomicBool>,
    pub starts: Arc<AtomicUsize>,
    pub fail: bool,
    pub feed: Vec<f32>,
}

impl FakeInput {
    pub fn with_samples(feed: Vec<f32>) -> Self {
        Self {
            feed,
            ..Self::default()
        }
    }

    pub fn denied() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn controller(self) -> CaptureController<Self> {
        CaptureController::new(self, ClipHints::default(), Duration::from_millis(5))
    }
}

impl AudioInput for FakeInput {
    fn start(&mut self) -> Result<()> {
        if self.fail {
            return Err(Error::MicrophoneUnavailable("permission denied".to_string()));
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.capturing.store(true, Ordering::SeqCst);
        self.tap.push(&self.feed);
        Ok(())
    }

    fn stop(&mut self) {
        self.capturing.store(false, Ordering::SeqCst);
    }

    fn tap(&self) -> SampleTap {
        self.tap.clone()
    }

    fn sample_rate(&self) -> u32 {
        tutor_voice::voice::SAMPLE_RATE
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }
}
