//! Audio playback to speakers

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use crate::gateway::SynthesizedAudio;
use crate::{Error, Result};

/// Something that can start playing synthesized speech
pub trait Player {
    /// Begin playback and return once audio is flowing
    ///
    /// Completion is not awaited.
    ///
    /// # Errors
    ///
    /// Returns error if the audio cannot be decoded or the output cannot start
    fn start(&mut self, audio: SynthesizedAudio) -> Result<()>;
}

/// Decoded PCM ready for an output stream
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Mono samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Plays MP3 speech on the default output device
#[derive(Debug, Default)]
pub struct AudioPlayback {
    active: Option<Arc<AtomicBool>>,
}

impl AudioPlayback {
    #[must_use]
    pub const fn new() -> Self {
        Self { active: None }
    }

    /// Whether the last started clip is still playing
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Acquire))
    }
}

impl Player for AudioPlayback {
    fn start(&mut self, audio: SynthesizedAudio) -> Result<()> {
        let decoded = decode_mp3(&audio.bytes)?;
        if decoded.samples.is_empty() {
            return Err(Error::Audio("decoded audio is empty".to_string()));
        }

        let playing = Arc::new(AtomicBool::new(true));
        let (started_tx, started_rx) = mpsc::channel();

        // cpal streams are not Send, so the stream lives on its own thread
        let flag = Arc::clone(&playing);
        std::thread::Builder::new()
            .name("tutor-playback".to_string())
            .spawn(move || {
                let result = play_to_end(decoded, &flag, &started_tx);
                if let Err(e) = result {
                    // Reaches the caller only if the stream never started
                    let _ = started_tx.send(Err(e));
                }
                flag.store(false, Ordering::Release);
            })
            .map_err(|e| Error::Audio(format!("failed to spawn playback thread: {e}")))?;

        started_rx
            .recv()
            .map_err(|_| Error::Audio("playback thread exited before starting".to_string()))??;

        self.active = Some(playing);
        Ok(())
    }
}

/// Open the output device, signal start, and block until the samples run out
fn play_to_end(
    decoded: DecodedAudio,
    playing: &AtomicBool,
    started: &mpsc::Sender<Result<()>>,
) -> Result<()> {
    let device = cpal::default_host()
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

    let config = output_config(&device, decoded.sample_rate)?;
    let channels = usize::from(config.channels);
    let sample_count = decoded.samples.len();

    let samples = Arc::new(decoded.samples);
    let position = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicBool::new(false));

    let stream = {
        let samples = Arc::clone(&samples);
        let position = Arc::clone(&position);
        let finished = Arc::clone(&finished);
        device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut pos = position.load(Ordering::Relaxed);
                    for frame in data.chunks_mut(channels) {
                        let sample = samples.get(pos).copied().unwrap_or(0.0);
                        frame.fill(sample);
                        if pos < samples.len() {
                            pos += 1;
                        }
                    }
                    position.store(pos, Ordering::Relaxed);
                    if pos >= samples.len() {
                        finished.store(true, Ordering::Release);
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?
    };

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;
    let _ = started.send(Ok(()));
    tracing::debug!(
        samples = sample_count,
        sample_rate = config.sample_rate.0,
        "playback started"
    );

    // Poll for completion with timeout
    let duration_ms = (sample_count as u64 * 1000) / u64::from(config.sample_rate.0.max(1));
    let timeout = Duration::from_millis(duration_ms + 500);
    let start = std::time::Instant::now();
    while !finished.load(Ordering::Acquire) && start.elapsed() < timeout {
        std::thread::sleep(Duration::from_millis(50));
    }

    // Small delay to let the device drain
    std::thread::sleep(Duration::from_millis(100));
    drop(stream);
    playing.store(false, Ordering::Release);
    tracing::debug!(samples = sample_count, "playback complete");

    Ok(())
}

/// Pick a mono (or stereo) output config at the decoded rate
fn output_config(device: &cpal::Device, sample_rate: u32) -> Result<StreamConfig> {
    let rate = SampleRate(sample_rate);
    let fits = |c: &cpal::SupportedStreamConfigRange, channels: u16| {
        c.channels() == channels && c.min_sample_rate() <= rate && c.max_sample_rate() >= rate
    };

    let supported = device
        .supported_output_configs()
        .map_err(|e| Error::Audio(e.to_string()))?
        .find(|c| fits(c, 1))
        .or_else(|| {
            // Fallback: try stereo
            device.supported_output_configs().ok()?.find(|c| fits(c, 2))
        })
        .ok_or_else(|| Error::Audio(format!("no output config supports {sample_rate} Hz")))?;

    Ok(supported.with_sample_rate(rate).config())
}

/// Decode MP3 bytes to mono f32 samples
///
/// # Errors
///
/// Returns error if the data is not valid MP3
pub fn decode_mp3(mp3_data: &[u8]) -> Result<DecodedAudio> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();
    let mut sample_rate = 0u32;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if sample_rate == 0 {
                    sample_rate = u32::try_from(frame.sample_rate).unwrap_or_default();
                }

                if frame.channels == 2 {
                    // Stereo: average channels
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    Ok(DecodedAudio {
        samples,
        sample_rate,
    })
}
