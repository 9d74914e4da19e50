//! Audio capture from microphone

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};

use crate::{Error, Result};

/// Sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// Shared view of the samples being recorded
///
/// The input callback appends to it; the level sampler only reads it.
#[derive(Debug, Clone, Default)]
pub struct SampleTap {
    buffer: Arc<Mutex<Vec<f32>>>,
}

impl SampleTap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append samples from the input callback
    pub fn push(&self, samples: &[f32]) {
        if let Ok(mut buf) = self.buffer.lock() {
            buf.extend_from_slice(samples);
        }
    }

    /// Copy of the most recent `window` samples
    #[must_use]
    pub fn recent(&self, window: usize) -> Vec<f32> {
        self.buffer
            .lock()
            .map(|buf| buf[buf.len().saturating_sub(window)..].to_vec())
            .unwrap_or_default()
    }

    /// Take all buffered samples, leaving the buffer empty
    #[must_use]
    pub fn take(&self) -> Vec<f32> {
        self.buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut buf) = self.buffer.lock() {
            buf.clear();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.lock().map(|buf| buf.len()).unwrap_or_default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A source of mono f32 samples that can be started and stopped
pub trait AudioInput {
    /// Open the device and begin buffering
    ///
    /// # Errors
    ///
    /// Returns [`Error::MicrophoneUnavailable`] if the device cannot be opened
    fn start(&mut self) -> Result<()>;

    /// Stop buffering and release the device
    fn stop(&mut self);

    /// Shared buffer the input writes into
    fn tap(&self) -> SampleTap;

    fn sample_rate(&self) -> u32;

    fn is_capturing(&self) -> bool;
}

/// Captures audio from the default input device
pub struct MicInput {
    config: StreamConfig,
    tap: SampleTap,
    stream: Option<Stream>,
}

impl MicInput {
    /// Create a new microphone input
    ///
    /// # Errors
    ///
    /// Returns error if no input device or no 16kHz mono config is available
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::MicrophoneUnavailable("no input device available".to_string()))?;

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::MicrophoneUnavailable(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
            })
            .ok_or_else(|| {
                Error::MicrophoneUnavailable("no suitable audio config found".to_string())
            })?;

        let config = supported_config
            .with_sample_rate(SampleRate(SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            channels = config.channels,
            "microphone initialized"
        );

        Ok(Self {
            config,
            tap: SampleTap::new(),
            stream: None,
        })
    }
}

impl AudioInput for MicInput {
    fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let tap = self.tap.clone();
        tap.clear();

        let device = cpal::default_host()
            .default_input_device()
            .ok_or_else(|| Error::MicrophoneUnavailable("no input device".to_string()))?;

        let stream = device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| tap.push(data),
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::MicrophoneUnavailable(e.to_string()))?;

        stream
            .play()
            .map_err(|e| Error::MicrophoneUnavailable(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("audio capture started");
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!("audio capture stopped");
        }
    }

    fn tap(&self) -> SampleTap {
        self.tap.clone()
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn is_capturing(&self) -> bool {
        self.stream.is_some()
    }
}

/// Convert f32 samples to WAV bytes for STT APIs
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            // Convert f32 [-1.0, 1.0] to i16
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}
