//! Audio frame types and utilities

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Supported audio sample rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SampleRate {
    /// 8kHz - Telephony
    Hz8000,
    /// 16kHz - Standard speech recognition
    #[default]
    Hz16000,
    /// 24kHz - TTS output
    Hz24000,
    /// 44.1kHz - CD quality
    Hz44100,
    /// 48kHz - Browser capture
    Hz48000,
}

impl SampleRate {
    /// Get sample rate as u32
    pub fn as_u32(&self) -> u32 {
        match self {
            SampleRate::Hz8000 => 8000,
            SampleRate::Hz16000 => 16000,
            SampleRate::Hz24000 => 24000,
            SampleRate::Hz44100 => 44100,
            SampleRate::Hz48000 => 48000,
        }
    }

    /// Map a raw rate to a supported variant
    pub fn from_u32(rate: u32) -> Option<Self> {
        match rate {
            8000 => Some(SampleRate::Hz8000),
            16000 => Some(SampleRate::Hz16000),
            24000 => Some(SampleRate::Hz24000),
            44100 => Some(SampleRate::Hz44100),
            48000 => Some(SampleRate::Hz48000),
            _ => None,
        }
    }

    /// Get samples per millisecond
    pub fn samples_per_ms(&self) -> usize {
        self.as_u32() as usize / 1000
    }
}

/// Audio channel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Channels {
    #[default]
    Mono,
    Stereo,
}

impl Channels {
    pub fn count(&self) -> usize {
        match self {
            Channels::Mono => 1,
            Channels::Stereo => 2,
        }
    }
}

/// PCM16 normalization divisor (for converting PCM16 to f32)
const PCM16_NORMALIZE: f32 = 32768.0;
/// PCM16 scaling multiplier (for converting f32 to PCM16)
const PCM16_SCALE: f32 = 32767.0;

/// Audio frame with metadata
///
/// Internally stores samples as f32 for processing efficiency.
#[derive(Clone)]
pub struct AudioFrame {
    /// Raw audio samples (f32, normalized to [-1.0, 1.0])
    pub samples: Arc<[f32]>,
    /// Sample rate
    pub sample_rate: SampleRate,
    /// Number of channels
    pub channels: Channels,
    /// Frame sequence number for ordering
    pub sequence: u64,
    /// Timestamp when frame was captured/generated
    pub timestamp: Instant,
    /// Duration of this frame
    pub duration: Duration,
    /// Energy level in dB
    pub energy_db: f32,
}

impl std::fmt::Debug for AudioFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioFrame")
            .field("samples_len", &self.samples.len())
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("sequence", &self.sequence)
            .field("duration", &self.duration)
            .field("energy_db", &self.energy_db)
            .finish()
    }
}

impl AudioFrame {
    /// Create a new audio frame from f32 samples
    pub fn new(
        samples: Vec<f32>,
        sample_rate: SampleRate,
        channels: Channels,
        sequence: u64,
    ) -> Self {
        let duration = Duration::from_secs_f64(
            samples.len() as f64 / (sample_rate.as_u32() as f64 * channels.count() as f64),
        );
        let energy_db = Self::calculate_energy_db(&samples);

        Self {
            samples: samples.into(),
            sample_rate,
            channels,
            sequence,
            timestamp: Instant::now(),
            duration,
            energy_db,
        }
    }

    /// Calculate RMS energy in decibels
    fn calculate_energy_db(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return -96.0; // Minimum dB (silence)
        }

        let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
        let rms = (sum_squares / samples.len() as f32).sqrt();

        if rms > 0.0 {
            20.0 * rms.log10()
        } else {
            -96.0
        }
    }

    /// Convert from PCM16 bytes (little-endian)
    pub fn from_pcm16(
        bytes: &[u8],
        sample_rate: SampleRate,
        channels: Channels,
        sequence: u64,
    ) -> Self {
        let samples: Vec<f32> = bytes
            .chunks_exact(2)
            .map(|chunk| {
                let sample = i16::from_le_bytes([chunk[0], chunk[1]]);
                sample as f32 / PCM16_NORMALIZE
            })
            .collect();

        Self::new(samples, sample_rate, channels, sequence)
    }

    /// Convert to PCM16 bytes (little-endian)
    pub fn to_pcm16(&self) -> Vec<u8> {
        self.samples
            .iter()
            .flat_map(|&sample| {
                let clamped = sample.clamp(-1.0, 1.0);
                let pcm16 = (clamped * PCM16_SCALE) as i16;
                pcm16.to_le_bytes()
            })
            .collect()
    }

    /// Mean absolute amplitude, used for near-silence detection
    pub fn mean_amplitude(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().map(|s| s.abs()).sum::<f32>() / self.samples.len() as f32
    }

    /// Peak-normalize to [-1, 1]
    ///
    /// Only rescales when the peak exceeds `floor`; pure noise floors are
    /// left untouched. Output is clamped either way.
    pub fn peak_normalize(&self, floor: f32) -> Self {
        let peak = self
            .samples
            .iter()
            .fold(0.0f32, |acc, s| acc.max(s.abs()));

        let normalized: Vec<f32> = if peak > floor {
            self.samples
                .iter()
                .map(|s| (s / peak).clamp(-1.0, 1.0))
                .collect()
        } else {
            self.samples.iter().map(|s| s.clamp(-1.0, 1.0)).collect()
        };

        Self::new(normalized, self.sample_rate, self.channels, self.sequence)
    }

    /// High-quality resampling using Rubato (FFT based)
    ///
    /// Falls back to linear interpolation for very short frames or when
    /// Rubato fails.
    pub fn resample(&self, target_rate: SampleRate) -> Self {
        use rubato::{FftFixedIn, Resampler};

        if self.sample_rate == target_rate {
            return self.clone();
        }

        let from_rate = self.sample_rate.as_u32() as usize;
        let to_rate = target_rate.as_u32() as usize;

        // For very short frames or edge cases, use linear fallback
        if self.samples.len() < 64 {
            return self.resample_linear(target_rate);
        }

        let samples_f64: Vec<f64> = self.samples.iter().map(|&s| s as f64).collect();
        let chunk_size = self.samples.len().min(1024);

        match FftFixedIn::<f64>::new(from_rate, to_rate, chunk_size, 2, 1) {
            Ok(mut resampler) => {
                let input_frames = vec![samples_f64];

                match resampler.process(&input_frames, None) {
                    Ok(output_frames) => {
                        let resampled: Vec<f32> =
                            output_frames[0].iter().map(|&s| s as f32).collect();

                        Self::new(resampled, target_rate, self.channels, self.sequence)
                    },
                    Err(e) => {
                        tracing::warn!("Rubato processing failed, using linear fallback: {}", e);
                        self.resample_linear(target_rate)
                    },
                }
            },
            Err(e) => {
                tracing::warn!("Rubato init failed, using linear fallback: {}", e);
                self.resample_linear(target_rate)
            },
        }
    }

    /// Linear interpolation fallback for edge cases
    fn resample_linear(&self, target_rate: SampleRate) -> Self {
        let ratio = target_rate.as_u32() as f64 / self.sample_rate.as_u32() as f64;
        let new_len = (self.samples.len() as f64 * ratio) as usize;

        let mut resampled = Vec::with_capacity(new_len);
        for i in 0..new_len {
            let src_idx = i as f64 / ratio;
            let idx_floor = src_idx.floor() as usize;
            let idx_ceil = (idx_floor + 1).min(self.samples.len().saturating_sub(1));
            let frac = src_idx - idx_floor as f64;

            let sample = self.samples[idx_floor] * (1.0 - frac as f32)
                + self.samples[idx_ceil] * frac as f32;
            resampled.push(sample);
        }

        Self::new(resampled, target_rate, self.channels, self.sequence)
    }

    /// Convert stereo to mono by averaging channels
    pub fn to_mono(&self) -> Self {
        if self.channels == Channels::Mono {
            return self.clone();
        }

        let mono_samples: Vec<f32> = self
            .samples
            .chunks_exact(2)
            .map(|chunk| (chunk[0] + chunk[1]) / 2.0)
            .collect();

        Self::new(
            mono_samples,
            self.sample_rate,
            Channels::Mono,
            self.sequence,
        )
    }

    /// Get duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        self.duration.as_millis() as u64
    }

    /// Concatenate frames with identical format
    ///
    /// Returns `None` when `frames` is empty. The result carries the
    /// sequence number of the last frame.
    pub fn concat(frames: &[AudioFrame]) -> Option<AudioFrame> {
        let last = frames.last()?;
        let mut samples = Vec::with_capacity(frames.iter().map(|f| f.samples.len()).sum());
        for frame in frames {
            samples.extend(frame.samples.iter());
        }
        Some(AudioFrame::new(
            samples,
            last.sample_rate,
            last.channels,
            last.sequence,
        ))
    }
}
