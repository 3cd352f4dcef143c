//! Enrolled speaker voice sample
//!
//! The TTS sidecar clones a reference voice. The sample is loaded and
//! validated once at startup; a missing or unreadable file is a startup
//! configuration error, not something to discover on the first reply.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hound::WavReader;

use crate::{ModelError, Result};

/// A validated speaker WAV, kept in memory as base64 for request bodies
#[derive(Debug, Clone)]
pub struct EnrolledVoice {
    wav_b64: String,
    sample_rate: u32,
    duration_secs: f32,
}

impl EnrolledVoice {
    /// Load and validate a speaker sample from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            ModelError::VoiceSample(format!("cannot read {}: {e}", path.display()))
        })?;

        let reader = WavReader::new(std::io::Cursor::new(&bytes)).map_err(|e| {
            ModelError::VoiceSample(format!("{} is not a valid WAV file: {e}", path.display()))
        })?;
        let spec = reader.spec();
        let frames = reader.duration();
        if frames == 0 {
            return Err(ModelError::VoiceSample(format!(
                "{} contains no audio",
                path.display()
            )));
        }
        let duration_secs = frames as f32 / spec.sample_rate as f32;

        tracing::info!(
            path = %path.display(),
            sample_rate = spec.sample_rate,
            channels = spec.channels,
            duration_secs,
            "enrolled voice sample loaded"
        );

        Ok(Self {
            wav_b64: BASE64.encode(&bytes),
            sample_rate: spec.sample_rate,
            duration_secs,
        })
    }

    /// Base64 of the raw WAV bytes
    pub fn wav_b64(&self) -> &str {
        &self.wav_b64
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f32 {
        self.duration_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavSpec, WavWriter};

    fn write_test_wav(path: &Path, samples: usize) {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 22_050,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for i in 0..samples {
            writer.write_sample((i as i16) % 1000).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_load_valid_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voice.wav");
        write_test_wav(&path, 22_050);

        let voice = EnrolledVoice::load(&path).unwrap();
        assert_eq!(voice.sample_rate(), 22_050);
        assert!((voice.duration_secs() - 1.0).abs() < 0.01);
        assert!(!voice.wav_b64().is_empty());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = EnrolledVoice::load("/nonexistent/voice.wav").unwrap_err();
        assert!(matches!(err, ModelError::VoiceSample(_)));
    }

    #[test]
    fn test_non_wav_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_audio.wav");
        std::fs::write(&path, b"plain text, not audio").unwrap();
        let err = EnrolledVoice::load(&path).unwrap_err();
        assert!(matches!(err, ModelError::VoiceSample(_)));
    }
}
