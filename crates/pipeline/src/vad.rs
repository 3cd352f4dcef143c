//! Built-in collaborator fallbacks
//!
//! The server normally wires HTTP sidecars for speech detection and noise
//! reduction. These implementations cover deployments without those
//! sidecars: an energy-threshold detector and a no-op denoiser.

use async_trait::async_trait;
use voice_assist_core::{AudioFrame, Denoiser, Result, SpeechDetector};

/// Energy-based speech detector
///
/// Maps frame energy (dBFS) onto a speech probability. Far less accurate
/// than a trained model but has no external dependency and never fails.
pub struct EnergyVad {
    /// Energy at or below which probability is 0.0
    silence_floor_db: f32,
    /// Energy at or above which probability is 1.0
    speech_ceiling_db: f32,
}

impl EnergyVad {
    pub fn new(silence_floor_db: f32, speech_ceiling_db: f32) -> Self {
        Self {
            silence_floor_db,
            speech_ceiling_db,
        }
    }
}

impl Default for EnergyVad {
    fn default() -> Self {
        // Typical near-field speech sits well above -40 dBFS
        Self::new(-55.0, -25.0)
    }
}

#[async_trait]
impl SpeechDetector for EnergyVad {
    async fn speech_probability(&self, audio: &AudioFrame) -> Result<f32> {
        let db = audio.energy_db;
        if db <= self.silence_floor_db {
            return Ok(0.0);
        }
        if db >= self.speech_ceiling_db {
            return Ok(1.0);
        }
        let span = self.speech_ceiling_db - self.silence_floor_db;
        Ok((db - self.silence_floor_db) / span)
    }

    fn model_info(&self) -> &str {
        "energy-threshold"
    }
}

/// No-op denoiser used when no noise-reduction sidecar is configured
pub struct PassthroughDenoiser;

#[async_trait]
impl Denoiser for PassthroughDenoiser {
    async fn denoise(&self, audio: &AudioFrame) -> Result<AudioFrame> {
        Ok(audio.clone())
    }

    fn name(&self) -> &str {
        "passthrough"
    }
}
