//! Noise-reduction HTTP sidecar client

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use voice_assist_core::{AudioFrame, Channels, Denoiser, Result as CoreResult};

use crate::{ModelError, Result};

/// Client for the noise-reduction sidecar's `/denoise` endpoint
///
/// Callers treat failures as best-effort and fall back to the raw audio,
/// so this client only has to be honest about errors, not resilient.
pub struct HttpDenoiser {
    endpoint: String,
    client: Client,
}

impl HttpDenoiser {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ModelError::Network(e.to_string()))?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    fn url(&self) -> String {
        format!("{}/denoise", self.endpoint.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct DenoiseRequest {
    audio_b64: String,
    sample_rate: u32,
}

#[derive(Debug, Deserialize)]
struct DenoiseResponse {
    audio_b64: String,
}

#[async_trait]
impl Denoiser for HttpDenoiser {
    async fn denoise(&self, audio: &AudioFrame) -> CoreResult<AudioFrame> {
        let pcm = audio.to_pcm16();
        let mut bytes = Vec::with_capacity(pcm.len() * 2);
        for sample in pcm {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }

        let request = DenoiseRequest {
            audio_b64: BASE64.encode(&bytes),
            sample_rate: audio.sample_rate.as_u32(),
        };

        let response = self
            .client
            .post(self.url())
            .json(&request)
            .send()
            .await
            .map_err(|e| voice_assist_core::Error::Denoise(e.to_string()))?;

        if !response.status().is_success() {
            return Err(voice_assist_core::Error::Denoise(format!(
                "denoiser sidecar returned {}",
                response.status()
            )));
        }

        let body: DenoiseResponse = response
            .json()
            .await
            .map_err(|e| voice_assist_core::Error::Denoise(e.to_string()))?;

        let clean = BASE64
            .decode(body.audio_b64.trim())
            .map_err(|e| voice_assist_core::Error::Denoise(format!("bad audio payload: {e}")))?;
        let samples: Vec<f32> = clean
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
            .collect();

        Ok(AudioFrame::new(
            samples,
            audio.sample_rate,
            Channels::Mono,
            audio.sequence,
        ))
    }

    fn name(&self) -> &str {
        "denoiser-sidecar"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = DenoiseRequest {
            audio_b64: "AAAA".to_string(),
            sample_rate: 16_000,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["sample_rate"], 16_000);
    }
}
