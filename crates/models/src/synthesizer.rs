//! Text-to-speech HTTP sidecar client

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use voice_assist_core::{
    AudioFrame, Channels, Language, Result as CoreResult, SampleRate, SpeechSynthesizer,
};

use crate::voice::EnrolledVoice;
use crate::{ModelError, Result};

/// Client for the TTS sidecar's `/synthesize` endpoint
///
/// Every request carries the enrolled speaker sample so the sidecar
/// clones the same voice regardless of which worker serves the call.
pub struct HttpSynthesizer {
    endpoint: String,
    client: Client,
    voice: EnrolledVoice,
}

impl HttpSynthesizer {
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Duration,
        voice: EnrolledVoice,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ModelError::Network(e.to_string()))?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
            voice,
        })
    }

    fn url(&self) -> String {
        format!("{}/synthesize", self.endpoint.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct SynthesizeRequest<'a> {
    text: &'a str,
    language: &'a str,
    speaker_wav_b64: &'a str,
    sample_rate: u32,
}

#[derive(Debug, Deserialize)]
struct SynthesizeResponse {
    audio_b64: String,
    sample_rate: u32,
}

#[async_trait]
impl SpeechSynthesizer for HttpSynthesizer {
    async fn synthesize(&self, text: &str, language: Language) -> CoreResult<AudioFrame> {
        let request = SynthesizeRequest {
            text,
            language: language.as_str(),
            speaker_wav_b64: self.voice.wav_b64(),
            sample_rate: SampleRate::Hz24000.as_u32(),
        };

        let response = self
            .client
            .post(self.url())
            .json(&request)
            .send()
            .await
            .map_err(|e| voice_assist_core::Error::Synthesis(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(voice_assist_core::Error::Synthesis(format!(
                "TTS sidecar returned {status}: {body}"
            )));
        }

        let body: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| voice_assist_core::Error::Synthesis(e.to_string()))?;

        let bytes = BASE64
            .decode(body.audio_b64.trim())
            .map_err(|e| voice_assist_core::Error::Synthesis(format!("bad audio payload: {e}")))?;
        let samples: Vec<f32> = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
            .collect();

        let rate = SampleRate::from_u32(body.sample_rate).unwrap_or(SampleRate::Hz24000);
        Ok(AudioFrame::new(samples, rate, Channels::Mono, 0))
    }

    fn model_name(&self) -> &str {
        "tts-sidecar"
    }
}
