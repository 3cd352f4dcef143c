//! Speech-to-text HTTP sidecar client

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use voice_assist_core::{
    AudioFrame, Language, LanguagePreference, Result as CoreResult, Transcriber, TranscriptResult,
};

use crate::{ModelError, Result};

/// Client for the ASR sidecar's `/transcribe` endpoint
pub struct HttpTranscriber {
    endpoint: String,
    client: Client,
}

impl HttpTranscriber {
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
        format!("{}/transcribe", self.endpoint.trim_end_matches('/'))
    }

    fn encode_pcm16(audio: &AudioFrame) -> String {
        let pcm = audio.to_pcm16();
        let mut bytes = Vec::with_capacity(pcm.len() * 2);
        for sample in pcm {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        BASE64.encode(&bytes)
    }
}

#[derive(Debug, Serialize)]
struct TranscribeRequest {
    audio_b64: String,
    sample_rate: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    confidence: Option<f32>,
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(
        &self,
        audio: &AudioFrame,
        preference: LanguagePreference,
    ) -> CoreResult<TranscriptResult> {
        let request = TranscribeRequest {
            audio_b64: Self::encode_pcm16(audio),
            sample_rate: audio.sample_rate.as_u32(),
            language: preference.fixed().map(|l| l.as_str().to_string()),
        };

        let response = self
            .client
            .post(self.url())
            .json(&request)
            .send()
            .await
            .map_err(|e| voice_assist_core::Error::Transcription(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(voice_assist_core::Error::Transcription(format!(
                "ASR sidecar returned {status}: {body}"
            )));
        }

        let body: TranscribeResponse = response
            .json()
            .await
            .map_err(|e| voice_assist_core::Error::Transcription(e.to_string()))?;

        let mut result = TranscriptResult::new(body.text.trim());
        if let Some(tag) = body.language.as_deref() {
            if let Some(language) = Language::from_tag(tag) {
                result = result.with_language(language);
            }
        }
        result.confidence = body.confidence;
        Ok(result)
    }

    fn model_name(&self) -> &str {
        "asr-sidecar"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voice_assist_core::{Channels, SampleRate};

    #[test]
    fn test_request_includes_language_only_when_fixed() {
        let frame = AudioFrame::new(vec![0.1; 160], SampleRate::Hz16000, Channels::Mono, 0);
        let request = TranscribeRequest {
            audio_b64: HttpTranscriber::encode_pcm16(&frame),
            sample_rate: 16_000,
            language: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("language").is_none());
        assert_eq!(json["sample_rate"], 16_000);
    }

    #[test]
    fn test_response_with_missing_fields() {
        let raw = r#"{"text":"hello"}"#;
        let response: TranscribeResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.text, "hello");
        assert!(response.language.is_none());
        assert!(response.confidence.is_none());
    }

    #[test]
    fn test_pcm16_payload_length() {
        let frame = AudioFrame::new(vec![0.0; 100], SampleRate::Hz16000, Channels::Mono, 0);
        let payload = HttpTranscriber::encode_pcm16(&frame);
        let decoded = BASE64.decode(payload).unwrap();
        assert_eq!(decoded.len(), 200);
    }
}
