//! Output encoder
//!
//! Packages a synthesized waveform as base64 S16LE PCM plus explicit
//! format metadata so the client can decode it without negotiation.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use voice_assist_core::AudioFrame;

/// Audio format metadata carried alongside every reply payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AudioMetadata {
    pub container: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_format: String,
}

impl AudioMetadata {
    pub fn raw_pcm(sample_rate: u32) -> Self {
        Self {
            container: "RAW_PCM".to_string(),
            sample_rate,
            channels: 1,
            sample_format: "S16LE".to_string(),
        }
    }
}

/// A wire-ready synthesized reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodedReply {
    /// Base64-encoded S16LE PCM
    pub audio_b64: String,
    pub audio_meta: AudioMetadata,
}

/// Converts float waveforms to transport payloads
#[derive(Debug, Default)]
pub struct ReplyEncoder;

impl ReplyEncoder {
    /// Encode a mono frame as base64 S16LE PCM
    ///
    /// Samples are clamped to [-1.0, 1.0] before quantization.
    pub fn encode(&self, frame: &AudioFrame) -> EncodedReply {
        let pcm = frame.to_pcm16();
        let mut bytes = Vec::with_capacity(pcm.len() * 2);
        for sample in pcm {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }

        EncodedReply {
            audio_b64: BASE64.encode(&bytes),
            audio_meta: AudioMetadata::raw_pcm(frame.sample_rate.as_u32()),
        }
    }
}

/// Decode a base64 S16LE payload into normalized float samples
///
/// Inverse of [`ReplyEncoder::encode`]; ingestion uses it for incoming
/// client chunks.
pub fn decode_pcm16_base64(payload: &str) -> Result<Vec<f32>, base64::DecodeError> {
    let bytes = BASE64.decode(payload.trim())?;
    let samples = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect();
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use voice_assist_core::{Channels, SampleRate};

    #[test]
    fn test_metadata_shape() {
        let meta = AudioMetadata::raw_pcm(24_000);
        assert_eq!(meta.container, "RAW_PCM");
        assert_eq!(meta.sample_rate, 24_000);
        assert_eq!(meta.channels, 1);
        assert_eq!(meta.sample_format, "S16LE");
    }

    #[test]
    fn test_encode_produces_two_bytes_per_sample() {
        let frame = AudioFrame::new(vec![0.0, 0.5, -0.5], SampleRate::Hz24000, Channels::Mono, 0);
        let reply = ReplyEncoder.encode(&frame);
        let bytes = BASE64.decode(&reply.audio_b64).unwrap();
        assert_eq!(bytes.len(), 6);
        assert_eq!(reply.audio_meta.sample_rate, 24_000);
    }

    #[test]
    fn test_decode_inverts_encode() {
        let samples = vec![0.0, 0.25, -0.25, 0.9];
        let frame = AudioFrame::new(samples.clone(), SampleRate::Hz16000, Channels::Mono, 0);
        let reply = ReplyEncoder.encode(&frame);
        let decoded = decode_pcm16_base64(&reply.audio_b64).unwrap();
        assert_eq!(decoded.len(), samples.len());
        for (a, b) in samples.iter().zip(&decoded) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_pcm16_base64("not base64 !!!").is_err());
    }

    #[test]
    fn test_encode_clamps_out_of_range() {
        let frame = AudioFrame::new(vec![2.0, -2.0], SampleRate::Hz16000, Channels::Mono, 0);
        let reply = ReplyEncoder.encode(&frame);
        let bytes = BASE64.decode(&reply.audio_b64).unwrap();
        let first = i16::from_le_bytes([bytes[0], bytes[1]]);
        let second = i16::from_le_bytes([bytes[2], bytes[3]]);
        assert_eq!(first, i16::MAX);
        assert_eq!(second, -i16::MAX);
    }
}
