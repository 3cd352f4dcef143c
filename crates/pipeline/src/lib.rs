//! Session orchestration for the voice assistant
//!
//! Everything between a decoded audio chunk and an encoded spoken reply
//! lives here: transcript dedup, the silence gate, the per-session state
//! machine with barge-in, and the wire encoder for synthesized audio.

pub mod dedup;
pub mod encoder;
pub mod gate;
pub mod orchestrator;
pub mod pool;
pub mod vad;

pub use dedup::{overlap_len, strip_overlap};
pub use encoder::{AudioMetadata, EncodedReply, ReplyEncoder};
pub use gate::TurnGate;
pub use orchestrator::{SessionEvent, SessionPhase, VoiceSession};
pub use pool::InferencePool;
pub use vad::{EnergyVad, PassthroughDenoiser};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Audio decode error: {0}")]
    Decode(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("Dialog error: {0}")]
    Dialog(String),

    #[error("Core error: {0}")]
    Core(#[from] voice_assist_core::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
