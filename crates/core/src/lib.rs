//! Core traits and types for the voice assistant
//!
//! This crate provides foundational types used across all other crates:
//! - Collaborator traits for pluggable backends (ASR, TTS, VAD, denoise, LLM)
//! - Audio frame types and processing
//! - Language definitions
//! - Conversation types
//! - Error types

pub mod audio;
pub mod conversation;
pub mod error;
pub mod language;
pub mod traits;
pub mod transcript;

pub use audio::{AudioFrame, Channels, SampleRate};
pub use conversation::{ChatHistory, Turn, TurnRole};
pub use error::{Error, Result};
pub use language::{Language, LanguagePreference};
pub use transcript::TranscriptResult;

pub use traits::{
    DialogOutcome, DialogPlanner, Denoiser, RenderOptions, SpeechDetector, SpeechSynthesizer,
    TextRenderer, Transcriber,
};
