//! Error types shared across crates

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("Denoise error: {0}")]
    Denoise(String),

    #[error("Speech detection error: {0}")]
    SpeechDetection(String),

    #[error("Rendering error: {0}")]
    Rendering(String),

    #[error("Dialog error: {0}")]
    Dialog(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result alias using the core error
pub type Result<T> = std::result::Result<T, Error>;
