//! Model collaborator implementations
//!
//! Everything that talks to an external inference process lives here:
//! the Ollama chat backend and the ASR/TTS/denoiser HTTP sidecars. The
//! rest of the system only sees the traits from the core crate.

pub mod denoiser;
pub mod renderer;
pub mod synthesizer;
pub mod transcriber;
pub mod voice;

pub use denoiser::HttpDenoiser;
pub use renderer::{OllamaRenderer, RendererConfig};
pub use synthesizer::HttpSynthesizer;
pub use transcriber::HttpTranscriber;
pub use voice::EnrolledVoice;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Voice sample error: {0}")]
    VoiceSample(String),
}

impl From<reqwest::Error> for ModelError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ModelError::Timeout
        } else {
            ModelError::Network(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
