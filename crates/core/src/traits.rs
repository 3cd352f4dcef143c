//! Collaborator traits
//!
//! The session core delegates all model inference to collaborators behind
//! these traits. Implementations live in the models crate (HTTP sidecars,
//! Ollama) and the pipeline crate (energy VAD, passthrough denoiser);
//! tests inject fakes.

use crate::conversation::Turn;
use crate::transcript::TranscriptResult;
use crate::{AudioFrame, Language, LanguagePreference, Result};
use async_trait::async_trait;

/// Speech-to-text interface
///
/// # Example
///
/// ```ignore
/// let asr: Arc<dyn Transcriber> = Arc::new(HttpTranscriber::new(config)?);
/// let transcript = asr.transcribe(&audio, LanguagePreference::Auto).await?;
/// println!("Transcribed: {}", transcript.text);
/// ```
#[async_trait]
pub trait Transcriber: Send + Sync + 'static {
    /// Transcribe an audio buffer
    ///
    /// `preference` either forces a language or asks the backend to detect
    /// one. Returns text plus the language the backend settled on.
    async fn transcribe(
        &self,
        audio: &AudioFrame,
        preference: LanguagePreference,
    ) -> Result<TranscriptResult>;

    /// Get model name for logging
    fn model_name(&self) -> &str;
}

/// Voice activity detection interface
#[async_trait]
pub trait SpeechDetector: Send + Sync + 'static {
    /// Probability that the frame contains speech (0.0 - 1.0)
    async fn speech_probability(&self, audio: &AudioFrame) -> Result<f32>;

    /// Get model info for logging
    fn model_info(&self) -> &str;
}

/// Noise reduction interface
#[async_trait]
pub trait Denoiser: Send + Sync + 'static {
    /// Return a cleaned copy of the frame
    async fn denoise(&self, audio: &AudioFrame) -> Result<AudioFrame>;

    /// Get processor name for logging
    fn name(&self) -> &str;
}

/// Text-to-speech interface
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync + 'static {
    /// Synthesize text to audio in the given language
    async fn synthesize(&self, text: &str, language: Language) -> Result<AudioFrame>;

    /// Get model name for logging
    fn model_name(&self) -> &str;
}

/// Per-call generation options
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Maximum tokens to generate
    pub max_tokens: usize,
    /// Temperature (0.0 = deterministic)
    pub temperature: f32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            max_tokens: 256,
            temperature: 0.7,
        }
    }
}

impl RenderOptions {
    /// Deterministic options for classification-style calls
    pub fn deterministic(max_tokens: usize) -> Self {
        Self {
            max_tokens,
            temperature: 0.0,
        }
    }
}

/// Text generation interface (chat-completions shape)
#[async_trait]
pub trait TextRenderer: Send + Sync + 'static {
    /// Generate a completion for the given message list
    async fn render(&self, messages: &[Turn], options: &RenderOptions) -> Result<String>;

    /// Get model name for logging
    fn model_name(&self) -> &str;
}

/// Outcome of one dialog planning step
#[derive(Debug, Clone)]
pub struct DialogOutcome {
    /// Assistant reply to speak
    pub reply: String,
    /// Which action produced the reply, for logging and metrics
    pub action: String,
    /// The conversation should end after this reply is delivered
    pub end_conversation: bool,
}

/// Dialog planning interface
///
/// Given the conversation so far, decide what to do with the latest user
/// utterance and produce the reply text.
#[async_trait]
pub trait DialogPlanner: Send + Sync + 'static {
    async fn plan(&self, history: &[Turn], user_text: &str) -> Result<DialogOutcome>;
}
