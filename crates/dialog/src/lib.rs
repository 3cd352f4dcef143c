//! Dialog action routing
//!
//! One classify-and-dispatch cycle per finalized user utterance: an LLM
//! call labels the utterance with one of six actions, the matching
//! handler renders the reply text.

pub mod action;
pub mod prompts;
pub mod router;

pub use action::DialogAction;
pub use router::DialogRouter;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DialogError {
    #[error("Classification failed: {0}")]
    Classification(String),

    #[error("Reply rendering failed: {0}")]
    Rendering(String),

    #[error("Core error: {0}")]
    Core(#[from] voice_assist_core::Error),
}

pub type Result<T> = std::result::Result<T, DialogError>;
