//! Transcription result types

use crate::Language;
use serde::{Deserialize, Serialize};

/// Result of transcribing an audio buffer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptResult {
    /// Transcribed text
    pub text: String,
    /// Language the transcriber detected (or was forced to)
    pub language: Option<Language>,
    /// Confidence score (0.0 - 1.0), when the backend reports one
    pub confidence: Option<f32>,
}

impl TranscriptResult {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: None,
            confidence: None,
        }
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    /// True when the trimmed text is empty
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank() {
        assert!(TranscriptResult::new("  ").is_blank());
        assert!(!TranscriptResult::new("hi").is_blank());
    }
}
