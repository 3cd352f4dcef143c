//! Centralized constants for the voice assistant
//!
//! Single source of truth for tuning values used across the codebase.
//! Settings fields that expose these as configurable use them as serde
//! defaults.

/// Audio processing
pub mod audio {
    /// Sample rate all ingestion is resampled to (Hz)
    pub const TARGET_SAMPLE_RATE: u32 = 16_000;

    /// Sample rate of synthesized replies (Hz)
    pub const REPLY_SAMPLE_RATE: u32 = 24_000;

    /// Mean |amplitude| below which a resampled chunk counts as silence
    pub const NEAR_SILENCE_MEAN_AMPLITUDE: f32 = 1e-3;

    /// Peak above which a chunk is rescaled to full range
    pub const PEAK_NORMALIZE_FLOOR: f32 = 1e-4;

    /// Speech probability threshold
    pub const VAD_THRESHOLD: f32 = 0.85;
}

/// Turn-taking and finalization
pub mod turn {
    /// Silence required after the last speech frame before a turn can
    /// finalize (ms)
    pub const SILENCE_GRACE_MS: u64 = 300;

    /// Consecutive empty chunks required before a turn can finalize
    pub const MIN_SILENT_CHUNKS: u32 = 2;

    /// Number of recent speech chunks kept as transcription context
    pub const CHUNK_CONTEXT: usize = 3;

    /// Similarity ratio at or above which a suffix/prefix pair counts as
    /// the same speech
    pub const OVERLAP_THRESHOLD: f64 = 0.7;
}

/// LLM token budgets per call kind
pub mod llm {
    /// Action classification (one label)
    pub const CLASSIFY_MAX_TOKENS: usize = 60;

    /// Fact-record rendering (one sentence)
    pub const FACT_MAX_TOKENS: usize = 50;

    /// Free-form reply
    pub const REPLY_MAX_TOKENS: usize = 300;

    /// Non-system turns fed to the classifier
    pub const CLASSIFY_HISTORY_TURNS: usize = 3;
}

/// Service endpoints (defaults for local development)
pub mod endpoints {
    /// Ollama LLM endpoint
    pub const OLLAMA_DEFAULT: &str = "http://localhost:11434";

    /// Speech-to-text sidecar
    pub const ASR_DEFAULT: &str = "http://localhost:8081";

    /// Text-to-speech sidecar
    pub const TTS_DEFAULT: &str = "http://localhost:8082";
}

/// Timeouts (in milliseconds)
pub mod timeouts {
    /// LLM request timeout (ms)
    pub const LLM_REQUEST_MS: u64 = 60_000;

    /// ASR request timeout (ms)
    pub const ASR_TIMEOUT_MS: u64 = 10_000;

    /// TTS request timeout (ms)
    pub const TTS_TIMEOUT_MS: u64 = 15_000;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_thresholds_sane() {
        assert!(audio::NEAR_SILENCE_MEAN_AMPLITUDE > 0.0);
        assert!(audio::PEAK_NORMALIZE_FLOOR < audio::NEAR_SILENCE_MEAN_AMPLITUDE);
        assert!(audio::VAD_THRESHOLD > 0.0 && audio::VAD_THRESHOLD < 1.0);
    }

    #[test]
    fn test_turn_constants() {
        assert!(turn::MIN_SILENT_CHUNKS >= 1);
        assert!(turn::CHUNK_CONTEXT >= 1);
        assert!(turn::OVERLAP_THRESHOLD > 0.0 && turn::OVERLAP_THRESHOLD <= 1.0);
    }

    #[test]
    fn test_token_budget_ordering() {
        // Replies get the largest budget, fact sentences the smallest
        assert!(llm::REPLY_MAX_TOKENS > llm::CLASSIFY_MAX_TOKENS);
        assert!(llm::CLASSIFY_MAX_TOKENS > llm::FACT_MAX_TOKENS);
    }
}
