//! Speech finalization gate
//!
//! Decides when accumulated user speech counts as a finished utterance.
//! Per-chunk VAD decisions jitter, so a single silent frame is not enough:
//! the gate requires a short run of empty chunks plus a grace window after
//! the last detected speech.

use std::time::{Duration, Instant};

/// Silence policy state for one session
#[derive(Debug)]
pub struct TurnGate {
    /// Consecutive chunks with no detected speech
    empty_chunk_count: u32,
    /// Monotonic time of the most recent detected speech
    last_speech_at: Instant,
    /// Accumulated not-yet-responded-to user text
    pending_text: String,

    min_silent_chunks: u32,
    silence_grace: Duration,
}

impl TurnGate {
    pub fn new(min_silent_chunks: u32, silence_grace_ms: u64) -> Self {
        Self {
            empty_chunk_count: 0,
            last_speech_at: Instant::now(),
            pending_text: String::new(),
            min_silent_chunks,
            silence_grace: Duration::from_millis(silence_grace_ms),
        }
    }

    /// Record a chunk with no detected speech
    pub fn record_silence(&mut self) {
        self.empty_chunk_count = self.empty_chunk_count.saturating_add(1);
    }

    /// Record detected speech, resetting the silence run
    pub fn record_speech(&mut self) {
        self.empty_chunk_count = 0;
        self.last_speech_at = Instant::now();
    }

    /// Append a deduplicated transcript increment to the pending utterance
    pub fn append_text(&mut self, increment: &str) {
        if increment.is_empty() {
            return;
        }
        if !self.pending_text.is_empty() {
            self.pending_text.push(' ');
        }
        self.pending_text.push_str(increment);
    }

    /// Current pending utterance text
    pub fn pending_text(&self) -> &str {
        &self.pending_text
    }

    pub fn has_pending_text(&self) -> bool {
        !self.pending_text.trim().is_empty()
    }

    /// Whether the utterance is complete and a reply should be generated.
    ///
    /// The caller supplies whether the session is currently listening; the
    /// gate never fires while a reply is being generated or spoken.
    pub fn should_finalize(&self, listening: bool) -> bool {
        listening
            && self.empty_chunk_count >= self.min_silent_chunks
            && self.last_speech_at.elapsed() >= self.silence_grace
            && self.has_pending_text()
    }

    /// Take the pending utterance, clearing it and resetting the silence run
    pub fn take_utterance(&mut self) -> String {
        self.empty_chunk_count = 0;
        std::mem::take(&mut self.pending_text)
    }

    /// Clear all accumulated state (response finalizer path)
    pub fn reset(&mut self) {
        self.empty_chunk_count = 0;
        self.pending_text.clear();
    }

    pub fn empty_chunk_count(&self) -> u32 {
        self.empty_chunk_count
    }
}
