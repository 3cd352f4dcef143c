//! Per-session state machine
//!
//! One `VoiceSession` per connected client. Ingests audio chunks strictly
//! in order, accumulates deduplicated transcript text, decides when the
//! utterance is complete, and runs at most one cancellable response task
//! (classify, render, synthesize, encode). New speech while a reply is
//! playing cancels the in-flight task (barge-in).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use voice_assist_config::constants::audio as audio_constants;
use voice_assist_config::SessionConfig;
use voice_assist_core::{
    AudioFrame, ChatHistory, Channels, DialogPlanner, Denoiser, Language, LanguagePreference,
    SampleRate, SpeechDetector, SpeechSynthesizer, Transcriber, Turn,
};

use crate::dedup::strip_overlap;
use crate::encoder::{decode_pcm16_base64, EncodedReply, ReplyEncoder};
use crate::gate::TurnGate;
use crate::pool::InferencePool;
use crate::vad::{EnergyVad, PassthroughDenoiser};
use crate::{PipelineError, Result};

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Accepting user speech
    Listening,
    /// Utterance finalized, reply being generated
    Thinking,
    /// Synthesized reply delivered or in flight
    Speaking,
}

/// Events emitted to the transport layer
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// New deduplicated transcript text
    Transcript { text: String, language: Language },
    /// A synthesized reply is ready for delivery
    Reply {
        input_text: String,
        reply_text: String,
        action: String,
        audio: EncodedReply,
        end_conversation: bool,
    },
    /// A non-fatal error the client should hear about
    Error { kind: String, message: String },
}

/// Result of ingesting one audio chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// Payload was empty
    NoAudio,
    /// Audio present but no speech detected
    NoSpeech,
    /// Speech transcribed; holds the new (non-overlapping) text, if any
    Transcribed { new_text: Option<String> },
}

struct ActiveTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Emitted transcript increments kept for session introspection
const RECENT_TRANSCRIPT_HISTORY: usize = 3;

/// Ingestion sample rate from the constants module
fn target_rate() -> SampleRate {
    SampleRate::from_u32(audio_constants::TARGET_SAMPLE_RATE).unwrap_or(SampleRate::Hz16000)
}

/// One client's conversation state and response orchestration
///
/// Cheap to clone; all state is shared. Chunk ingestion must be called
/// sequentially per session (the transport's receive loop guarantees
/// this); event delivery and response generation run concurrently.
#[derive(Clone)]
pub struct VoiceSession {
    id: Arc<str>,
    config: Arc<SessionConfig>,

    phase: Arc<Mutex<SessionPhase>>,
    gate: Arc<Mutex<TurnGate>>,
    chunk_buffer: Arc<Mutex<VecDeque<AudioFrame>>>,
    last_emitted: Arc<Mutex<String>>,
    recent_transcripts: Arc<Mutex<VecDeque<String>>>,
    emit_count: Arc<AtomicU64>,
    sequence: Arc<AtomicU64>,
    history: Arc<Mutex<ChatHistory>>,
    language: Arc<Mutex<LanguagePreference>>,
    active_task: Arc<tokio::sync::Mutex<Option<ActiveTask>>>,

    events: broadcast::Sender<SessionEvent>,
    encoder: Arc<ReplyEncoder>,
    pool: InferencePool,

    transcriber: Arc<dyn Transcriber>,
    detector: Arc<dyn SpeechDetector>,
    denoiser: Arc<dyn Denoiser>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    planner: Arc<dyn DialogPlanner>,
}

impl VoiceSession {
    pub fn new(
        id: impl Into<String>,
        config: SessionConfig,
        transcriber: Arc<dyn Transcriber>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        planner: Arc<dyn DialogPlanner>,
        pool: InferencePool,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        let gate = TurnGate::new(config.min_silent_chunks, config.silence_grace_ms);
        let history = ChatHistory::with_system_prompt(&config.system_prompt);

        Self {
            id: id.into().into(),
            phase: Arc::new(Mutex::new(SessionPhase::Listening)),
            gate: Arc::new(Mutex::new(gate)),
            chunk_buffer: Arc::new(Mutex::new(VecDeque::with_capacity(config.chunk_context))),
            last_emitted: Arc::new(Mutex::new(String::new())),
            recent_transcripts: Arc::new(Mutex::new(VecDeque::with_capacity(
                RECENT_TRANSCRIPT_HISTORY,
            ))),
            emit_count: Arc::new(AtomicU64::new(0)),
            sequence: Arc::new(AtomicU64::new(0)),
            history: Arc::new(Mutex::new(history)),
            language: Arc::new(Mutex::new(LanguagePreference::Auto)),
            active_task: Arc::new(tokio::sync::Mutex::new(None)),
            events,
            encoder: Arc::new(ReplyEncoder),
            pool,
            transcriber,
            detector: Arc::new(EnergyVad::default()),
            denoiser: Arc::new(PassthroughDenoiser),
            synthesizer,
            planner,
            config: Arc::new(config),
        }
    }

    /// Replace the default energy-based speech detector
    pub fn with_detector(mut self, detector: Arc<dyn SpeechDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// Replace the default passthrough denoiser
    pub fn with_denoiser(mut self, denoiser: Arc<dyn Denoiser>) -> Self {
        self.denoiser = denoiser;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn phase(&self) -> SessionPhase {
        *self.phase.lock()
    }

    pub fn emit_count(&self) -> u64 {
        self.emit_count.load(Ordering::Relaxed)
    }

    /// Most recent emitted transcript increments, oldest first
    pub fn recent_transcripts(&self) -> Vec<String> {
        self.recent_transcripts.lock().iter().cloned().collect()
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Ingest one audio chunk
    ///
    /// `payload` is base64 S16LE PCM; an empty payload counts as silence.
    /// `language` is the client's stated preference for this chunk.
    pub async fn process_chunk(
        &self,
        payload: &str,
        sample_rate: u32,
        language: LanguagePreference,
    ) -> Result<ChunkOutcome> {
        *self.language.lock() = language;

        if payload.trim().is_empty() {
            self.gate.lock().record_silence();
            self.maybe_respond().await;
            return Ok(ChunkOutcome::NoAudio);
        }

        // Decode failure is terminal for this chunk only
        let samples = decode_pcm16_base64(payload)
            .map_err(|e| PipelineError::Decode(format!("invalid pcm16 payload: {e}")))?;
        let rate = SampleRate::from_u32(sample_rate)
            .ok_or_else(|| PipelineError::Decode(format!("unsupported sample rate {sample_rate}")))?;

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let frame = AudioFrame::new(samples, rate, Channels::Mono, sequence);

        // Denoise is best-effort
        let frame = {
            let _permit = self.pool.acquire().await;
            match self.denoiser.denoise(&frame).await {
                Ok(clean) => clean,
                Err(e) => {
                    tracing::warn!(session_id = %self.id, error = %e, "denoise failed, using raw audio");
                    frame
                }
            }
        };

        // Resampling falls back to linear interpolation internally, so
        // this never fails the chunk
        let frame = frame.resample(target_rate());

        if frame.mean_amplitude() < audio_constants::NEAR_SILENCE_MEAN_AMPLITUDE {
            self.gate.lock().record_silence();
            self.maybe_respond().await;
            return Ok(ChunkOutcome::NoSpeech);
        }

        // Detector failure counts as silence, not a session error
        let speech_probability = {
            let _permit = self.pool.acquire().await;
            match self.detector.speech_probability(&frame).await {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(session_id = %self.id, error = %e, "speech detection failed, treating as silence");
                    0.0
                }
            }
        };

        if speech_probability < self.config.vad_threshold {
            self.gate.lock().record_silence();
            self.maybe_respond().await;
            return Ok(ChunkOutcome::NoSpeech);
        }

        self.gate.lock().record_speech();

        // New speech while a reply is playing cancels it before anything else
        self.barge_in().await;

        let context = {
            let frame = frame.peak_normalize(audio_constants::PEAK_NORMALIZE_FLOOR);
            let mut buffer = self.chunk_buffer.lock();
            if buffer.len() >= self.config.chunk_context {
                buffer.pop_front();
            }
            buffer.push_back(frame);
            AudioFrame::concat(buffer.make_contiguous())
        };

        let Some(context) = context else {
            return Ok(ChunkOutcome::NoSpeech);
        };

        // Buffers stay intact on failure so the next chunk retries with
        // more context
        let transcript = {
            let _permit = self.pool.acquire().await;
            self.transcriber
                .transcribe(&context, language)
                .await
                .map_err(|e| PipelineError::Transcription(e.to_string()))?
        };

        if transcript.is_blank() {
            self.gate.lock().record_silence();
            self.maybe_respond().await;
            return Ok(ChunkOutcome::Transcribed { new_text: None });
        }

        let detected = transcript
            .language
            .unwrap_or_else(|| Language::detect(&transcript.text));
        if !self
            .config
            .supported_languages
            .iter()
            .any(|l| l == detected.as_str())
        {
            tracing::debug!(session_id = %self.id, language = %detected, "transcript language not supported, dropping");
            self.maybe_respond().await;
            return Ok(ChunkOutcome::Transcribed { new_text: None });
        }

        let new_text = {
            let mut last = self.last_emitted.lock();
            let increment =
                strip_overlap(&last, &transcript.text, self.config.overlap_threshold).to_string();
            *last = transcript.text.clone();
            increment
        };

        if !new_text.is_empty() {
            self.gate.lock().append_text(&new_text);
            {
                let mut recent = self.recent_transcripts.lock();
                if recent.len() >= RECENT_TRANSCRIPT_HISTORY {
                    recent.pop_front();
                }
                recent.push_back(new_text.clone());
            }
            self.emit_count.fetch_add(1, Ordering::Relaxed);
            let _ = self.events.send(SessionEvent::Transcript {
                text: new_text.clone(),
                language: detected,
            });
            tracing::info!(session_id = %self.id, text = %new_text, "transcript emitted");
        }

        self.maybe_respond().await;

        Ok(ChunkOutcome::Transcribed {
            new_text: (!new_text.is_empty()).then_some(new_text),
        })
    }

    /// Evaluate the finalization gate and start a response task if it fires
    async fn maybe_respond(&self) {
        let listening = *self.phase.lock() == SessionPhase::Listening;
        let utterance = {
            let mut gate = self.gate.lock();
            if !gate.should_finalize(listening) {
                return;
            }
            gate.take_utterance()
        };

        *self.phase.lock() = SessionPhase::Thinking;
        tracing::info!(session_id = %self.id, utterance = %utterance, "utterance finalized, generating reply");

        let mut slot = self.active_task.lock().await;
        // A previous task can only be here fully finished; drain it
        if let Some(old) = slot.take() {
            old.token.cancel();
            let _ = old.handle.await;
        }

        let token = CancellationToken::new();
        let session = self.clone();
        let task_token = token.clone();
        let handle = tokio::spawn(async move {
            session.run_response(task_token, utterance).await;
        });

        *slot = Some(ActiveTask { token, handle });
    }

    /// Run one response cycle under a cancellation token
    ///
    /// Whatever happens, the finalizer clears the pending utterance and
    /// returns the session to `Listening`.
    async fn run_response(&self, token: CancellationToken, utterance: String) {
        let result = tokio::select! {
            _ = token.cancelled() => None,
            res = self.generate_reply(&utterance) => Some(res),
        };

        match result {
            Some(Ok(())) => {}
            Some(Err(e)) => {
                tracing::error!(session_id = %self.id, error = %e, "response generation failed");
                let _ = self.events.send(SessionEvent::Error {
                    kind: "response_generation".to_string(),
                    message: e.to_string(),
                });
            }
            None => {
                tracing::info!(session_id = %self.id, "response task cancelled");
            }
        }

        self.gate.lock().reset();
        *self.phase.lock() = SessionPhase::Listening;
    }

    async fn generate_reply(&self, utterance: &str) -> Result<()> {
        let language = {
            let preference = *self.language.lock();
            preference
                .fixed()
                .unwrap_or_else(|| Language::detect(utterance))
        };

        let history_snapshot = {
            let mut history = self.history.lock();
            history.push(Turn::user(utterance));
            history.turns().to_vec()
        };

        let outcome = {
            let _permit = self.pool.acquire().await;
            self.planner
                .plan(&history_snapshot, utterance)
                .await
                .map_err(|e| PipelineError::Dialog(e.to_string()))?
        };

        self.history.lock().push(Turn::assistant(&outcome.reply));

        *self.phase.lock() = SessionPhase::Speaking;

        let spoken = {
            let _permit = self.pool.acquire().await;
            self.synthesizer
                .synthesize(&outcome.reply, language)
                .await
                .map_err(|e| PipelineError::Synthesis(e.to_string()))?
        };

        let spoken = {
            let _permit = self.pool.acquire().await;
            match self.denoiser.denoise(&spoken).await {
                Ok(clean) => clean,
                Err(e) => {
                    tracing::warn!(session_id = %self.id, error = %e, "reply denoise failed, using raw synthesis");
                    spoken
                }
            }
        };

        let audio = self.encoder.encode(&spoken);
        let _ = self.events.send(SessionEvent::Reply {
            input_text: utterance.to_string(),
            reply_text: outcome.reply,
            action: outcome.action,
            audio,
            end_conversation: outcome.end_conversation,
        });

        Ok(())
    }

    /// Cancel the active response task if a reply is currently playing
    ///
    /// Called on every chunk with newly detected speech, before ingestion
    /// continues. Must complete before the new chunk is processed so the
    /// cancelled task cannot emit a stale reply afterwards.
    async fn barge_in(&self) {
        if *self.phase.lock() != SessionPhase::Speaking {
            return;
        }

        tracing::info!(session_id = %self.id, "barge-in: cancelling active reply");
        let mut slot = self.active_task.lock().await;
        if let Some(task) = slot.take() {
            task.token.cancel();
            let _ = task.handle.await;
        }
        *self.phase.lock() = SessionPhase::Listening;
    }

    /// Disconnect teardown: cancel any in-flight work and wait for it
    pub async fn close(&self) {
        let mut slot = self.active_task.lock().await;
        if let Some(task) = slot.take() {
            task.token.cancel();
            let _ = task.handle.await;
        }
        *self.phase.lock() = SessionPhase::Listening;
        tracing::debug!(session_id = %self.id, "session closed");
    }

    /// Number of turns in the conversation, including the system prompt
    pub fn history_len(&self) -> usize {
        self.history.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use voice_assist_core::{
        DialogOutcome, Result as CoreResult, TranscriptResult,
    };

    fn pcm_payload(samples: &[f32]) -> String {
        let mut bytes = Vec::new();
        for s in samples {
            bytes.extend_from_slice(&(((*s) * 32767.0) as i16).to_le_bytes());
        }
        BASE64.encode(&bytes)
    }

    fn loud_chunk() -> String {
        pcm_payload(&vec![0.5; 1600])
    }

    struct FixedTranscriber {
        text: String,
        calls: AtomicUsize,
    }

    impl FixedTranscriber {
        fn new(text: &str) -> Self {
            Self {
                text: text.to_string(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Transcriber for FixedTranscriber {
        async fn transcribe(
            &self,
            _audio: &AudioFrame,
            _preference: LanguagePreference,
        ) -> CoreResult<TranscriptResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(TranscriptResult::new(&self.text).with_language(Language::English))
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    struct SlowSynthesizer {
        delay: Duration,
    }

    #[async_trait]
    impl SpeechSynthesizer for SlowSynthesizer {
        async fn synthesize(&self, _text: &str, _language: Language) -> CoreResult<AudioFrame> {
            tokio::time::sleep(self.delay).await;
            Ok(AudioFrame::new(
                vec![0.1; 2400],
                SampleRate::Hz24000,
                Channels::Mono,
                0,
            ))
        }

        fn model_name(&self) -> &str {
            "slow"
        }
    }

    /// Transcriber that walks a fixed sequence of growing transcripts
    struct SequenceTranscriber {
        texts: Vec<String>,
        calls: AtomicUsize,
    }

    impl SequenceTranscriber {
        fn new(texts: &[&str]) -> Self {
            Self {
                texts: texts.iter().map(|t| t.to_string()).collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Transcriber for SequenceTranscriber {
        async fn transcribe(
            &self,
            _audio: &AudioFrame,
            _preference: LanguagePreference,
        ) -> CoreResult<TranscriptResult> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let text = &self.texts[call.min(self.texts.len() - 1)];
            Ok(TranscriptResult::new(text).with_language(Language::English))
        }

        fn model_name(&self) -> &str {
            "sequence"
        }
    }

    /// Denoiser that records how many calls overlap in time
    #[derive(Default)]
    struct CountingDenoiser {
        current: AtomicUsize,
        max_seen: AtomicUsize,
    }

    #[async_trait]
    impl Denoiser for CountingDenoiser {
        async fn denoise(&self, audio: &AudioFrame) -> CoreResult<AudioFrame> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(audio.clone())
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    struct EchoPlanner;

    #[async_trait]
    impl DialogPlanner for EchoPlanner {
        async fn plan(&self, _history: &[Turn], user_text: &str) -> CoreResult<DialogOutcome> {
            Ok(DialogOutcome {
                reply: format!("you said: {user_text}"),
                action: "ai_reply".to_string(),
                end_conversation: false,
            })
        }
    }

    fn test_session(synth_delay: Duration) -> VoiceSession {
        let mut config = SessionConfig::default();
        config.silence_grace_ms = 0;
        VoiceSession::new(
            "test-session",
            config,
            Arc::new(FixedTranscriber::new("hello how are you")),
            Arc::new(SlowSynthesizer { delay: synth_delay }),
            Arc::new(EchoPlanner),
            InferencePool::new(4),
        )
    }

    #[tokio::test]
    async fn test_empty_payload_counts_as_silence() {
        let session = test_session(Duration::ZERO);
        let outcome = session
            .process_chunk("", 16_000, LanguagePreference::Auto)
            .await
            .unwrap();
        assert_eq!(outcome, ChunkOutcome::NoAudio);
        assert_eq!(session.phase(), SessionPhase::Listening);
    }

    #[tokio::test]
    async fn test_garbage_payload_is_terminal_for_chunk_only() {
        let session = test_session(Duration::ZERO);
        let err = session
            .process_chunk("@@not-base64@@", 16_000, LanguagePreference::Auto)
            .await;
        assert!(err.is_err());
        // Session survives and keeps accepting chunks
        let outcome = session
            .process_chunk("", 16_000, LanguagePreference::Auto)
            .await
            .unwrap();
        assert_eq!(outcome, ChunkOutcome::NoAudio);
    }

    #[tokio::test]
    async fn test_speech_chunk_emits_transcript() {
        let session = test_session(Duration::ZERO);
        let mut events = session.subscribe();

        let outcome = session
            .process_chunk(&loud_chunk(), 16_000, LanguagePreference::Auto)
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            ChunkOutcome::Transcribed { new_text: Some(_) }
        ));
        assert_eq!(session.emit_count(), 1);

        match events.try_recv().unwrap() {
            SessionEvent::Transcript { text, language } => {
                assert_eq!(text, "hello how are you");
                assert_eq!(language, Language::English);
            }
            other => panic!("expected transcript event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_repeated_transcript_is_deduplicated() {
        let session = test_session(Duration::ZERO);
        session
            .process_chunk(&loud_chunk(), 16_000, LanguagePreference::Auto)
            .await
            .unwrap();
        // Transcriber returns the identical text again; nothing new to emit
        let outcome = session
            .process_chunk(&loud_chunk(), 16_000, LanguagePreference::Auto)
            .await
            .unwrap();
        assert_eq!(outcome, ChunkOutcome::Transcribed { new_text: None });
        assert_eq!(session.emit_count(), 1);
    }

    #[tokio::test]
    async fn test_silence_after_speech_finalizes_and_replies() {
        let session = test_session(Duration::ZERO);
        let mut events = session.subscribe();

        session
            .process_chunk(&loud_chunk(), 16_000, LanguagePreference::Auto)
            .await
            .unwrap();
        session
            .process_chunk("", 16_000, LanguagePreference::Auto)
            .await
            .unwrap();
        session
            .process_chunk("", 16_000, LanguagePreference::Auto)
            .await
            .unwrap();

        // First silent chunk is below the threshold, second fires the gate
        let reply = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match events.recv().await.unwrap() {
                    SessionEvent::Reply {
                        input_text,
                        reply_text,
                        ..
                    } => break (input_text, reply_text),
                    _ => continue,
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(reply.0, "hello how are you");
        assert!(reply.1.contains("hello how are you"));

        // Finalizer returned the session to listening
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(session.phase(), SessionPhase::Listening);
        // System prompt + user turn + assistant turn
        assert_eq!(session.history_len(), 3);
    }

    #[tokio::test]
    async fn test_barge_in_cancels_active_reply() {
        // Synthesis slow enough that new speech arrives mid-task
        let session = test_session(Duration::from_secs(5));
        let mut events = session.subscribe();

        session
            .process_chunk(&loud_chunk(), 16_000, LanguagePreference::Auto)
            .await
            .unwrap();
        session
            .process_chunk("", 16_000, LanguagePreference::Auto)
            .await
            .unwrap();
        session
            .process_chunk("", 16_000, LanguagePreference::Auto)
            .await
            .unwrap();

        // Wait until the task reaches synthesis
        tokio::time::timeout(Duration::from_secs(2), async {
            while session.phase() != SessionPhase::Speaking {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        // New speech while speaking must cancel the reply
        session
            .process_chunk(&loud_chunk(), 16_000, LanguagePreference::Auto)
            .await
            .unwrap();
        assert_eq!(session.phase(), SessionPhase::Listening);

        // No reply event may have been delivered
        while let Ok(event) = events.try_recv() {
            assert!(
                !matches!(event, SessionEvent::Reply { .. }),
                "cancelled task must not deliver a reply"
            );
        }
    }

    #[tokio::test]
    async fn test_denoiser_calls_go_through_the_pool() {
        // A shared single-permit pool must serialize denoiser calls even
        // when two sessions ingest concurrently
        let denoiser = Arc::new(CountingDenoiser::default());
        let pool = InferencePool::new(1);
        let mut config = SessionConfig::default();
        config.silence_grace_ms = 0;

        let make = |id: &str| {
            VoiceSession::new(
                id,
                config.clone(),
                Arc::new(FixedTranscriber::new("hello how are you")),
                Arc::new(SlowSynthesizer {
                    delay: Duration::ZERO,
                }),
                Arc::new(EchoPlanner),
                pool.clone(),
            )
            .with_denoiser(denoiser.clone())
        };
        let first = make("pool-a");
        let second = make("pool-b");

        let chunk_a = loud_chunk();
        let chunk_b = loud_chunk();
        let (r1, r2) = tokio::join!(
            first.process_chunk(&chunk_a, 16_000, LanguagePreference::Auto),
            second.process_chunk(&chunk_b, 16_000, LanguagePreference::Auto),
        );
        r1.unwrap();
        r2.unwrap();

        assert_eq!(
            denoiser.max_seen.load(Ordering::SeqCst),
            1,
            "denoiser calls overlapped despite pool capacity 1"
        );
    }

    #[tokio::test]
    async fn test_recent_transcripts_keep_last_three() {
        let mut config = SessionConfig::default();
        config.silence_grace_ms = 0;
        let session = VoiceSession::new(
            "recent",
            config,
            Arc::new(SequenceTranscriber::new(&[
                "red",
                "red green",
                "red green blue",
                "red green blue yellow",
            ])),
            Arc::new(SlowSynthesizer {
                delay: Duration::ZERO,
            }),
            Arc::new(EchoPlanner),
            InferencePool::new(4),
        );

        for _ in 0..4 {
            session
                .process_chunk(&loud_chunk(), 16_000, LanguagePreference::Auto)
                .await
                .unwrap();
        }

        assert_eq!(session.emit_count(), 4);
        // Only the newest three increments are retained
        assert_eq!(
            session.recent_transcripts(),
            vec!["green".to_string(), "blue".to_string(), "yellow".to_string()]
        );
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let session = test_session(Duration::ZERO);
        session.close().await;
        session.close().await;
        assert_eq!(session.phase(), SessionPhase::Listening);
    }
}
