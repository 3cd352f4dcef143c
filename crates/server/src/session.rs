//! Session registry
//!
//! One `VoiceSession` per connected client, keyed by the id minted at
//! connect time. Structural mutation is serialized behind a lock; each
//! session's own processing runs independently.

use std::collections::HashMap;

use parking_lot::RwLock;
use voice_assist_pipeline::VoiceSession;

use crate::ServerError;

pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, VoiceSession>>,
    max_sessions: usize,
}

impl SessionRegistry {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
        }
    }

    /// Register a newly connected session
    pub fn insert(&self, session: VoiceSession) -> Result<(), ServerError> {
        let mut sessions = self.sessions.write();
        if sessions.len() >= self.max_sessions {
            return Err(ServerError::SessionLimit);
        }
        let id = session.id().to_string();
        sessions.insert(id.clone(), session);
        metrics::gauge!("voice_assist_active_sessions").set(sessions.len() as f64);
        tracing::info!(session_id = %id, total = sessions.len(), "session registered");
        Ok(())
    }

    /// Cheap handle clone; all session state is shared
    pub fn get(&self, id: &str) -> Option<VoiceSession> {
        self.sessions.read().get(id).cloned()
    }

    /// Return the session for `id`, building and registering it if absent
    ///
    /// The builder only runs when the id is new. Capacity is enforced the
    /// same way as [`Self::insert`].
    pub fn get_or_create(
        &self,
        id: &str,
        build: impl FnOnce() -> VoiceSession,
    ) -> Result<VoiceSession, ServerError> {
        if let Some(existing) = self.get(id) {
            return Ok(existing);
        }
        let session = build();
        self.insert(session.clone())?;
        Ok(session)
    }

    /// Teardown on disconnect
    ///
    /// Removes the entry, then cancels and awaits any in-flight response
    /// task. The lock is released before awaiting.
    pub async fn remove(&self, id: &str) {
        let session = self.sessions.write().remove(id);
        let count = self.sessions.read().len();
        metrics::gauge!("voice_assist_active_sessions").set(count as f64);

        if let Some(session) = session {
            session.close().await;
            tracing::info!(session_id = %id, remaining = count, "session removed");
        }
    }

    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn list_ids(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;
    use voice_assist_config::SessionConfig;
    use voice_assist_core::{
        AudioFrame, DialogOutcome, DialogPlanner, Language, LanguagePreference,
        Result as CoreResult, SpeechSynthesizer, Transcriber, TranscriptResult, Turn,
    };
    use voice_assist_pipeline::InferencePool;

    struct NullTranscriber;
    #[async_trait]
    impl Transcriber for NullTranscriber {
        async fn transcribe(
            &self,
            _audio: &AudioFrame,
            _preference: LanguagePreference,
        ) -> CoreResult<TranscriptResult> {
            Ok(TranscriptResult::new(""))
        }
        fn model_name(&self) -> &str {
            "null"
        }
    }

    struct NullSynthesizer;
    #[async_trait]
    impl SpeechSynthesizer for NullSynthesizer {
        async fn synthesize(&self, _text: &str, _language: Language) -> CoreResult<AudioFrame> {
            Err(voice_assist_core::Error::Synthesis("unavailable".into()))
        }
        fn model_name(&self) -> &str {
            "null"
        }
    }

    struct NullPlanner;
    #[async_trait]
    impl DialogPlanner for NullPlanner {
        async fn plan(&self, _history: &[Turn], _user_text: &str) -> CoreResult<DialogOutcome> {
            Err(voice_assist_core::Error::Dialog("unavailable".into()))
        }
    }

    fn make_session(id: &str) -> VoiceSession {
        VoiceSession::new(
            id,
            SessionConfig::default(),
            Arc::new(NullTranscriber),
            Arc::new(NullSynthesizer),
            Arc::new(NullPlanner),
            InferencePool::new(1),
        )
    }

    #[tokio::test]
    async fn test_insert_get_remove() {
        let registry = SessionRegistry::new(10);
        registry.insert(make_session("s1")).unwrap();
        assert_eq!(registry.count(), 1);
        assert!(registry.get("s1").is_some());

        registry.remove("s1").await;
        assert_eq!(registry.count(), 0);
        assert!(registry.get("s1").is_none());
    }

    #[tokio::test]
    async fn test_get_or_create_reuses_existing() {
        let registry = SessionRegistry::new(10);
        let first = registry.get_or_create("s1", || make_session("s1")).unwrap();
        // The builder must not run again for a known id
        let second = registry
            .get_or_create("s1", || panic!("builder ran for existing session"))
            .unwrap();
        assert_eq!(first.id(), second.id());
        assert_eq!(registry.count(), 1);
    }

    #[tokio::test]
    async fn test_capacity_limit() {
        let registry = SessionRegistry::new(1);
        registry.insert(make_session("s1")).unwrap();
        let err = registry.insert(make_session("s2")).unwrap_err();
        assert!(matches!(err, ServerError::SessionLimit));
    }

    #[tokio::test]
    async fn test_remove_unknown_is_noop() {
        let registry = SessionRegistry::new(10);
        registry.remove("missing").await;
        assert_eq!(registry.count(), 0);
    }
}
