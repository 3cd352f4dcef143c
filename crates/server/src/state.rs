//! Application state
//!
//! Shared state across all handlers.

use std::sync::Arc;

use parking_lot::RwLock;

use voice_assist_config::{load_settings, Settings};
use voice_assist_core::{Denoiser, DialogPlanner, SpeechDetector, SpeechSynthesizer, Transcriber};
use voice_assist_pipeline::InferencePool;

use crate::session::SessionRegistry;

/// The long-lived model collaborators, shared by every session
pub struct Collaborators {
    pub transcriber: Arc<dyn Transcriber>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub planner: Arc<dyn DialogPlanner>,
    /// Overrides the built-in energy VAD when present
    pub detector: Option<Arc<dyn SpeechDetector>>,
    /// Overrides the passthrough denoiser when present
    pub denoiser: Option<Arc<dyn Denoiser>>,
}

/// Application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration wrapped in RwLock for hot-reload support
    pub config: Arc<RwLock<Settings>>,
    /// Connected sessions
    pub sessions: Arc<SessionRegistry>,
    /// Shared model collaborators
    pub collaborators: Arc<Collaborators>,
    /// Bounded concurrency for collaborator calls
    pub pool: InferencePool,
    /// Environment name for config reload
    env: Option<String>,
}

impl AppState {
    pub fn new(config: Settings, collaborators: Collaborators) -> Self {
        let max_connections = config.server.max_connections;
        let pool = InferencePool::new(config.inference.max_concurrent);
        Self {
            config: Arc::new(RwLock::new(config)),
            sessions: Arc::new(SessionRegistry::new(max_connections)),
            collaborators: Arc::new(collaborators),
            pool,
            env: None,
        }
    }

    pub fn with_env(mut self, env: Option<String>) -> Self {
        self.env = env;
        self
    }

    /// Reload configuration from files and update the shared state
    pub fn reload_config(&self) -> Result<(), String> {
        let new_config = load_settings(self.env.as_deref())
            .map_err(|e| format!("Failed to reload config: {e}"))?;

        *self.config.write() = new_config;
        tracing::info!("Configuration reloaded successfully");
        Ok(())
    }

    /// Get a read guard to the current configuration
    pub fn get_config(&self) -> parking_lot::RwLockReadGuard<'_, Settings> {
        self.config.read()
    }
}
