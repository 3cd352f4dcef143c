//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::constants::{audio, endpoints, timeouts, turn};
use crate::ConfigError;

/// Runtime environment enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode - relaxed validation, warnings only
    #[default]
    Development,
    /// Staging mode - stricter validation
    Staging,
    /// Production mode - all validations enforced
    Production,
}

impl RuntimeEnvironment {
    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Check if strict validation should be applied
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Per-session turn-taking configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Collaborator endpoints
    #[serde(default)]
    pub models: ModelEndpoints,

    /// Inference concurrency limits
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_session()?;
        self.validate_inference()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        let server = &self.server;

        if server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "Port cannot be 0".to_string(),
            });
        }

        if server.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.max_connections".to_string(),
                message: "Max connections must be at least 1".to_string(),
            });
        }

        if self.environment.is_production() && server.cors_enabled && server.cors_origins.is_empty()
        {
            tracing::warn!(
                "CORS is enabled in production but no origins are configured. \
                 This may block legitimate requests."
            );
        }

        Ok(())
    }

    fn validate_session(&self) -> Result<(), ConfigError> {
        let session = &self.session;

        if !(0.0..=1.0).contains(&session.overlap_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "session.overlap_threshold".to_string(),
                message: format!(
                    "Must be between 0.0 and 1.0, got {}",
                    session.overlap_threshold
                ),
            });
        }

        if session.min_silent_chunks == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.min_silent_chunks".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        if session.chunk_context == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.chunk_context".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        if session.supported_languages.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "session.supported_languages".to_string(),
                message: "At least one language must be supported".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&session.vad_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "session.vad_threshold".to_string(),
                message: format!("Must be between 0.0 and 1.0, got {}", session.vad_threshold),
            });
        }

        Ok(())
    }

    fn validate_inference(&self) -> Result<(), ConfigError> {
        if self.inference.max_concurrent == 0 {
            return Err(ConfigError::InvalidValue {
                field: "inference.max_concurrent".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// WebSocket path
    #[serde(default = "default_ws_path")]
    pub ws_path: String,

    /// Maximum concurrent connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// CORS allowed origins
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_ws_path() -> String {
    "/ws/client".to_string()
}
fn default_max_connections() -> usize {
    1000
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            ws_path: default_ws_path(),
            max_connections: default_max_connections(),
            cors_enabled: default_true(),
            // Empty by default - must be explicitly configured for production
            cors_origins: Vec::new(),
        }
    }
}

/// Per-session turn-taking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Silence required after the last speech frame before finalization (ms)
    #[serde(default = "default_silence_grace_ms")]
    pub silence_grace_ms: u64,

    /// Consecutive empty chunks required before finalization
    #[serde(default = "default_min_silent_chunks")]
    pub min_silent_chunks: u32,

    /// Recent speech chunks kept as transcription context
    #[serde(default = "default_chunk_context")]
    pub chunk_context: usize,

    /// Fuzzy overlap similarity threshold for transcript dedup
    #[serde(default = "default_overlap_threshold")]
    pub overlap_threshold: f64,

    /// Speech probability threshold
    #[serde(default = "default_vad_threshold")]
    pub vad_threshold: f32,

    /// Languages for which transcripts are emitted
    #[serde(default = "default_supported_languages")]
    pub supported_languages: Vec<String>,

    /// System prompt seeding each session's history
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

fn default_silence_grace_ms() -> u64 {
    turn::SILENCE_GRACE_MS
}
fn default_min_silent_chunks() -> u32 {
    turn::MIN_SILENT_CHUNKS
}
fn default_chunk_context() -> usize {
    turn::CHUNK_CONTEXT
}
fn default_overlap_threshold() -> f64 {
    turn::OVERLAP_THRESHOLD
}
fn default_vad_threshold() -> f32 {
    audio::VAD_THRESHOLD
}
fn default_supported_languages() -> Vec<String> {
    vec!["en".to_string(), "ar".to_string()]
}
fn default_system_prompt() -> String {
    "You are a polite customer service voice assistant for a telecom operator. \
     Keep answers short and conversational; they will be spoken aloud."
        .to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            silence_grace_ms: default_silence_grace_ms(),
            min_silent_chunks: default_min_silent_chunks(),
            chunk_context: default_chunk_context(),
            overlap_threshold: default_overlap_threshold(),
            vad_threshold: default_vad_threshold(),
            supported_languages: default_supported_languages(),
            system_prompt: default_system_prompt(),
        }
    }
}

/// Collaborator endpoints and model names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEndpoints {
    /// Ollama endpoint for text generation
    #[serde(default = "default_llm_endpoint")]
    pub llm_endpoint: String,

    /// Ollama model name
    #[serde(default = "default_llm_model")]
    pub llm_model: String,

    /// LLM request timeout (ms)
    #[serde(default = "default_llm_timeout_ms")]
    pub llm_timeout_ms: u64,

    /// Speech-to-text sidecar endpoint
    #[serde(default = "default_asr_endpoint")]
    pub asr_endpoint: String,

    /// ASR request timeout (ms)
    #[serde(default = "default_asr_timeout_ms")]
    pub asr_timeout_ms: u64,

    /// Text-to-speech sidecar endpoint
    #[serde(default = "default_tts_endpoint")]
    pub tts_endpoint: String,

    /// TTS request timeout (ms)
    #[serde(default = "default_tts_timeout_ms")]
    pub tts_timeout_ms: u64,

    /// Optional noise-reduction sidecar endpoint (passthrough when unset)
    #[serde(default)]
    pub denoiser_endpoint: Option<String>,

    /// Enrolled speaker WAV used for voice cloning
    #[serde(default = "default_voice_sample_path")]
    pub voice_sample_path: String,
}

fn default_llm_endpoint() -> String {
    endpoints::OLLAMA_DEFAULT.to_string()
}
fn default_llm_model() -> String {
    "qwen2.5:3b-instruct".to_string()
}
fn default_llm_timeout_ms() -> u64 {
    timeouts::LLM_REQUEST_MS
}
fn default_asr_endpoint() -> String {
    endpoints::ASR_DEFAULT.to_string()
}
fn default_asr_timeout_ms() -> u64 {
    timeouts::ASR_TIMEOUT_MS
}
fn default_tts_endpoint() -> String {
    endpoints::TTS_DEFAULT.to_string()
}
fn default_tts_timeout_ms() -> u64 {
    timeouts::TTS_TIMEOUT_MS
}
fn default_voice_sample_path() -> String {
    "samples/agent_voice.wav".to_string()
}

impl Default for ModelEndpoints {
    fn default() -> Self {
        Self {
            llm_endpoint: default_llm_endpoint(),
            llm_model: default_llm_model(),
            llm_timeout_ms: default_llm_timeout_ms(),
            asr_endpoint: default_asr_endpoint(),
            asr_timeout_ms: default_asr_timeout_ms(),
            tts_endpoint: default_tts_endpoint(),
            tts_timeout_ms: default_tts_timeout_ms(),
            denoiser_endpoint: None,
            voice_sample_path: default_voice_sample_path(),
        }
    }
}

/// Inference concurrency limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Maximum concurrent collaborator calls across all sessions
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

fn default_max_concurrent() -> usize {
    4
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,

    /// Enable metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (VOICE_ASSIST_ prefix)
/// 2. config/{env}.yaml (if env specified)
/// 3. config/default.yaml
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    // Load default config
    builder = builder.add_source(File::with_name("config/default").required(false));

    // Load environment-specific config
    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    // Load from environment variables
    builder = builder.add_source(
        Environment::with_prefix("VOICE_ASSIST")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    // Validate
    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.server.ws_path, "/ws/client");
        assert_eq!(settings.session.silence_grace_ms, 300);
        assert_eq!(settings.session.min_silent_chunks, 2);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_session_validation() {
        let mut settings = Settings::default();

        settings.session.overlap_threshold = 1.5;
        assert!(settings.validate().is_err());
        settings.session.overlap_threshold = 0.7;

        settings.session.min_silent_chunks = 0;
        assert!(settings.validate().is_err());
        settings.session.min_silent_chunks = 2;

        settings.session.supported_languages.clear();
        assert!(settings.validate().is_err());
        settings.session.supported_languages = vec!["en".into()];

        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_server_validation() {
        let mut settings = Settings::default();

        settings.server.port = 0;
        assert!(settings.validate().is_err());
        settings.server.port = 8080;

        settings.server.max_connections = 0;
        assert!(settings.validate().is_err());
        settings.server.max_connections = 100;

        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_inference_validation() {
        let mut settings = Settings::default();
        settings.inference.max_concurrent = 0;
        assert!(settings.validate().is_err());
    }
}
