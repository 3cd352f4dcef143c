//! Ollama chat backend

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use voice_assist_core::{RenderOptions, Result as CoreResult, TextRenderer, Turn};

use crate::{ModelError, Result};

/// Ollama backend configuration
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Model name/ID
    pub model: String,
    /// API endpoint
    pub endpoint: String,
    /// Request timeout
    pub timeout: Duration,
    /// Maximum retry attempts for transient failures
    pub max_retries: u32,
    /// Initial backoff duration (doubles each retry)
    pub initial_backoff: Duration,
    /// Keep the model loaded between calls ("5m", "1h", "-1", "0")
    pub keep_alive: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            model: "qwen2.5:3b-instruct".to_string(),
            endpoint: "http://localhost:11434".to_string(),
            timeout: Duration::from_secs(60),
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            keep_alive: "5m".to_string(),
        }
    }
}

/// Non-streaming Ollama chat client
pub struct OllamaRenderer {
    config: RendererConfig,
    client: Client,
}

impl OllamaRenderer {
    pub fn new(config: RendererConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ModelError::Network(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    /// Check whether the backend answers at all
    pub async fn is_available(&self) -> bool {
        self.client
            .get(format!("{}/api/tags", self.config.endpoint.trim_end_matches('/')))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    async fn chat(&self, request: &OllamaChatRequest) -> Result<OllamaChatResponse> {
        let mut last_error = None;
        let mut backoff = self.config.initial_backoff;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tracing::warn!(
                    "LLM request failed, retrying in {:?} (attempt {}/{})",
                    backoff,
                    attempt,
                    self.config.max_retries
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }

            match self.execute_request(request).await {
                Ok(response) => return Ok(response),
                Err(e) if Self::is_retryable(&e) => {
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| ModelError::Network("Max retries exceeded".to_string())))
    }

    async fn execute_request(&self, request: &OllamaChatRequest) -> Result<OllamaChatResponse> {
        let response = self
            .client
            .post(self.api_url("/chat"))
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            // 5xx is retryable, 4xx is not
            if status.is_server_error() {
                return Err(ModelError::Network(format!("Server error {status}: {body}")));
            }
            return Err(ModelError::Api(body));
        }

        response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))
    }

    fn is_retryable(error: &ModelError) -> bool {
        matches!(error, ModelError::Network(_) | ModelError::Timeout)
    }
}

#[async_trait]
impl TextRenderer for OllamaRenderer {
    async fn render(&self, messages: &[Turn], options: &RenderOptions) -> CoreResult<String> {
        let request = OllamaChatRequest {
            model: self.config.model.clone(),
            messages: messages.iter().map(OllamaMessage::from).collect(),
            stream: false,
            options: Some(OllamaOptions {
                temperature: Some(options.temperature),
                num_predict: Some(options.max_tokens as i32),
            }),
            keep_alive: Some(self.config.keep_alive.clone()),
            think: Some(false),
        };

        let response = self
            .chat(&request)
            .await
            .map_err(|e| voice_assist_core::Error::Rendering(e.to_string()))?;

        Ok(response.message.content)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    think: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

impl From<&Turn> for OllamaMessage {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role.as_str().to_string(),
            content: turn.content.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
    #[serde(default)]
    #[allow(dead_code)]
    done: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = OllamaChatRequest {
            model: "test-model".to_string(),
            messages: vec![OllamaMessage {
                role: "system".to_string(),
                content: "hello".to_string(),
            }],
            stream: false,
            options: Some(OllamaOptions {
                temperature: Some(0.0),
                num_predict: Some(60),
            }),
            keep_alive: Some("5m".to_string()),
            think: Some(false),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "test-model");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 60);
        assert_eq!(json["messages"][0]["role"], "system");
    }

    #[test]
    fn test_response_deserialization() {
        let raw = r#"{"message":{"role":"assistant","content":"check_balance"},"done":true}"#;
        let response: OllamaChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.message.content, "check_balance");
    }

    #[test]
    fn test_turn_conversion() {
        let turn = Turn::user("what is my balance");
        let message = OllamaMessage::from(&turn);
        assert_eq!(message.role, "user");
        assert_eq!(message.content, "what is my balance");
    }

    #[test]
    fn test_api_url_handles_trailing_slash() {
        let mut config = RendererConfig::default();
        config.endpoint = "http://localhost:11434/".to_string();
        let renderer = OllamaRenderer::new(config).unwrap();
        assert_eq!(renderer.api_url("/chat"), "http://localhost:11434/api/chat");
    }
}
