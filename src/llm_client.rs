// ============================================================================
// File: src/llm_client.rs
// Completion API client with a bounded retry loop
// ============================================================================

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::{ChatRequest, ChatResponse, Message};

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("network error: {0}")]
    Network(String),

    #[error("API error: HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("response contained no text")]
    EmptyResponse,
}

/// Result of one logical completion call, after retries
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    Text(String),
    Failed { attempts: usize, reason: String },
}

/// A single "send messages, get text back" exchange with a model.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn send(&self, messages: &[Message]) -> Result<String, CompletionError>;
}

/// Backend for any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiCompatBackend {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: usize,
}

impl OpenAiCompatBackend {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompatBackend {
    async fn send(&self, messages: &[Message]) -> Result<String, CompletionError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
        };

        debug!(model = %self.model, max_tokens = self.max_tokens, "Calling model");

        let response = self.client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(CompletionError::Api {
                status: status.as_u16(),
                body: response_text,
            });
        }

        let response_data: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| CompletionError::Parse(e.to_string()))?;

        response_data.first_text().ok_or(CompletionError::EmptyResponse)
    }
}

/// Wraps a backend with a fixed number of attempts. Failures never escape
/// as errors; callers only ever see a [`CompletionOutcome`].
pub struct CompletionClient {
    backend: Box<dyn CompletionBackend>,
    max_retries: usize,
}

impl CompletionClient {
    pub fn new(backend: Box<dyn CompletionBackend>, max_retries: usize) -> Self {
        Self {
            backend,
            max_retries: max_retries.max(1),
        }
    }

    pub async fn complete(&self, messages: &[Message]) -> CompletionOutcome {
        let mut last_error = String::new();

        for attempt in 1..=self.max_retries {
            match self.backend.send(messages).await {
                Ok(text) => return CompletionOutcome::Text(text),
                Err(e) => {
                    warn!(
                        attempt,
                        max_retries = self.max_retries,
                        error = %e,
                        "Completion attempt failed"
                    );
                    last_error = e.to_string();
                }
            }
        }

        CompletionOutcome::Failed {
            attempts: self.max_retries,
            reason: last_error,
        }
    }
}
