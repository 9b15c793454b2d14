// ============================================================================
// File: src/config.rs
// Configuration structures and validation
// ============================================================================

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::history::FailurePolicy;
use crate::topic_gate::{TopicGate, DEFAULT_KEYWORDS};

/// Environment variable holding the completion API credential
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY is not set; export it or pass --api-key")]
    MissingApiKey,

    #[error("at least one topic keyword is required")]
    NoKeywords,

    #[error("max_retries must be at least 1")]
    InvalidMaxRetries,

    #[error("max_tokens must be at least 1")]
    InvalidMaxTokens,
}

/// Main configuration. Everything except the credential may come from an
/// optional JSON file; the credential only ever comes from the environment.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    #[serde(skip)]
    pub api_key: String,

    /// Base URL of an OpenAI-compatible chat completions API
    pub base_url: String,

    /// Model identifier sent with every request
    pub model: String,

    /// Output-length ceiling per completion
    pub max_tokens: usize,

    /// Attempts per completion call before giving up
    pub max_retries: usize,

    /// Keywords accepted by the topic gate
    pub keywords: Vec<String>,

    /// Whether transport failures are appended to the session history
    pub failure_policy: FailurePolicy,

    /// Where the references of a successful search are written, if anywhere
    pub readme_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 1024,
            max_retries: 3,
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            failure_policy: FailurePolicy::default(),
            readme_path: Some(PathBuf::from("README.md")),
        }
    }
}

impl Config {
    /// Load settings from a JSON file, or start from defaults when no file is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }

        if self.max_retries == 0 {
            return Err(ConfigError::InvalidMaxRetries);
        }

        if self.max_tokens == 0 {
            return Err(ConfigError::InvalidMaxTokens);
        }

        if self.topic_gate().keywords().is_empty() {
            return Err(ConfigError::NoKeywords);
        }

        Ok(())
    }

    pub fn topic_gate(&self) -> TopicGate {
        TopicGate::new(&self.keywords)
    }
}
