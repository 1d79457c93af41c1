//! Configuration for the research LLM.
//!
//! The configuration is provider-agnostic; the siumai-backed adapter in
//! `yanjiu-integrations` turns it into a client.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{Result, YanjiuError};

/// Configuration for the chat model driving the pipeline.
///
/// # Examples
///
/// ```rust
/// use yanjiu_core::config::LlmConfig;
///
/// let config = LlmConfig::openai("gpt-4o", "your-api-key")
///     .with_temperature(0.5)
///     .with_max_tokens(4096);
///
/// let local = LlmConfig::local("nemotron-super", "http://localhost:8000/v1")
///     .with_streaming(false);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmConfig {
    /// Provider name ("openai", "anthropic", "ollama", "local").
    pub provider: String,

    /// Model name or identifier.
    pub model: String,

    /// API key for authentication (optional for local models).
    #[serde(default)]
    pub api_key: Option<String>,

    /// Custom base URL (optional).
    #[serde(default)]
    pub base_url: Option<String>,

    /// Temperature for generation (0.0 to 2.0).
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate.
    #[serde(default)]
    pub max_tokens: Option<usize>,

    /// Request timeout in seconds.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,

    /// Whether to stream responses.
    #[serde(default = "default_stream")]
    pub stream: bool,

    /// Additional provider-specific configuration.
    #[serde(default)]
    pub additional_config: HashMap<String, serde_json::Value>,
}

fn default_stream() -> bool {
    true
}

impl LlmConfig {
    /// Create a new LLM configuration.
    pub fn new<S1: Into<String>, S2: Into<String>>(provider: S1, model: S2) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            api_key: None,
            base_url: None,
            temperature: None,
            max_tokens: None,
            timeout_seconds: None,
            stream: true,
            additional_config: HashMap::new(),
        }
    }

    /// Set the API key.
    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the base URL.
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the maximum tokens.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = Some(timeout_seconds);
        self
    }

    /// Enable or disable streaming.
    #[must_use]
    pub fn with_streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Add additional configuration parameter.
    pub fn with_config<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        self.additional_config.insert(key.into(), value.into());
        self
    }

    /// Get the effective temperature (with default).
    #[must_use]
    pub fn effective_temperature(&self) -> f32 {
        self.temperature.unwrap_or(0.5)
    }

    /// Get the effective max tokens (with default).
    #[must_use]
    pub fn effective_max_tokens(&self) -> usize {
        self.max_tokens.unwrap_or(4096)
    }

    /// Get the effective timeout (with default).
    #[must_use]
    pub fn effective_timeout(&self) -> u64 {
        self.timeout_seconds.unwrap_or(120)
    }

    /// Check if this is a local model.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.provider == "local" || self.base_url.is_some()
    }

    /// Check if API key is required.
    #[must_use]
    pub fn requires_api_key(&self) -> bool {
        !self.is_local() && !matches!(self.provider.as_str(), "local" | "ollama")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.provider.is_empty() {
            return Err(YanjiuError::configuration("Provider cannot be empty"));
        }

        if self.model.is_empty() {
            return Err(YanjiuError::configuration("Model cannot be empty"));
        }

        if self.requires_api_key() && self.api_key.as_deref().is_none_or(str::is_empty) {
            return Err(YanjiuError::configuration(format!(
                "API key is required for provider: {}",
                self.provider
            )));
        }

        if let Some(temp) = self.temperature {
            if !(0.0..=2.0).contains(&temp) {
                return Err(YanjiuError::configuration(
                    "Temperature must be between 0.0 and 2.0",
                ));
            }
        }

        if self.max_tokens == Some(0) {
            return Err(YanjiuError::configuration(
                "Max tokens must be greater than 0",
            ));
        }

        if self.timeout_seconds == Some(0) {
            return Err(YanjiuError::configuration("Timeout must be greater than 0"));
        }

        if let Some(url) = &self.base_url {
            super::validate_http_url("LLM base URL", url)?;
        }

        Ok(())
    }

    /// Create a configuration for `OpenAI` models.
    pub fn openai<S: Into<String>>(model: S, api_key: S) -> Self {
        Self::new("openai", model).with_api_key(api_key)
    }

    /// Create a configuration for Anthropic models.
    pub fn anthropic<S: Into<String>>(model: S, api_key: S) -> Self {
        Self::new("anthropic", model).with_api_key(api_key)
    }

    /// Create a configuration for an OpenAI-compatible local endpoint.
    pub fn local<S: Into<String>>(model: S, base_url: S) -> Self {
        Self::new("local", model).with_base_url(base_url)
    }

    /// Create a configuration for Ollama models.
    pub fn ollama<S: Into<String>>(model: S) -> Self {
        Self::new("ollama", model).with_base_url("http://localhost:11434")
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::new("openai", "gpt-4o-mini")
    }
}
