//! Configuration for the retrieval backends.

use serde::{Deserialize, Serialize};

use crate::{Result, YanjiuError};

/// RAG service configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RagConfig {
    /// Base URL of the RAG server; requests go to `{base_url}/generate`.
    pub base_url: String,

    /// Bearer token sent with each request.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl RagConfig {
    /// Create a new RAG configuration.
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            timeout_seconds: None,
        }
    }

    /// Set the API key.
    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Get the effective timeout (with default).
    #[must_use]
    pub fn effective_timeout(&self) -> u64 {
        self.timeout_seconds.unwrap_or(90)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        super::validate_http_url("RAG base URL", &self.base_url)?;
        if self.timeout_seconds == Some(0) {
            return Err(YanjiuError::configuration(
                "RAG timeout must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Tavily web search configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TavilyConfig {
    /// Tavily API key.
    pub api_key: String,

    /// Restrict searches to these domains. Searched in chunks of five.
    #[serde(default)]
    pub include_domains: Vec<String>,

    /// Results per request.
    #[serde(default = "default_tavily_max_results")]
    pub max_results: usize,

    /// Search depth ("basic" or "advanced").
    #[serde(default = "default_search_depth")]
    pub search_depth: String,

    /// API endpoint.
    #[serde(default = "default_tavily_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

fn default_tavily_max_results() -> usize {
    2
}

fn default_search_depth() -> String {
    "advanced".to_string()
}

fn default_tavily_endpoint() -> String {
    "https://api.tavily.com/search".to_string()
}

impl TavilyConfig {
    /// Create a new Tavily configuration.
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            api_key: api_key.into(),
            include_domains: Vec::new(),
            max_results: default_tavily_max_results(),
            search_depth: default_search_depth(),
            endpoint: default_tavily_endpoint(),
            timeout_seconds: None,
        }
    }

    /// Restrict searches to the given domains.
    #[must_use]
    pub fn with_include_domains(mut self, domains: Vec<String>) -> Self {
        self.include_domains = domains;
        self
    }

    /// Override the endpoint.
    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Get the effective timeout (with default).
    #[must_use]
    pub fn effective_timeout(&self) -> u64 {
        self.timeout_seconds.unwrap_or(90)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(YanjiuError::configuration("Tavily API key cannot be empty"));
        }
        if self.max_results == 0 {
            return Err(YanjiuError::configuration(
                "Tavily max_results must be greater than 0",
            ));
        }
        super::validate_http_url("Tavily endpoint", &self.endpoint)
    }
}

/// Enterprise content search configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EciConfig {
    /// Full URL of the content search endpoint.
    pub endpoint: String,

    /// Bearer token sent with each request.
    pub token: String,

    /// Results per request.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Maximum snippet size in characters.
    #[serde(default = "default_max_snippet_size")]
    pub max_snippet_size: usize,

    /// Restrict results to these data sources.
    #[serde(default)]
    pub data_sources: Option<Vec<String>>,

    /// Request timeout in seconds.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

fn default_page_size() -> usize {
    10
}

fn default_max_snippet_size() -> usize {
    1000
}

impl EciConfig {
    /// Create a new enterprise search configuration.
    pub fn new<S1: Into<String>, S2: Into<String>>(endpoint: S1, token: S2) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: token.into(),
            page_size: default_page_size(),
            max_snippet_size: default_max_snippet_size(),
            data_sources: None,
            timeout_seconds: None,
        }
    }

    /// Restrict results to the given data sources.
    #[must_use]
    pub fn with_data_sources(mut self, data_sources: Vec<String>) -> Self {
        self.data_sources = Some(data_sources);
        self
    }

    /// Get the effective timeout (with default).
    #[must_use]
    pub fn effective_timeout(&self) -> u64 {
        self.timeout_seconds.unwrap_or(90)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.token.is_empty() {
            return Err(YanjiuError::configuration(
                "Enterprise search token cannot be empty",
            ));
        }
        super::validate_http_url("Enterprise search endpoint", &self.endpoint)
    }
}
