//! HTTP retrieval backends.
//!
//! - [`HttpRagBackend`]: a RAG server exposing a `/generate` endpoint
//! - [`TavilySearch`]: the Tavily web search API
//! - [`EciSearch`]: an enterprise content search service

pub mod eci;
pub mod rag;
pub mod tavily;

pub use eci::EciSearch;
pub use rag::HttpRagBackend;
pub use tavily::TavilySearch;

use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::error::{IntegrationError, Result};

/// A reqwest client bound to one timeout.
#[derive(Debug, Clone)]
pub(crate) struct JsonClient {
    client: reqwest::Client,
    timeout_seconds: u64,
}

impl JsonClient {
    pub(crate) fn new(timeout_seconds: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| {
                IntegrationError::configuration(format!("Failed to build HTTP client: {e}"))
            })?;
        Ok(Self {
            client,
            timeout_seconds,
        })
    }

    /// POST `body` as JSON and return the successful response.
    pub(crate) async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        bearer: Option<&str>,
        body: &B,
    ) -> Result<reqwest::Response> {
        let mut request = self
            .client
            .post(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        debug!("POST {url}");
        let response = request.send().await.map_err(|e| self.map_error(e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        Err(IntegrationError::http(
            Some(status.as_u16()),
            format!("{url} returned {status}: {text}"),
        ))
    }

    pub(crate) fn map_error(&self, error: reqwest::Error) -> IntegrationError {
        if error.is_timeout() {
            IntegrationError::Timeout {
                seconds: self.timeout_seconds,
            }
        } else {
            error.into()
        }
    }
}
