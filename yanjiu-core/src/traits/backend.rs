//! Retrieval backends consulted by the multi-source retriever.
//!
//! Three kinds of providers are supported, tried in this order: a RAG
//! service over a private collection, an enterprise content search service
//! and a web search service. Each one is a plain async query interface; the
//! fallback logic, relevancy gating and citation formatting live in the
//! research crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Answer from a RAG backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RagAnswer {
    /// Generated answer text.
    pub answer: String,
    /// Raw citation text in the `QUERY:` / `ANSWER:` / `CITATION:` format.
    pub citation: String,
}

/// One web search result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebSearchHit {
    /// Extracted page content.
    pub content: String,
    /// Page URL.
    pub url: String,
    /// Provider relevance score.
    pub score: f64,
}

/// One enterprise search result.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnterpriseHit {
    /// Document title.
    pub title: String,
    /// Concatenated snippet text.
    pub snippet_text: String,
    /// Document URL.
    pub url: String,
}

/// Retrieval-augmented generation over a document collection.
#[async_trait]
pub trait RagBackend: Send + Sync + std::fmt::Debug {
    /// Answer `text` from `collection`.
    async fn query(&self, text: &str, collection: &str) -> Result<RagAnswer>;

    /// Get a human-readable name for this backend.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Check if the backend is reachable.
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Web search provider.
#[async_trait]
pub trait WebSearchBackend: Send + Sync + std::fmt::Debug {
    /// Search the web for `text`.
    async fn query(&self, text: &str) -> Result<Vec<WebSearchHit>>;

    /// Get a human-readable name for this backend.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Enterprise content search provider.
#[async_trait]
pub trait EnterpriseSearchBackend: Send + Sync + std::fmt::Debug {
    /// Search enterprise content for `text`.
    async fn query(&self, text: &str) -> Result<Vec<EnterpriseHit>>;

    /// Get a human-readable name for this backend.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
