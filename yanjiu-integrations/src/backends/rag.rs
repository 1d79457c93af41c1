//! RAG server backend.
//!
//! The server answers `POST {base_url}/generate` with server-sent events;
//! every `data: ` line carries a chat completion chunk and, optionally,
//! the documents cited so far.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};
use url::Url;

use yanjiu_core::{RagAnswer, RagBackend, RagConfig, Result as CoreResult};
use yanjiu_research::sources::format_citation;

use super::JsonClient;
use crate::error::{IntegrationError, Result};

const BACKEND: &str = "rag";

/// [`RagBackend`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRagBackend {
    endpoint: Url,
    api_key: Option<String>,
    client: JsonClient,
}

impl HttpRagBackend {
    /// Create a backend from its configuration.
    ///
    /// `generate` is resolved against `base_url` the way a browser resolves
    /// a relative link, so `http://host/v1/` yields `http://host/v1/generate`.
    pub fn new(config: &RagConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.base_url)
            .and_then(|base| base.join("generate"))
            .map_err(|e| IntegrationError::configuration(format!("Invalid RAG base URL: {e}")))?;
        Ok(Self {
            endpoint,
            api_key: config.api_key.clone(),
            client: JsonClient::new(config.effective_timeout())?,
        })
    }

    /// The resolved generate endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn generate(&self, text: &str, collection: &str) -> Result<RagAnswer> {
        let body = json!({
            "messages": [{"role": "user", "content": text}],
            "use_knowledge_base": true,
            "enable_citations": true,
            "collection_name": collection,
        });
        let response = self
            .client
            .post(self.endpoint.as_str(), self.api_key.as_deref(), &body)
            .await?;
        let raw = response.text().await.map_err(|e| self.client.map_error(e))?;

        let (answer, documents) = parse_event_stream(&raw)?;
        debug!(len = answer.len(), "RAG answer received");
        let citation = format_citation(text, &answer, &documents);
        Ok(RagAnswer { answer, citation })
    }
}

#[async_trait]
impl RagBackend for HttpRagBackend {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn query(&self, text: &str, collection: &str) -> CoreResult<RagAnswer> {
        self.generate(text, collection)
            .await
            .map_err(|e| e.into_retrieval(BACKEND))
    }

    fn name(&self) -> &'static str {
        "HttpRagBackend"
    }
}

#[derive(Debug, Deserialize)]
struct GenerateEvent {
    choices: Vec<Choice>,
    #[serde(default)]
    citations: Option<Citations>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct Citations {
    #[serde(default)]
    results: Vec<CitedDocument>,
}

#[derive(Debug, Deserialize)]
struct CitedDocument {
    #[serde(default)]
    document_name: String,
    #[serde(default)]
    document_type: String,
}

/// Concatenate answer content and cited text documents from an event stream.
///
/// Non-text documents keep their slot as an empty name so the comma-joined
/// list mirrors the server's citation order.
pub fn parse_event_stream(raw: &str) -> Result<(String, String)> {
    let mut answer = String::new();
    let mut documents = String::new();

    for data in raw.lines().filter_map(|line| line.strip_prefix("data: ")) {
        let event: GenerateEvent = serde_json::from_str(data)?;
        let choice = event
            .choices
            .first()
            .ok_or_else(|| IntegrationError::invalid_response("RAG event without choices"))?;
        answer.push_str(&choice.message.content);

        if let Some(citations) = event.citations {
            let names: Vec<&str> = citations
                .results
                .iter()
                .map(|doc| {
                    if doc.document_type == "text" {
                        doc.document_name.as_str()
                    } else {
                        ""
                    }
                })
                .collect();
            documents.push_str(&names.join(","));
        }
    }

    Ok((answer, documents))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_event_stream() {
        let raw = concat!(
            "data: {\"choices\":[{\"message\":{\"content\":\"GPUs \"}}]}\n",
            "\n",
            ": keep-alive\n",
            "data: {\"choices\":[{\"message\":{\"content\":\"are fast.\"}}],",
            "\"citations\":{\"results\":[",
            "{\"document_name\":\"a.pdf\",\"document_type\":\"text\"},",
            "{\"document_name\":\"chart.png\",\"document_type\":\"image\"},",
            "{\"document_name\":\"b.pdf\",\"document_type\":\"text\"}]}}\n",
        );

        let (answer, documents) = parse_event_stream(raw).unwrap();
        assert_eq!(answer, "GPUs are fast.");
        assert_eq!(documents, "a.pdf,,b.pdf");
    }

    #[test]
    fn test_parse_event_stream_rejects_garbage() {
        assert!(parse_event_stream("data: not json").is_err());
        assert!(parse_event_stream("data: {\"choices\":[]}").is_err());
        assert_eq!(parse_event_stream("").unwrap(), (String::new(), String::new()));
    }

    #[test]
    fn test_endpoint_resolution() {
        let backend = HttpRagBackend::new(&RagConfig::new("http://localhost:8081/v1/")).unwrap();
        assert_eq!(backend.endpoint().as_str(), "http://localhost:8081/v1/generate");

        let backend = HttpRagBackend::new(&RagConfig::new("http://localhost:8081/v1")).unwrap();
        assert_eq!(backend.endpoint().as_str(), "http://localhost:8081/generate");

        assert!(HttpRagBackend::new(&RagConfig::new("not a url")).is_err());
    }
}
