//! Tavily web search.

use async_trait::async_trait;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use url::Url;

use yanjiu_core::{Result as CoreResult, TavilyConfig, WebSearchBackend, WebSearchHit};

use super::JsonClient;
use crate::error::{IntegrationError, Result};

/// Include-domain lists are sent at most this many at a time.
pub const DOMAIN_CHUNK_SIZE: usize = 5;

/// Rounds run without include-domains; each round excludes hosts already seen.
pub const EXPLORATION_ROUNDS: usize = 2;

#[derive(Debug, Clone, Serialize, PartialEq)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
    search_depth: &'a str,
    include_answer: bool,
    include_raw_content: bool,
    include_images: bool,
    #[serde(skip_serializing_if = "no_domains")]
    include_domains: &'a [String],
    #[serde(skip_serializing_if = "no_domains")]
    exclude_domains: &'a [String],
}

fn no_domains(domains: &&[String]) -> bool {
    domains.is_empty()
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    score: f64,
}

/// [`WebSearchBackend`] backed by the Tavily search API.
#[derive(Debug, Clone)]
pub struct TavilySearch {
    config: TavilyConfig,
    client: JsonClient,
}

impl TavilySearch {
    /// Create a search client from its configuration.
    pub fn new(config: TavilyConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| IntegrationError::configuration(e.to_string()))?;
        let client = JsonClient::new(config.effective_timeout())?;
        Ok(Self { config, client })
    }

    fn request<'a>(
        &'a self,
        query: &'a str,
        include_domains: &'a [String],
        exclude_domains: &'a [String],
    ) -> SearchRequest<'a> {
        SearchRequest {
            api_key: &self.config.api_key,
            query,
            max_results: self.config.max_results,
            search_depth: &self.config.search_depth,
            include_answer: true,
            include_raw_content: false,
            include_images: false,
            include_domains,
            exclude_domains,
        }
    }

    async fn search(&self, request: &SearchRequest<'_>) -> Result<Vec<WebSearchHit>> {
        let response: SearchResponse = self
            .client
            .post(&self.config.endpoint, None, request)
            .await?
            .json()
            .await
            .map_err(|e| self.client.map_error(e))?;
        Ok(response
            .results
            .into_iter()
            .map(|r| WebSearchHit {
                content: r.content,
                url: r.url,
                score: r.score,
            })
            .collect())
    }

    /// One request per chunk of include-domains. Failed chunks are skipped.
    async fn search_included(&self, query: &str) -> Vec<WebSearchHit> {
        let mut hits = Vec::new();
        for chunk in self.config.include_domains.chunks(DOMAIN_CHUNK_SIZE) {
            match self.search(&self.request(query, chunk, &[])).await {
                Ok(found) => hits.extend(found),
                Err(e) => warn!(domains = ?chunk, "Tavily request failed: {e}"),
            }
        }
        hits
    }

    /// Repeated rounds, each excluding the domains earlier rounds returned.
    async fn search_exploring(&self, query: &str) -> Vec<WebSearchHit> {
        let mut hits = Vec::new();
        let mut seen_domains: Vec<String> = Vec::new();
        for round in 1..=EXPLORATION_ROUNDS {
            let result = self.search(&self.request(query, &[], &seen_domains)).await;
            match result {
                Ok(found) => {
                    seen_domains.extend(found.iter().filter_map(|hit| domain_of(&hit.url)));
                    seen_domains = seen_domains.into_iter().unique().collect();
                    hits.extend(found);
                }
                Err(e) => warn!(round, "Tavily request failed: {e}"),
            }
        }
        hits
    }
}

#[async_trait]
impl WebSearchBackend for TavilySearch {
    #[instrument(skip(self), fields(domains = self.config.include_domains.len()))]
    async fn query(&self, text: &str) -> CoreResult<Vec<WebSearchHit>> {
        let hits = if self.config.include_domains.is_empty() {
            self.search_exploring(text).await
        } else {
            self.search_included(text).await
        };
        info!(hits = hits.len(), "Tavily search finished");
        Ok(hits)
    }

    fn name(&self) -> &'static str {
        "TavilySearch"
    }
}

/// Host of `url` without a leading `www.`.
pub fn domain_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("https://www.example.com/a/b", Some("example.com") ; "strips www")]
    #[test_case(" https://news.example.org/x ", Some("news.example.org") ; "trims")]
    #[test_case("not a url", None ; "invalid")]
    fn test_domain_of(url: &str, expected: Option<&str>) {
        assert_eq!(domain_of(url).as_deref(), expected);
    }

    #[test]
    fn test_request_body() {
        let search = TavilySearch::new(TavilyConfig::new("tvly-key")).unwrap();
        let excluded = vec!["example.com".to_string()];
        let body = serde_json::to_value(search.request("gpu prices", &[], &excluded)).unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "api_key": "tvly-key",
                "query": "gpu prices",
                "max_results": 2,
                "search_depth": "advanced",
                "include_answer": true,
                "include_raw_content": false,
                "include_images": false,
                "exclude_domains": ["example.com"],
            })
        );
    }

    #[test]
    fn test_include_domains_request() {
        let domains: Vec<String> = (0..7).map(|i| format!("site{i}.com")).collect();
        let search =
            TavilySearch::new(TavilyConfig::new("tvly-key").with_include_domains(domains.clone()))
                .unwrap();
        let bodies: Vec<serde_json::Value> = domains
            .chunks(DOMAIN_CHUNK_SIZE)
            .map(|chunk| serde_json::to_value(search.request("q", chunk, &[])).unwrap())
            .collect();

        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[0]["include_domains"].as_array().unwrap().len(), 5);
        assert_eq!(bodies[1]["include_domains"], serde_json::json!(["site5.com", "site6.com"]));
        assert!(bodies[1].get("exclude_domains").is_none());
    }

    #[test]
    fn test_parse_response() {
        let response: SearchResponse = serde_json::from_str(
            r#"{"answer": "x", "results": [{"url": "https://a.com", "content": "A", "score": 0.9}]}"#,
        )
        .unwrap();
        assert_eq!(response.results.len(), 1);
        assert!((response.results[0].score - 0.9).abs() < f64::EPSILON);
    }
}
