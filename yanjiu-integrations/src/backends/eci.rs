//! Enterprise content search.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use yanjiu_core::{EciConfig, EnterpriseHit, EnterpriseSearchBackend, Result as CoreResult};

use super::JsonClient;
use crate::error::{IntegrationError, Result};

const BACKEND: &str = "eci";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    query: &'a str,
    page_size: usize,
    max_snippet_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_options: Option<RequestOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cursor: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestOptions {
    datasources_filter: Vec<String>,
}

/// One page of search results.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct SearchPage {
    /// Hits on this page.
    #[serde(default)]
    pub results: Vec<SearchResult>,
    /// Cursor for the next page, if there is one.
    #[serde(default)]
    pub cursor: Option<String>,
}

/// A search result as returned by the service.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct SearchResult {
    /// Document title.
    #[serde(default)]
    pub title: String,
    /// Document URL.
    #[serde(default)]
    pub url: String,
    /// Matching passages.
    #[serde(default)]
    pub snippets: Vec<Snippet>,
}

/// A matching passage.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Snippet {
    /// Passage text.
    #[serde(default)]
    pub text: Option<String>,
}

impl From<SearchResult> for EnterpriseHit {
    fn from(result: SearchResult) -> Self {
        let snippet_text = result
            .snippets
            .iter()
            .filter_map(|snippet| snippet.text.as_deref())
            .filter(|text| !text.is_empty())
            .fold(String::new(), |mut acc, text| {
                acc.push('\n');
                acc.push_str(text);
                acc
            });
        Self {
            title: result.title,
            snippet_text,
            url: result.url,
        }
    }
}

/// [`EnterpriseSearchBackend`] over the content search HTTP API.
#[derive(Debug, Clone)]
pub struct EciSearch {
    config: EciConfig,
    client: JsonClient,
}

impl EciSearch {
    /// Create a search client from its configuration.
    pub fn new(config: EciConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| IntegrationError::configuration(e.to_string()))?;
        let client = JsonClient::new(config.effective_timeout())?;
        Ok(Self { config, client })
    }

    fn request<'a>(&self, query: &'a str, cursor: Option<&'a str>) -> SearchRequest<'a> {
        SearchRequest {
            query,
            page_size: self.config.page_size,
            max_snippet_size: self.config.max_snippet_size,
            request_options: self.config.data_sources.as_ref().map(|sources| RequestOptions {
                datasources_filter: sources.iter().map(|s| s.to_uppercase()).collect(),
            }),
            cursor,
        }
    }

    /// Fetch one page of results, starting at `cursor` when given.
    pub async fn search_page(&self, query: &str, cursor: Option<&str>) -> Result<SearchPage> {
        let page: SearchPage = self
            .client
            .post(
                &self.config.endpoint,
                Some(&self.config.token),
                &self.request(query, cursor),
            )
            .await?
            .json()
            .await
            .map_err(|e| self.client.map_error(e))?;
        debug!(results = page.results.len(), "Enterprise search page received");
        Ok(page)
    }
}

#[async_trait]
impl EnterpriseSearchBackend for EciSearch {
    #[instrument(skip(self))]
    async fn query(&self, text: &str) -> CoreResult<Vec<EnterpriseHit>> {
        let page = self
            .search_page(text, None)
            .await
            .map_err(|e| e.into_retrieval(BACKEND))?;
        Ok(page.results.into_iter().map(EnterpriseHit::from).collect())
    }

    fn name(&self) -> &'static str {
        "EciSearch"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn search(config: EciConfig) -> EciSearch {
        EciSearch::new(config).unwrap()
    }

    #[test]
    fn test_request_body() {
        let eci = search(
            EciConfig::new("https://search.example/v1/content/search", "token")
                .with_data_sources(vec!["confluence".into(), "Sharepoint".into()]),
        );
        let body = serde_json::to_value(eci.request("gpu roadmap", None)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "query": "gpu roadmap",
                "pageSize": 10,
                "maxSnippetSize": 1000,
                "requestOptions": {"datasourcesFilter": ["CONFLUENCE", "SHAREPOINT"]},
            })
        );

        let eci = search(EciConfig::new("https://search.example/v1/content/search", "token"));
        let body = serde_json::to_value(eci.request("gpu roadmap", Some("abc"))).unwrap();
        assert_eq!(body["cursor"], "abc");
        assert!(body.get("requestOptions").is_none());
    }

    #[test]
    fn test_hits_from_response() {
        let page: SearchPage = serde_json::from_str(
            r#"{
                "results": [
                    {
                        "title": "Roadmap",
                        "url": "https://intranet.example/roadmap",
                        "snippets": [{"text": "Q1 launch"}, {"text": ""}, {}, {"text": "Q3 refresh"}]
                    },
                    {"title": "Empty", "url": "https://intranet.example/empty"}
                ],
                "cursor": "next"
            }"#,
        )
        .unwrap();
        assert_eq!(page.cursor.as_deref(), Some("next"));

        let hits: Vec<EnterpriseHit> = page.results.into_iter().map(EnterpriseHit::from).collect();
        assert_eq!(hits[0].snippet_text, "\nQ1 launch\nQ3 refresh");
        assert_eq!(hits[0].title, "Roadmap");
        assert_eq!(hits[1].snippet_text, "");
    }

    #[test]
    fn test_rejects_invalid_config() {
        assert!(EciSearch::new(EciConfig::new("https://search.example", "")).is_err());
    }
}
