//! Multi-source retrieval with relevancy-gated fallback.
//!
//! Each query tries the RAG collection first, then enterprise search, then
//! the web. The first answer the [`RelevancyGate`] accepts wins; web results
//! are used without a judgment since there is nothing left to fall back to.

use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use strum::Display;
use tracing::{info, instrument, warn};

use yanjiu_core::{
    EnterpriseSearchBackend, GeneratedQuery, ProgressKey, ProgressSink, RagBackend, Result,
    WebSearchBackend,
};

use crate::relevancy::RelevancyGate;
use crate::sources::format_citation;

const NO_WEB_RESULT: &str = "No relevant result found in web search";

/// Which backend produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SourceKind {
    /// The RAG collection.
    Rag,
    /// Enterprise content search.
    Enterprise,
    /// Web search.
    Web,
}

/// Answer and citation for one query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrievalOutcome {
    /// Answer text, empty when no source produced one.
    pub answer: String,
    /// Raw citation text, empty when there is nothing to cite.
    pub citation: String,
    /// Backend the answer came from.
    pub source: Option<SourceKind>,
}

impl SourceKind {
    fn progress_key(self) -> ProgressKey {
        match self {
            Self::Rag => ProgressKey::RagAnswer,
            Self::Enterprise => ProgressKey::EciAnswer,
            Self::Web => ProgressKey::WebAnswer,
        }
    }
}

impl RetrievalOutcome {
    fn from_source(source: SourceKind, answer: String, citation: String) -> Self {
        Self {
            answer,
            citation,
            source: Some(source),
        }
    }
}

/// Runs queries against the configured backends.
#[derive(Debug, Clone)]
pub struct MultiSourceRetriever {
    rag: Arc<dyn RagBackend>,
    enterprise: Option<Arc<dyn EnterpriseSearchBackend>>,
    web: Option<Arc<dyn WebSearchBackend>>,
    gate: RelevancyGate,
    progress: Arc<dyn ProgressSink>,
    backend_timeout: Duration,
    web_score_threshold: f64,
}

impl MultiSourceRetriever {
    /// Create a retriever over a RAG backend.
    pub fn new(
        rag: Arc<dyn RagBackend>,
        gate: RelevancyGate,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            rag,
            enterprise: None,
            web: None,
            gate,
            progress,
            backend_timeout: Duration::from_secs(90),
            web_score_threshold: 0.6,
        }
    }

    /// Add an enterprise search backend.
    #[must_use]
    pub fn with_enterprise(mut self, backend: Option<Arc<dyn EnterpriseSearchBackend>>) -> Self {
        self.enterprise = backend;
        self
    }

    /// Add a web search backend.
    #[must_use]
    pub fn with_web(mut self, backend: Option<Arc<dyn WebSearchBackend>>) -> Self {
        self.web = backend;
        self
    }

    /// Set the per-call backend timeout.
    #[must_use]
    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = timeout;
        self
    }

    /// Set the minimum score a web hit must exceed.
    #[must_use]
    pub fn with_web_score_threshold(mut self, threshold: f64) -> Self {
        self.web_score_threshold = threshold;
        self
    }

    /// Whether an enterprise search backend is configured.
    pub fn has_enterprise(&self) -> bool {
        self.enterprise.is_some()
    }

    /// Whether a web search backend is configured.
    pub fn has_web(&self) -> bool {
        self.web.is_some()
    }

    /// Retrieve an answer for one query.
    ///
    /// Backends are tried strictly in order: RAG, enterprise search (if
    /// `search_eci`), web search (if `search_web`). A backend failure or an
    /// empty answer moves on to the next stage without asking the gate.
    #[instrument(skip(self), fields(rag = %self.rag.name()))]
    pub async fn process_single_query(
        &self,
        query: &str,
        collection: &str,
        search_web: bool,
        search_eci: bool,
    ) -> RetrievalOutcome {
        self.progress
            .emit(ProgressKey::RagAnswer, "\n Performing RAG search \n");
        let rag = self
            .bounded(SourceKind::Rag, self.rag.query(query, collection))
            .await
            .map(|hit| (hit.answer, hit.citation));
        if let Some((answer, citation)) = rag {
            self.progress.emit(ProgressKey::RagAnswer, &citation);
            info!("RAG answer: {citation}");
            if self.accepts(query, &answer).await {
                return RetrievalOutcome::from_source(SourceKind::Rag, answer, citation);
            }
        }
        info!("RAG not relevant, falling back");

        if search_eci {
            if let Some(enterprise) = &self.enterprise {
                let (answer, citation) = self.search_enterprise(enterprise.as_ref(), query).await;
                self.progress.emit(ProgressKey::EciAnswer, &citation);
                if self.accepts(query, &answer).await {
                    return RetrievalOutcome::from_source(SourceKind::Enterprise, answer, citation);
                }
                info!("Enterprise search not relevant, falling back");
            } else {
                warn!("Enterprise search requested but no backend is configured");
            }
        }

        if search_web {
            if let Some(web) = &self.web {
                let (answer, citation) = self.search_web(web.as_ref(), query).await;
                return RetrievalOutcome::from_source(SourceKind::Web, answer, citation);
            }
            warn!("Web search requested but no backend is configured");
        }

        RetrievalOutcome::default()
    }

    /// Retrieve answers for many queries concurrently.
    ///
    /// Outcomes are returned in query order once every query has finished.
    pub async fn process_queries(
        &self,
        queries: &[GeneratedQuery],
        collection: &str,
        search_web: bool,
        search_eci: bool,
    ) -> Vec<RetrievalOutcome> {
        join_all(queries.iter().map(|query| {
            self.process_single_query(query.query(), collection, search_web, search_eci)
        }))
        .await
    }

    async fn accepts(&self, query: &str, answer: &str) -> bool {
        !answer.trim().is_empty() && self.gate.check_relevancy(query, answer).await.is_relevant()
    }

    async fn bounded<T>(
        &self,
        kind: SourceKind,
        call: impl Future<Output = Result<T>>,
    ) -> Option<T> {
        match tokio::time::timeout(self.backend_timeout, call).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                warn!(backend = %kind, "Backend query failed: {e}");
                self.progress
                    .emit(kind.progress_key(), &format!("\n Error querying {kind}: {e} \n"));
                None
            }
            Err(_) => {
                warn!(backend = %kind, "Backend query timed out after {:?}", self.backend_timeout);
                self.progress
                    .emit(kind.progress_key(), &format!("\n Timeout querying {kind} \n"));
                None
            }
        }
    }

    async fn search_enterprise(
        &self,
        backend: &dyn EnterpriseSearchBackend,
        query: &str,
    ) -> (String, String) {
        let Some(hits) = self.bounded(SourceKind::Enterprise, backend.query(query)).await else {
            return (String::new(), String::new());
        };

        let mut answers = Vec::with_capacity(hits.len());
        let mut citations = Vec::with_capacity(hits.len());
        for hit in hits {
            let answer = format!("{}\n{}", hit.title, hit.snippet_text);
            citations.push(format_citation(query, &answer, &hit.url));
            answers.push(answer);
        }
        (answers.join("\n"), citations.join("\n"))
    }

    async fn search_web(&self, backend: &dyn WebSearchBackend, query: &str) -> (String, String) {
        self.progress
            .emit(ProgressKey::WebAnswer, "\n Performing web search \n");
        let Some(hits) = self.bounded(SourceKind::Web, backend.query(query)).await else {
            return (String::new(), String::new());
        };

        let kept: Vec<_> = hits
            .into_iter()
            .filter(|hit| hit.score > self.web_score_threshold)
            .collect();
        if kept.is_empty() {
            self.progress.emit(
                ProgressKey::WebAnswer,
                &format!("--- \n {NO_WEB_RESULT} \n"),
            );
            return (NO_WEB_RESULT.to_string(), String::new());
        }

        let answer = kept
            .iter()
            .map(|hit| hit.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let citation = kept
            .iter()
            .map(|hit| format_citation(query, &hit.content, hit.url.trim()))
            .collect::<Vec<_>>()
            .join("\n");
        self.progress.emit(ProgressKey::WebAnswer, &citation);
        (answer, citation)
    }
}
