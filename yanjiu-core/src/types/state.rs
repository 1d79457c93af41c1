//! Mutable report state threaded through the research pipeline.

use serde::{Deserialize, Serialize};

use super::GeneratedQuery;

/// State of one research run.
///
/// Created empty when a run starts. Each pipeline stage owns a subset of the
/// fields and only writes them once the stage has completed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ReportState {
    /// Planned queries.
    pub queries: Vec<GeneratedQuery>,

    /// Serialized source bundles, one per retrieval round. Append-only.
    pub web_research_results: Vec<String>,

    /// Accumulated raw citation text, newline-joined.
    pub citations: String,

    /// Current report draft.
    pub running_summary: String,

    /// Publish-ready report with its Sources section.
    pub final_report: String,

    /// Rendered Markdown for the accumulated citations.
    pub formatted_citations: String,
}

impl ReportState {
    /// Create an empty state for the given queries.
    pub fn with_queries(queries: Vec<GeneratedQuery>) -> Self {
        Self {
            queries,
            ..Self::default()
        }
    }

    /// Record one more retrieval round.
    pub fn push_research(&mut self, bundle_xml: String, citation: &str) {
        self.web_research_results.push(bundle_xml);
        self.citations = format!("{}\n{}", self.citations, citation);
    }

    /// The most recent source bundle, if any.
    pub fn latest_research(&self) -> Option<&str> {
        self.web_research_results.last().map(String::as_str)
    }
}
