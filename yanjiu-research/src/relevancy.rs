//! LLM judgment of whether a retrieved answer addresses a query.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use yanjiu_core::{ChatMessage, ChatModel, ProgressKey, ProgressSink};

use crate::json::Parsed;
use crate::prompts::{PromptTemplates, render};
use crate::sources::{escape_html, escape_markdown};

/// Binary relevance score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Relevance {
    /// The answer addresses the query.
    #[serde(alias = "Yes", alias = "YES")]
    Yes,
    /// The answer does not address the query.
    #[serde(alias = "No", alias = "NO")]
    No,
}

/// The gate's verdict, shaped like the JSON the model is asked for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelevancyVerdict {
    /// Relevance score.
    pub score: Relevance,
}

impl RelevancyVerdict {
    /// A "yes" verdict.
    pub const YES: Self = Self {
        score: Relevance::Yes,
    };

    /// A "no" verdict.
    pub const NO: Self = Self {
        score: Relevance::No,
    };

    /// Whether the answer was judged relevant.
    pub fn is_relevant(self) -> bool {
        self.score == Relevance::Yes
    }
}

impl Default for RelevancyVerdict {
    fn default() -> Self {
        Self::YES
    }
}

/// Asks the model whether an answer is relevant to a query.
///
/// The gate fails open: a timeout, a provider error or an unparseable reply
/// all count as relevant, so a flaky model never starves the report of
/// sources.
#[derive(Debug, Clone)]
pub struct RelevancyGate {
    model: Arc<dyn ChatModel>,
    prompts: Arc<PromptTemplates>,
    progress: Arc<dyn ProgressSink>,
    timeout: Duration,
}

impl RelevancyGate {
    /// Create a new gate.
    pub fn new(
        model: Arc<dyn ChatModel>,
        prompts: Arc<PromptTemplates>,
        progress: Arc<dyn ProgressSink>,
        timeout: Duration,
    ) -> Self {
        Self {
            model,
            prompts,
            progress,
            timeout,
        }
    }

    /// Judge `answer` against `query`.
    #[instrument(skip(self, answer), fields(answer_len = answer.len()))]
    pub async fn check_relevancy(&self, query: &str, answer: &str) -> RelevancyVerdict {
        self.progress
            .emit(ProgressKey::RelevancyChecker, "\n Starting relevancy check \n");
        let shown = escape_html(&escape_markdown(answer));

        let prompt = render(
            &self.prompts.relevancy_checker,
            &[("document", answer), ("query", query)],
        );
        let messages = [ChatMessage::user(prompt)];

        match tokio::time::timeout(self.timeout, self.model.invoke(&messages)).await {
            Ok(Ok(response)) => {
                let verdict =
                    Parsed::<RelevancyVerdict>::from_llm_output(&response).unwrap_or_default();
                let label = if verdict.is_relevant() { "yes" } else { "no" };
                self.progress.emit(
                    ProgressKey::RelevancyChecker,
                    &format!(" =\n    ---\n    Relevancy score: {label}  \n    Query: {query}\n    Answer: {shown}\n    "),
                );
                debug!(relevant = verdict.is_relevant(), "Relevancy judged");
                verdict
            }
            Ok(Err(e)) => {
                debug!("Error checking relevancy: {e}");
                self.progress.emit(
                    ProgressKey::RelevancyChecker,
                    &format!("\n---------\nError checking relevancy. Query: {query} \n \n Answer: {shown} \n---------\n"),
                );
                RelevancyVerdict::YES
            }
            Err(_) => {
                self.progress.emit(
                    ProgressKey::RelevancyChecker,
                    &format!(" \n----------                \nLLM time out evaluating relevancy. Query: {query} \n \n Answer: {shown} \n----------\n"),
                );
                RelevancyVerdict::YES
            }
        }
    }
}
