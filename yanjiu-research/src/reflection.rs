//! Reflection: find knowledge gaps in the draft and research them.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

use yanjiu_core::{
    ChatMessage, ChatModel, GeneratedQuery, ProgressKey, ProgressSink, ReportState,
    ResearchRequest,
};

use crate::json::parse_json_markdown;
use crate::llm::{Echo, stream_with_reasoning};
use crate::prompts::{PromptTemplates, render};
use crate::reasoning::{extract_payload, system_prompt_for};
use crate::retriever::MultiSourceRetriever;
use crate::sources::deduplicate_and_format_sources;
use crate::synthesizer::ReportSynthesizer;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant";

const REFLECTION_PREAMBLE: &str = "Using report organization as a guide identify a knowledge gap and generate a follow-up web search query based on our existing knowledge. \n \n ";

/// What a reflection round did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    /// New research was added and the summary rewritten.
    Extended,
    /// The model produced no usable query; no further rounds should run.
    Aborted,
}

/// Iteratively improves the running summary.
#[derive(Debug, Clone)]
pub struct ReflectionLoop {
    model: Arc<dyn ChatModel>,
    retriever: MultiSourceRetriever,
    synthesizer: ReportSynthesizer,
    prompts: Arc<PromptTemplates>,
    progress: Arc<dyn ProgressSink>,
    timeout: Duration,
}

impl ReflectionLoop {
    /// Create a new reflection loop.
    pub fn new(
        model: Arc<dyn ChatModel>,
        retriever: MultiSourceRetriever,
        synthesizer: ReportSynthesizer,
        prompts: Arc<PromptTemplates>,
        progress: Arc<dyn ProgressSink>,
        timeout: Duration,
    ) -> Self {
        Self {
            model,
            retriever,
            synthesizer,
            prompts,
            progress,
            timeout,
        }
    }

    /// Run up to `request.num_reflections` rounds.
    ///
    /// The first round that cannot produce a follow-up query ends the loop;
    /// the state is returned exactly as the previous round left it.
    #[instrument(skip_all, fields(rounds = request.num_reflections))]
    pub async fn reflect(&self, mut state: ReportState, request: &ResearchRequest) -> ReportState {
        info!("Reflecting {} times", request.num_reflections);
        for round in 1..=request.num_reflections {
            if self.reflect_once(&mut state, request).await == RoundOutcome::Aborted {
                info!(round, "Reflection aborted");
                break;
            }
        }
        self.progress
            .emit(ProgressKey::RunningSummary, &state.running_summary);
        state
    }

    /// Run a single round against `state`.
    ///
    /// `state` is only touched once the follow-up query has been retrieved,
    /// so an aborted round leaves it unchanged.
    pub async fn reflect_once(
        &self,
        state: &mut ReportState,
        request: &ResearchRequest,
    ) -> RoundOutcome {
        let Some(query) = self.follow_up_query(state, request).await else {
            self.progress
                .emit(ProgressKey::RunningSummary, &state.running_summary);
            return RoundOutcome::Aborted;
        };
        info!(query = query.query(), "Reflection query");

        let outcome = self
            .retriever
            .process_single_query(
                query.query(),
                &request.collection,
                request.search_web,
                request.search_eci,
            )
            .await;
        let bundle = deduplicate_and_format_sources(
            std::slice::from_ref(&outcome.citation),
            std::slice::from_ref(&outcome.answer),
            std::slice::from_ref(&query),
        );
        state.push_research(bundle, &outcome.citation);

        let latest = state.latest_research().unwrap_or_default().to_string();
        state.running_summary = self
            .synthesizer
            .summarize_report(&state.running_summary, &latest, &request.report_organization)
            .await;
        self.progress
            .emit(ProgressKey::RunningSummary, &state.running_summary);
        RoundOutcome::Extended
    }

    async fn follow_up_query(
        &self,
        state: &ReportState,
        request: &ResearchRequest,
    ) -> Option<GeneratedQuery> {
        let instructions = render(
            &self.prompts.reflection,
            &[
                ("report_organization", request.report_organization.as_str()),
                ("topic", request.topic.as_str()),
                ("report", state.running_summary.as_str()),
            ],
        );
        let messages = [
            ChatMessage::system(system_prompt_for(
                self.model.model_name(),
                DEFAULT_SYSTEM_PROMPT,
            )),
            ChatMessage::user(format!("{REFLECTION_PREAMBLE}{instructions}")),
        ];

        self.progress
            .emit(ProgressKey::ReflectOnSummary, "\n Starting reflection \n");
        let outcome = stream_with_reasoning(
            self.model.as_ref(),
            &messages,
            self.progress.as_ref(),
            ProgressKey::ReflectOnSummary,
            Echo::Reasoning,
            self.timeout,
        )
        .await;
        if !outcome.completed {
            warn!("Reflection response cut off; keeping the current summary");
            return None;
        }

        let Some(payload) = extract_payload(&outcome.text, self.model.requires_think_close())
        else {
            warn!("Reflection response missing </think>; response incomplete");
            return None;
        };
        if payload.is_empty() {
            warn!("Reflection produced an empty payload");
            return None;
        }

        let text = reflection_query_text(payload);
        match GeneratedQuery::new(&text, "All", "Reflection-based query") {
            Ok(query) => Some(query),
            Err(e) => {
                warn!("Rejecting reflection query: {e}");
                None
            }
        }
    }
}

/// The follow-up query in a reflection payload.
///
/// A JSON object's `query` field wins; anything else is used verbatim.
fn reflection_query_text(payload: &str) -> String {
    match parse_json_markdown(payload) {
        Ok(serde_json::Value::Object(map)) => match map.get("query") {
            Some(serde_json::Value::String(query)) => query.clone(),
            Some(other) => other.to_string(),
            None => payload.to_string(),
        },
        _ => payload.to_string(),
    }
}
