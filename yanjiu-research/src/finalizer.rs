//! Finalization: polish the draft and append the rendered sources.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

use yanjiu_core::{ChatMessage, ChatModel, ProgressKey, ProgressSink, ReportState};

use crate::llm::{Echo, stream_with_reasoning};
use crate::prompts::{PromptTemplates, render};
use crate::reasoning::{Stripped, strip_reasoning, system_prompt_for};
use crate::sources::format_sources;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant";

/// The publish-ready report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalReport {
    /// Report Markdown, ending with the sources.
    pub final_report: String,
    /// The rendered sources on their own.
    pub formatted_citations: String,
}

impl FinalReport {
    /// Record the report in `state`.
    pub fn apply_to(self, state: &mut ReportState) {
        state.running_summary.clone_from(&self.final_report);
        state.final_report = self.final_report;
        state.formatted_citations = self.formatted_citations;
    }
}

/// Produces the final report.
#[derive(Debug, Clone)]
pub struct Finalizer {
    model: Arc<dyn ChatModel>,
    prompts: Arc<PromptTemplates>,
    progress: Arc<dyn ProgressSink>,
    timeout: Duration,
}

impl Finalizer {
    /// Create a new finalizer.
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

    /// Polish `state.running_summary` and append the sources.
    ///
    /// Never fails. If the model times out or errors, the unpolished draft
    /// is returned with the raw citations appended.
    #[instrument(skip_all)]
    pub async fn finalize(&self, state: &ReportState, report_organization: &str) -> FinalReport {
        info!("Finalizing report");
        self.progress
            .emit(ProgressKey::FinalReport, "\n Starting finalization \n");

        let formatted_citations = format_sources(&state.citations, None);
        let prompt = render(
            &self.prompts.finalize,
            &[
                ("report", state.running_summary.as_str()),
                ("report_organization", report_organization),
            ],
        );
        let messages = [
            ChatMessage::system(system_prompt_for(
                self.model.model_name(),
                DEFAULT_SYSTEM_PROMPT,
            )),
            ChatMessage::user(prompt),
        ];

        let outcome = stream_with_reasoning(
            self.model.as_ref(),
            &messages,
            self.progress.as_ref(),
            ProgressKey::FinalReport,
            Echo::All,
            self.timeout,
        )
        .await;

        let final_report = if outcome.completed {
            let body = match strip_reasoning(&outcome.text, self.model.requires_think_close()) {
                Stripped::Clean(body) => body,
                Stripped::Incomplete => {
                    warn!("Final report response incomplete, keeping the draft");
                    state.running_summary.clone()
                }
            };
            format!("{body} \n\n ## Sources \n\n{formatted_citations}")
        } else {
            self.progress.emit(
                ProgressKey::FinalReport,
                " \n \n --------------- \n Timeout error from reasoning LLM during final report creation. Consider restarting report generation. \n \n ",
            );
            format!("{} \n\n ---- \n\n {}", state.running_summary, state.citations)
        };

        self.progress
            .emit(ProgressKey::FinalizedSummary, &final_report);
        FinalReport {
            final_report,
            formatted_citations,
        }
    }
}
