//! Report synthesis: write or extend the running summary from sources.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use yanjiu_core::{ChatMessage, ChatModel, ProgressKey, ProgressSink};

use crate::llm::{Echo, stream_with_reasoning};
use crate::prompts::{PromptTemplates, render};
use crate::reasoning::{Stripped, strip_reasoning, system_prompt_for};

const DEFAULT_SYSTEM_PROMPT: &str = "you are a helpful assistant";

/// Writes the report draft.
#[derive(Debug, Clone)]
pub struct ReportSynthesizer {
    model: Arc<dyn ChatModel>,
    prompts: Arc<PromptTemplates>,
    progress: Arc<dyn ProgressSink>,
    timeout: Duration,
}

impl ReportSynthesizer {
    /// Create a new synthesizer.
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

    /// Draft a report from `new_source`, or extend `existing_summary` with it.
    ///
    /// When the model times out, fails, or stops inside its reasoning, the
    /// rendered prompt is returned in place of a draft.
    #[instrument(skip_all, fields(extend = !existing_summary.is_empty(), source_len = new_source.len()))]
    pub async fn summarize_report(
        &self,
        existing_summary: &str,
        new_source: &str,
        report_organization: &str,
    ) -> String {
        let user_input = if existing_summary.is_empty() {
            render(
                &self.prompts.summarizer,
                &[
                    ("report_organization", report_organization),
                    ("source", new_source),
                ],
            )
        } else {
            render(
                &self.prompts.report_extender,
                &[("report", existing_summary), ("source", new_source)],
            )
        };
        let messages = [
            ChatMessage::system(system_prompt_for(
                self.model.model_name(),
                DEFAULT_SYSTEM_PROMPT,
            )),
            ChatMessage::user(user_input.as_str()),
        ];

        self.progress
            .emit(ProgressKey::SummarizeSources, "\n Starting summary \n");
        let outcome = stream_with_reasoning(
            self.model.as_ref(),
            &messages,
            self.progress.as_ref(),
            ProgressKey::SummarizeSources,
            Echo::Answer,
            self.timeout,
        )
        .await;

        if !outcome.completed {
            self.progress.emit(
                ProgressKey::SummarizeSources,
                " \n \n ---------------- \n \n Timeout error from reasoning LLM. Consider running report generation again. \n \n ",
            );
            return user_input;
        }

        match strip_reasoning(&outcome.text, self.model.requires_think_close()) {
            Stripped::Clean(report) => {
                debug!(len = report.len(), "Summary written");
                report
            }
            Stripped::Incomplete => {
                warn!("Summary response has <think> but no </think>; response incomplete");
                user_input
            }
        }
    }
}
