//! Questions and rewrite requests about a finished report.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use yanjiu_core::{
    ArtifactQaInput, ArtifactQaOutput, ChatMessage, ChatModel, GeneratedQuery, NoopProgress,
    PipelineConfig, ProgressKey, ProgressSink, Result, RewriteMode,
};

use crate::json::Parsed;
use crate::llm::{Echo, stream_with_reasoning};
use crate::prompts::{PromptTemplates, render};
use crate::reasoning::{Stripped, strip_reasoning, system_prompt_for};
use crate::retriever::MultiSourceRetriever;
use crate::sources::{deduplicate_and_format_sources, format_sources, get_max_source_number};

/// Reply sent when the guardrail rejects a question.
pub const GUARDRAIL_REFUSAL: &str =
    "Sorry, I am not able to help answer that question. Please try again.";

const REWRITE_REPLY: &str = "Here is the updated artifact (entire rewrite).";
const REWRITE_FAILED_REPLY: &str =
    "Sorry, I was not able to rewrite the artifact. No changes were made. Please try again.";
const ANSWER_FAILED_REPLY: &str = "Sorry, I was not able to finish an answer. Please try again.";
const REWRITE_SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant that can rewrite artifacts based on user requests.";
const APP_CONTEXT: &str = "<app-context>\nYou are a helpful AI assistant. The user has an artifact (text, doc, or code) in front of them. You can refer to it as needed to answer questions or provide clarifications. When writing code, do not wrap with triple backticks, as the UI doesn't want them. Follow the user requests carefully.\n</app-context>";

#[derive(Debug, Deserialize)]
struct GuardrailVerdict {
    relevant: String,
}

/// Answers questions about, and rewrites, a previously generated artifact.
#[derive(Debug, Clone)]
pub struct ArtifactAssistant {
    model: Arc<dyn ChatModel>,
    retriever: MultiSourceRetriever,
    prompts: Arc<PromptTemplates>,
    progress: Arc<dyn ProgressSink>,
    config: PipelineConfig,
}

impl ArtifactAssistant {
    /// Create a new assistant.
    pub fn new(
        model: Arc<dyn ChatModel>,
        retriever: MultiSourceRetriever,
        prompts: Arc<PromptTemplates>,
        progress: Arc<dyn ProgressSink>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            model,
            retriever,
            prompts,
            progress,
            config,
        }
    }

    /// Handle one question or rewrite request.
    ///
    /// Fails only when the input does not validate.
    #[instrument(skip_all, fields(rewrite = input.rewrite_mode.is_some(), history = input.chat_history.len()))]
    pub async fn answer(&self, input: &ArtifactQaInput) -> Result<ArtifactQaOutput> {
        let input = input.validated()?;

        if self.config.apply_guardrail && !self.check_relevant(&input.artifact, &input.question).await
        {
            info!("Guardrail rejected question");
            return Ok(ArtifactQaOutput {
                assistant_reply: GUARDRAIL_REFUSAL.to_string(),
                updated_artifact: Some(input.artifact),
                new_sources: None,
            });
        }

        let outcome = self
            .retriever
            .process_single_query(
                &input.question,
                &input.rag_collection,
                input.use_internet,
                self.retriever.has_enterprise(),
            )
            .await;
        let lookup = GeneratedQuery::new(&input.question, input.artifact.as_str(), "Q/A")?;
        let bundle = deduplicate_and_format_sources(
            std::slice::from_ref(&outcome.citation),
            std::slice::from_ref(&outcome.answer),
            std::slice::from_ref(&lookup),
        );
        let question = format!("{}\n\n --- ADDITIONAL CONTEXT --- \n{bundle}", input.question);
        let new_sources = (!outcome.citation.trim().is_empty()).then(|| {
            format_sources(&outcome.citation, Some(citation_offset(&input.artifact)))
        });

        let (assistant_reply, updated_artifact) = match input.rewrite_mode {
            Some(RewriteMode::Entire) => {
                let message = match input.additional_context.as_deref() {
                    Some(context) if !context.is_empty() => {
                        format!("{question}\n\nAdditional context:\n{context}")
                    }
                    _ => question,
                };
                match self.rewrite_entire(&input.artifact, &message).await {
                    Some(updated) => (REWRITE_REPLY.to_string(), updated),
                    None => (REWRITE_FAILED_REPLY.to_string(), input.artifact),
                }
            }
            None => {
                let reply = self
                    .chat(&input.artifact, &input.chat_history, &question)
                    .await;
                (reply, input.artifact)
            }
        };

        Ok(ArtifactQaOutput {
            assistant_reply,
            updated_artifact: Some(updated_artifact),
            new_sources,
        })
    }

    /// Whether `question` is about `artifact`.
    ///
    /// Anything but an explicit, parseable answer other than "no" counts as
    /// unrelated.
    pub async fn check_relevant(&self, artifact: &str, question: &str) -> bool {
        let prompt = render(
            &self.prompts.artifact_guardrail,
            &[("artifact", artifact), ("prompt", question)],
        );
        let messages = [ChatMessage::user(prompt)];
        let response =
            match tokio::time::timeout(self.config.relevancy_timeout(), self.model.invoke(&messages))
                .await
            {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    info!("Failed to apply guardrail: {e}");
                    return false;
                }
                Err(_) => {
                    info!("Guardrail check timed out");
                    return false;
                }
            };

        match Parsed::<GuardrailVerdict>::from_llm_output(&response) {
            Parsed::Parsed(verdict) => !verdict.relevant.trim().eq_ignore_ascii_case("no"),
            Parsed::Default => false,
        }
    }

    async fn rewrite_entire(&self, artifact: &str, message: &str) -> Option<String> {
        let prompt = format!(
            "{}\n\nUser request:\n{message}",
            render(&self.prompts.artifact_rewrite, &[("artifact", artifact)])
        );
        let messages = [
            ChatMessage::system(system_prompt_for(
                self.model.model_name(),
                REWRITE_SYSTEM_PROMPT,
            )),
            ChatMessage::user(prompt),
        ];

        let outcome = stream_with_reasoning(
            self.model.as_ref(),
            &messages,
            &NoopProgress,
            ProgressKey::FinalReport,
            Echo::Silent,
            self.config.finalize_timeout(),
        )
        .await;
        if !outcome.completed {
            warn!("Artifact rewrite did not complete");
            return None;
        }

        match strip_reasoning(&outcome.text, self.model.requires_think_close()) {
            Stripped::Clean(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            _ => {
                warn!("Artifact rewrite produced no usable text");
                None
            }
        }
    }

    async fn chat(&self, artifact: &str, history: &[String], question: &str) -> String {
        let mut messages = Vec::with_capacity(history.len() + 3);
        messages.push(ChatMessage::system(system_prompt_for(
            self.model.model_name(),
            &self.prompts.artifact_chat_system,
        )));
        messages.push(ChatMessage::user(format!(
            "{APP_CONTEXT}\n\n<artifact>\n{artifact}\n</artifact>"
        )));
        for (i, turn) in history.iter().enumerate() {
            if i % 2 == 0 {
                messages.push(ChatMessage::user(turn.as_str()));
            } else {
                messages.push(ChatMessage::assistant(turn.as_str()));
            }
        }
        messages.push(ChatMessage::user(question));
        debug!(turns = messages.len(), "Asking about artifact");

        let outcome = stream_with_reasoning(
            self.model.as_ref(),
            &messages,
            self.progress.as_ref(),
            ProgressKey::FinalReport,
            Echo::Silent,
            self.config.llm_timeout(),
        )
        .await;

        match strip_reasoning(&outcome.text, self.model.requires_think_close()) {
            Stripped::Clean(text) if outcome.completed && !text.trim().is_empty() => {
                text.trim().to_string()
            }
            _ => ANSWER_FAILED_REPLY.to_string(),
        }
    }
}

/// First source number to use for sources appended to `artifact`.
pub fn citation_offset(artifact: &str) -> usize {
    get_max_source_number(artifact) + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_citation_offset() {
        assert_eq!(citation_offset("no sources yet"), 1);
        assert_eq!(
            citation_offset("## Sources\n**Source** 1\n...\n**Source** 4\n"),
            5
        );
    }
}
