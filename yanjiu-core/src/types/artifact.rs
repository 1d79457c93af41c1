//! Input and output types for artifact Q&A.

use serde::{Deserialize, Serialize};

use crate::sanitize::{MAX_ORGANIZATION_LENGTH, MAX_QUERY_LENGTH, sanitize_prompt};
use crate::{Result, YanjiuError};

/// How an artifact should be rewritten.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RewriteMode {
    /// Rewrite the whole artifact.
    Entire,
}

/// A question or edit request about a previously generated artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtifactQaInput {
    /// The artifact (usually a report) the question refers to.
    pub artifact: String,

    /// The user's question or edit request.
    pub question: String,

    /// Prior turns, alternating user and assistant, starting with the user.
    #[serde(default)]
    pub chat_history: Vec<String>,

    /// Whether web search may be used for the supporting lookup.
    #[serde(default)]
    pub use_internet: bool,

    /// Requested rewrite, if any.
    #[serde(default)]
    pub rewrite_mode: Option<RewriteMode>,

    /// Extra context supplied by the user.
    #[serde(default)]
    pub additional_context: Option<String>,

    /// RAG collection to search.
    pub rag_collection: String,
}

impl ArtifactQaInput {
    /// Create a plain Q&A input.
    pub fn new<A, Q, C>(artifact: A, question: Q, rag_collection: C) -> Self
    where
        A: Into<String>,
        Q: Into<String>,
        C: Into<String>,
    {
        Self {
            artifact: artifact.into(),
            question: question.into(),
            chat_history: Vec::new(),
            use_internet: false,
            rewrite_mode: None,
            additional_context: None,
            rag_collection: rag_collection.into(),
        }
    }

    /// Request a rewrite.
    #[must_use]
    pub fn with_rewrite_mode(mut self, mode: RewriteMode) -> Self {
        self.rewrite_mode = Some(mode);
        self
    }

    /// Set the chat history.
    #[must_use]
    pub fn with_chat_history(mut self, history: Vec<String>) -> Self {
        self.chat_history = history;
        self
    }

    /// Attach additional context.
    pub fn with_additional_context<S: Into<String>>(mut self, context: S) -> Self {
        self.additional_context = Some(context.into());
        self
    }

    /// Allow web search for the supporting lookup.
    #[must_use]
    pub fn with_internet(mut self, enabled: bool) -> Self {
        self.use_internet = enabled;
        self
    }

    /// Validate the input and return a copy with sanitized text fields.
    pub fn validated(&self) -> Result<Self> {
        if self.question.trim().is_empty() {
            return Err(YanjiuError::validation("Question cannot be empty"));
        }
        let question = sanitize_prompt(&self.question, MAX_QUERY_LENGTH)?;

        let additional_context = self
            .additional_context
            .as_deref()
            .map(|context| sanitize_prompt(context, MAX_ORGANIZATION_LENGTH))
            .transpose()?;

        let chat_history = self
            .chat_history
            .iter()
            .map(|item| {
                if item.chars().count() > MAX_QUERY_LENGTH {
                    return Err(YanjiuError::validation("Chat history item too long"));
                }
                sanitize_prompt(item, MAX_QUERY_LENGTH)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            question,
            chat_history,
            additional_context,
            ..self.clone()
        })
    }
}

/// Answer to an [`ArtifactQaInput`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactQaOutput {
    /// The assistant's reply.
    pub assistant_reply: String,

    /// The artifact after the request was applied.
    pub updated_artifact: Option<String>,

    /// Supporting sources found for the question, numbered after the
    /// artifact's existing sources.
    #[serde(default)]
    pub new_sources: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_question_rejected() {
        let input = ArtifactQaInput::new("# Report", "   ", "docs");
        assert!(matches!(
            input.validated(),
            Err(YanjiuError::Validation { .. })
        ));
    }

    #[test]
    fn test_long_history_item_rejected() {
        let input = ArtifactQaInput::new("# Report", "Shorten it", "docs")
            .with_chat_history(vec!["x".repeat(MAX_QUERY_LENGTH + 1)]);
        assert!(input.validated().is_err());
    }

    #[test]
    fn test_rewrite_mode_serde() {
        let mode: RewriteMode = serde_json::from_str("\"entire\"").unwrap();
        assert_eq!(mode, RewriteMode::Entire);
    }
}
