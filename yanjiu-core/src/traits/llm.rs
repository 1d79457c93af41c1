//! Chat model capability used by every LLM-backed pipeline stage.

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::{ChatMessage, Result};

/// A streamed piece of a model response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatChunk {
    /// Visible content delta.
    pub content: String,
    /// Reasoning delta delivered on a side channel, if the model has one.
    pub reasoning: Option<String>,
}

impl ChatChunk {
    /// A content-only chunk.
    pub fn content<S: Into<String>>(content: S) -> Self {
        Self {
            content: content.into(),
            reasoning: None,
        }
    }

    /// A reasoning-only chunk.
    pub fn reasoning<S: Into<String>>(reasoning: S) -> Self {
        Self {
            content: String::new(),
            reasoning: Some(reasoning.into()),
        }
    }
}

/// Stream of response chunks.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<ChatChunk>> + Send>>;

/// How a model exposes its reasoning tokens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningStyle {
    /// Reasoning is embedded in the content, wrapped in `<think>` tags.
    InlineTag,
    /// Reasoning arrives in a separate field next to the content.
    SideChannel,
}

impl ReasoningStyle {
    /// Pick the reasoning style from a model identifier.
    ///
    /// Nemotron and DeepSeek models use inline tags, gpt-oss models use a
    /// side channel, and anything unknown is treated as inline.
    pub fn from_model_name(model_name: &str) -> Self {
        let name = model_name.to_lowercase();
        if name.contains("nemotron") || name.contains("deepseek") {
            Self::InlineTag
        } else if name.contains("gpt-oss") {
            Self::SideChannel
        } else {
            Self::InlineTag
        }
    }
}

/// A chat-capable language model.
///
/// Implementations wrap a provider client. The pipeline only ever sends a
/// short list of messages and reads text back, either in one piece or as a
/// stream of [`ChatChunk`]s.
#[async_trait]
pub trait ChatModel: Send + Sync + std::fmt::Debug {
    /// Send messages and wait for the complete response text.
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Send messages and stream the response.
    async fn stream(&self, messages: &[ChatMessage]) -> Result<ChatStream>;

    /// Identifier of the underlying model.
    fn model_name(&self) -> &str;

    /// Whether [`stream`](Self::stream) should be preferred over
    /// [`invoke`](Self::invoke).
    fn supports_streaming(&self) -> bool {
        true
    }

    /// How this model exposes reasoning tokens.
    fn reasoning_style(&self) -> ReasoningStyle {
        ReasoningStyle::from_model_name(self.model_name())
    }

    /// Whether a response without a closing `</think>` tag is incomplete.
    ///
    /// Models that always reason before answering must close their
    /// reasoning block; a missing close means the answer was cut off.
    fn requires_think_close(&self) -> bool {
        self.model_name().to_lowercase().contains("nemotron")
    }

    /// Get a human-readable name for this model adapter.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Check if the model is reachable.
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("nvidia/llama-3.3-nemotron-super-49b-v1", ReasoningStyle::InlineTag)]
    #[test_case("deepseek-r1", ReasoningStyle::InlineTag)]
    #[test_case("openai/gpt-oss-120b", ReasoningStyle::SideChannel)]
    #[test_case("gpt-4o", ReasoningStyle::InlineTag)]
    fn test_reasoning_style_from_name(name: &str, expected: ReasoningStyle) {
        assert_eq!(ReasoningStyle::from_model_name(name), expected);
    }
}
