//! [`ChatModel`] backed by a siumai client.

use async_trait::async_trait;
use futures::StreamExt;
use siumai::prelude::*;
use tracing::{debug, instrument, warn};

use yanjiu_core::{
    ChatChunk, ChatModel, ChatStream, MessageRole, ReasoningStyle, Result, YanjiuError,
};

/// A chat model served by any provider siumai supports.
///
/// Reasoning deltas from providers that expose them separately are passed
/// on as [`ChatChunk::reasoning`]; everything else arrives as content.
pub struct SiumaiChatModel {
    client: Siumai,
    model: String,
    streaming: bool,
    reasoning_style: ReasoningStyle,
}

impl std::fmt::Debug for SiumaiChatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiumaiChatModel")
            .field("model", &self.model)
            .field("streaming", &self.streaming)
            .field("reasoning_style", &self.reasoning_style)
            .finish_non_exhaustive()
    }
}

impl SiumaiChatModel {
    /// Wrap a client for `model`.
    pub fn new<S: Into<String>>(client: Siumai, model: S) -> Self {
        let model = model.into();
        let reasoning_style = ReasoningStyle::from_model_name(&model);
        Self {
            client,
            model,
            streaming: true,
            reasoning_style,
        }
    }

    /// Enable or disable streaming.
    #[must_use]
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Override the reasoning style inferred from the model name.
    #[must_use]
    pub fn with_reasoning_style(mut self, style: ReasoningStyle) -> Self {
        self.reasoning_style = style;
        self
    }

    fn to_siumai_messages(messages: &[yanjiu_core::ChatMessage]) -> Vec<ChatMessage> {
        messages
            .iter()
            .map(|message| match message.role {
                MessageRole::System => ChatMessage::system(&message.content).build(),
                MessageRole::User => ChatMessage::user(&message.content).build(),
                MessageRole::Assistant => ChatMessage::assistant(&message.content).build(),
            })
            .collect()
    }
}

/// Map a stream event to a chunk; events without text map to `None`.
fn chunk_from_event(event: ChatStreamEvent) -> Option<ChatChunk> {
    match event {
        ChatStreamEvent::ContentDelta { delta, .. } => Some(ChatChunk::content(delta)),
        ChatStreamEvent::ThinkingDelta { delta } => Some(ChatChunk::reasoning(delta)),
        // The final response repeats what the deltas already delivered.
        _ => None,
    }
}

#[async_trait]
impl ChatModel for SiumaiChatModel {
    #[instrument(skip_all, fields(model = %self.model, messages = messages.len()))]
    async fn invoke(&self, messages: &[yanjiu_core::ChatMessage]) -> Result<String> {
        let response = self
            .client
            .chat(Self::to_siumai_messages(messages))
            .await
            .map_err(|e| YanjiuError::llm(format!("Siumai generation failed: {e}")))?;
        let text = response.content.all_text();
        debug!(len = text.len(), "Generated response");
        Ok(text)
    }

    #[instrument(skip_all, fields(model = %self.model, messages = messages.len()))]
    async fn stream(&self, messages: &[yanjiu_core::ChatMessage]) -> Result<ChatStream> {
        let stream = self
            .client
            .chat_stream(Self::to_siumai_messages(messages), None)
            .await
            .map_err(|e| YanjiuError::llm(format!("Siumai streaming failed: {e}")))?;

        let chunks = stream.filter_map(|item| async move {
            match item {
                Ok(event) => chunk_from_event(event).map(Ok),
                Err(e) => {
                    warn!("Stream error: {e}");
                    Some(Err(YanjiuError::llm(format!("Stream error: {e}"))))
                }
            }
        });
        Ok(Box::pin(chunks))
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn supports_streaming(&self) -> bool {
        self.streaming
    }

    fn reasoning_style(&self) -> ReasoningStyle {
        self.reasoning_style
    }

    fn name(&self) -> &'static str {
        "SiumaiChatModel"
    }

    async fn health_check(&self) -> Result<()> {
        let test_messages = vec![ChatMessage::user("Hello").build()];
        self.client
            .chat(test_messages)
            .await
            .map_err(|e| YanjiuError::llm(format!("Health check failed: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_roles_are_preserved() {
        let messages = [
            yanjiu_core::ChatMessage::system("rules"),
            yanjiu_core::ChatMessage::user("question"),
            yanjiu_core::ChatMessage::assistant("answer"),
        ];
        let converted = SiumaiChatModel::to_siumai_messages(&messages);

        assert_eq!(converted.len(), 3);
        assert!(matches!(converted[0].role, siumai::types::MessageRole::System));
        assert!(matches!(converted[1].role, siumai::types::MessageRole::User));
        assert!(matches!(converted[2].role, siumai::types::MessageRole::Assistant));
        assert_eq!(converted[1].content.all_text(), "question");
    }

    #[test]
    fn test_thinking_maps_to_reasoning() {
        let thinking = chunk_from_event(ChatStreamEvent::ThinkingDelta {
            delta: "hmm".to_string(),
        });
        assert_eq!(thinking, Some(ChatChunk::reasoning("hmm")));
    }
}
