//! Reasoning-aware calls to a [`ChatModel`].
//!
//! Every LLM-backed stage goes through [`stream_with_reasoning`]: it streams
//! when the model supports it, forwards the right part of the response to
//! the progress sink, and turns timeouts and provider errors into a partial
//! [`StreamOutcome`] instead of an error.

use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, warn};

use yanjiu_core::{
    ChatChunk, ChatMessage, ChatModel, ProgressKey, ProgressSink, ReasoningStyle, YanjiuError,
};

use crate::reasoning::{THINK_CLOSE, THINK_OPEN, Stripped, strip_reasoning};

/// Text produced by a model call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamOutcome {
    /// Accumulated response text. Partial when `completed` is false.
    pub text: String,
    /// Whether the call finished without timeout or error.
    pub completed: bool,
}

/// Which part of a response is echoed to the progress sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Echo {
    /// The model's thinking, up to the end of its reasoning block.
    Reasoning,
    /// Only the answer; reasoning is never forwarded.
    Answer,
    /// The whole response text. Side-channel reasoning is not part of it.
    All,
    /// Nothing.
    Silent,
}

#[derive(Debug)]
struct Echoer<'a> {
    progress: &'a dyn ProgressSink,
    key: ProgressKey,
    echo: Echo,
    past_reasoning: bool,
    in_think: bool,
}

impl<'a> Echoer<'a> {
    fn new(progress: &'a dyn ProgressSink, key: ProgressKey, echo: Echo) -> Self {
        Self {
            progress,
            key,
            echo,
            past_reasoning: false,
            in_think: false,
        }
    }

    fn emit(&self, text: &str) {
        if !text.is_empty() {
            self.progress.emit(self.key, text);
        }
    }

    fn inline(&mut self, content: &str) {
        match self.echo {
            Echo::Reasoning => {
                if content.contains(THINK_CLOSE) {
                    self.past_reasoning = true;
                }
                if !self.past_reasoning {
                    self.emit(content);
                }
            }
            Echo::Answer => self.answer_only(content),
            Echo::All => self.emit(content),
            Echo::Silent => {}
        }
    }

    /// Emit the parts of `content` outside reasoning blocks.
    ///
    /// Text before a `</think>` with no opening tag is reasoning too.
    fn answer_only(&mut self, content: &str) {
        let mut rest = content;
        loop {
            if self.in_think {
                let Some(end) = rest.find(THINK_CLOSE) else {
                    return;
                };
                self.in_think = false;
                rest = &rest[end + THINK_CLOSE.len()..];
                continue;
            }

            match (rest.find(THINK_OPEN), rest.find(THINK_CLOSE)) {
                (Some(start), Some(end)) if end < start => {
                    rest = &rest[end + THINK_CLOSE.len()..];
                }
                (Some(start), _) => {
                    self.emit(&rest[..start]);
                    self.in_think = true;
                    rest = &rest[start + THINK_OPEN.len()..];
                }
                (None, Some(end)) => rest = &rest[end + THINK_CLOSE.len()..],
                (None, None) => {
                    self.emit(rest);
                    return;
                }
            }
        }
    }

    fn side_channel(&self, chunk: &ChatChunk) {
        match self.echo {
            Echo::Reasoning => {
                self.emit(&chunk.content);
                if let Some(reasoning) = &chunk.reasoning {
                    self.emit(reasoning);
                }
            }
            Echo::Answer | Echo::All => self.emit(&chunk.content),
            Echo::Silent => {}
        }
    }

    fn whole(&self, text: &str) {
        match self.echo {
            Echo::Reasoning | Echo::All => self.emit(text),
            Echo::Answer => {
                if let Stripped::Clean(clean) = strip_reasoning(text, false) {
                    self.emit(&clean);
                }
            }
            Echo::Silent => {}
        }
    }
}

/// Call `model` and collect its response.
///
/// Inline-tag models have their content accumulated verbatim, tags
/// included. Side-channel models contribute only the content of chunks that
/// carry no reasoning. A timeout or provider error yields whatever was
/// collected so far with `completed == false`, and a hint is written to the
/// progress sink under `key`.
pub async fn stream_with_reasoning(
    model: &dyn ChatModel,
    messages: &[ChatMessage],
    progress: &dyn ProgressSink,
    key: ProgressKey,
    echo: Echo,
    timeout: Duration,
) -> StreamOutcome {
    let style = model.reasoning_style();
    let mut echoer = Echoer::new(progress, key, echo);
    let mut text = String::new();

    let result = tokio::time::timeout(timeout, async {
        if !model.supports_streaming() {
            debug!(model = model.model_name(), "Streaming disabled, using invoke");
            let response = model.invoke(messages).await?;
            echoer.whole(&response);
            text = response;
            return Ok(());
        }

        let mut stream = model.stream(messages).await?;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            match style {
                ReasoningStyle::InlineTag => {
                    echoer.inline(&chunk.content);
                    text.push_str(&chunk.content);
                }
                ReasoningStyle::SideChannel => {
                    echoer.side_channel(&chunk);
                    if chunk.reasoning.is_none() {
                        text.push_str(&chunk.content);
                    }
                }
            }
        }
        Ok::<(), YanjiuError>(())
    })
    .await;

    match result {
        Ok(Ok(())) => StreamOutcome {
            text,
            completed: true,
        },
        Ok(Err(e)) => {
            warn!(model = model.model_name(), "LLM call failed: {e}");
            progress.emit(key, &error_hint(&e.to_string()));
            StreamOutcome {
                text,
                completed: false,
            }
        }
        Err(_) => {
            warn!(
                model = model.model_name(),
                "LLM call timed out after {timeout:?}"
            );
            progress.emit(
                key,
                " \n \n ---------------- \n \n Timeout error from reasoning LLM, please try again",
            );
            StreamOutcome {
                text,
                completed: false,
            }
        }
    }
}

/// Progress text explaining an LLM failure.
pub fn error_hint(message: &str) -> String {
    if message.contains("404") || message.contains("Not Found") {
        " \n \n ---------------- \n \n LLM endpoint not found (404). Please check that the LLM service is running and the base_url is correct in the configuration.".to_string()
    } else if message.contains("Connection") || message.to_lowercase().contains("timeout") {
        " \n \n ---------------- \n \n Cannot connect to LLM service. Please check that the LLM service is running and accessible.".to_string()
    } else {
        format!(" \n \n ---------------- \n \n Error from LLM: {message}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::stream;
    use std::sync::Mutex;
    use yanjiu_core::{ChatStream, ProgressEvent, Result};

    #[derive(Debug)]
    struct ChunkModel {
        name: &'static str,
        chunks: Vec<ChatChunk>,
        streaming: bool,
        fail: bool,
    }

    impl ChunkModel {
        fn inline(parts: &[&str]) -> Self {
            Self {
                name: "nemotron-test",
                chunks: parts.iter().map(|p| ChatChunk::content(*p)).collect(),
                streaming: true,
                fail: false,
            }
        }
    }

    #[async_trait]
    impl ChatModel for ChunkModel {
        async fn invoke(&self, _messages: &[ChatMessage]) -> Result<String> {
            Ok(self.chunks.iter().map(|c| c.content.as_str()).collect())
        }

        async fn stream(&self, _messages: &[ChatMessage]) -> Result<ChatStream> {
            let mut items: Vec<Result<ChatChunk>> = self.chunks.iter().cloned().map(Ok).collect();
            if self.fail {
                items.push(Err(YanjiuError::llm("Connection reset by peer")));
            }
            Ok(Box::pin(stream::iter(items)))
        }

        fn model_name(&self) -> &str {
            self.name
        }

        fn supports_streaming(&self) -> bool {
            self.streaming
        }
    }

    #[derive(Debug, Default)]
    struct Recorder(Mutex<Vec<ProgressEvent>>);

    impl ProgressSink for Recorder {
        fn write(&self, event: ProgressEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    impl Recorder {
        fn messages(&self) -> Vec<String> {
            self.0.lock().unwrap().iter().map(|e| e.message.clone()).collect()
        }
    }

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_inline_reasoning_echo_stops_at_close() {
        let model = ChunkModel::inline(&["<think>", "plan", "</think>", "[1]"]);
        let progress = Recorder::default();
        let outcome = stream_with_reasoning(
            &model,
            &[],
            &progress,
            ProgressKey::GeneratingQuestions,
            Echo::Reasoning,
            TIMEOUT,
        )
        .await;

        assert!(outcome.completed);
        assert_eq!(outcome.text, "<think>plan</think>[1]");
        assert_eq!(progress.messages(), vec!["<think>", "plan"]);
    }

    #[tokio::test]
    async fn test_inline_answer_echo_hides_reasoning() {
        let model = ChunkModel::inline(&["<think>", "secret", "</think>", "Report"]);
        let progress = Recorder::default();
        stream_with_reasoning(
            &model,
            &[],
            &progress,
            ProgressKey::SummarizeSources,
            Echo::Answer,
            TIMEOUT,
        )
        .await;

        assert_eq!(progress.messages(), vec!["Report"]);
    }

    #[tokio::test]
    async fn test_inline_answer_echo_within_one_chunk() {
        let model = ChunkModel::inline(&["Intro <think>secret</think>Report", " more"]);
        let progress = Recorder::default();
        stream_with_reasoning(
            &model,
            &[],
            &progress,
            ProgressKey::SummarizeSources,
            Echo::Answer,
            TIMEOUT,
        )
        .await;

        assert_eq!(progress.messages(), vec!["Intro ", "Report", " more"]);
    }

    #[tokio::test]
    async fn test_inline_answer_echo_drops_text_before_dangling_close() {
        let model = ChunkModel::inline(&["scratch</think>Report"]);
        let progress = Recorder::default();
        stream_with_reasoning(
            &model,
            &[],
            &progress,
            ProgressKey::SummarizeSources,
            Echo::Answer,
            TIMEOUT,
        )
        .await;

        assert_eq!(progress.messages(), vec!["Report"]);
    }

    #[tokio::test]
    async fn test_side_channel_full_echo_leaves_out_reasoning() {
        let model = ChunkModel {
            name: "openai/gpt-oss-120b",
            chunks: vec![ChatChunk::reasoning("hmm"), ChatChunk::content("Final text")],
            streaming: true,
            fail: false,
        };
        let progress = Recorder::default();
        stream_with_reasoning(
            &model,
            &[],
            &progress,
            ProgressKey::FinalReport,
            Echo::All,
            TIMEOUT,
        )
        .await;

        assert_eq!(progress.messages(), vec!["Final text"]);
    }

    #[tokio::test]
    async fn test_side_channel_accumulates_content_only() {
        let model = ChunkModel {
            name: "openai/gpt-oss-120b",
            chunks: vec![ChatChunk::reasoning("hmm"), ChatChunk::content("answer")],
            streaming: true,
            fail: false,
        };
        let progress = Recorder::default();
        let outcome = stream_with_reasoning(
            &model,
            &[],
            &progress,
            ProgressKey::ReflectOnSummary,
            Echo::Reasoning,
            TIMEOUT,
        )
        .await;

        assert_eq!(outcome.text, "answer");
        assert_eq!(progress.messages(), vec!["hmm", "answer"]);
    }

    #[tokio::test]
    async fn test_error_keeps_partial_text() {
        let model = ChunkModel {
            fail: true,
            ..ChunkModel::inline(&["partial"])
        };
        let progress = Recorder::default();
        let outcome = stream_with_reasoning(
            &model,
            &[],
            &progress,
            ProgressKey::FinalReport,
            Echo::Silent,
            TIMEOUT,
        )
        .await;

        assert!(!outcome.completed);
        assert_eq!(outcome.text, "partial");
        assert!(progress.messages()[0].contains("Cannot connect"));
    }

    #[tokio::test]
    async fn test_invoke_when_streaming_disabled() {
        let model = ChunkModel {
            streaming: false,
            ..ChunkModel::inline(&["<think>x</think>", "done"])
        };
        let progress = Recorder::default();
        let outcome = stream_with_reasoning(
            &model,
            &[],
            &progress,
            ProgressKey::SummarizeSources,
            Echo::Answer,
            TIMEOUT,
        )
        .await;

        assert!(outcome.completed);
        assert_eq!(outcome.text, "<think>x</think>done");
        assert_eq!(progress.messages(), vec!["done"]);
    }

    #[test]
    fn test_error_hint() {
        assert!(error_hint("HTTP 404 Not Found").contains("endpoint not found"));
        assert!(error_hint("request timeout").contains("Cannot connect"));
        assert!(error_hint("bad key").ends_with("Error from LLM: bad key"));
    }
}
