//! Fire-and-forget progress reporting.
//!
//! Stages report what they are doing through a [`ProgressSink`]. Writing
//! never blocks and never fails: a slow or absent consumer must not slow
//! down or break a research run.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use tokio::sync::mpsc;
use tracing::debug;

/// Which part of the pipeline a progress message belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProgressKey {
    /// Query planning.
    GeneratingQuestions,
    /// RAG retrieval.
    RagAnswer,
    /// Enterprise search retrieval.
    EciAnswer,
    /// Web search retrieval.
    WebAnswer,
    /// Relevancy judgments.
    RelevancyChecker,
    /// Report synthesis.
    SummarizeSources,
    /// Reflection rounds.
    ReflectOnSummary,
    /// The current draft after a stage.
    RunningSummary,
    /// Finalization output.
    FinalReport,
    /// The publish-ready report.
    FinalizedSummary,
}

/// A single progress message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Pipeline area.
    pub key: ProgressKey,
    /// Message text, usually a fragment meant to be appended to a UI pane.
    pub message: String,
}

impl ProgressEvent {
    /// Create a new event.
    pub fn new<S: Into<String>>(key: ProgressKey, message: S) -> Self {
        Self {
            key,
            message: message.into(),
        }
    }
}

/// Receiver of progress events.
pub trait ProgressSink: Send + Sync + std::fmt::Debug {
    /// Deliver an event. Must not block.
    fn write(&self, event: ProgressEvent);

    /// Convenience wrapper around [`write`](Self::write).
    fn emit(&self, key: ProgressKey, message: &str) {
        self.write(ProgressEvent::new(key, message));
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn write(&self, _event: ProgressEvent) {}
}

/// Logs every event at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn write(&self, event: ProgressEvent) {
        debug!(key = %event.key, "{}", event.message);
    }
}

/// Forwards events into an unbounded channel.
///
/// Events written after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    sender: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelProgress {
    /// Create a sink and the receiver that consumes it.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ProgressSink for ChannelProgress {
    fn write(&self, event: ProgressEvent) {
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_key_names() {
        assert_eq!(ProgressKey::GeneratingQuestions.to_string(), "generating_questions");
        assert_eq!(ProgressKey::RelevancyChecker.as_ref(), "relevancy_checker");
    }

    #[tokio::test]
    async fn test_channel_progress_delivers_and_tolerates_drop() {
        let (sink, mut receiver) = ChannelProgress::channel();
        sink.emit(ProgressKey::RagAnswer, "searching");

        let event = receiver.recv().await.unwrap();
        assert_eq!(event, ProgressEvent::new(ProgressKey::RagAnswer, "searching"));

        drop(receiver);
        sink.emit(ProgressKey::RagAnswer, "ignored");
    }
}
