//! Prelude module for convenient imports.
//!
//! ```rust
//! use yanjiu_core::prelude::*;
//!
//! let request = ResearchRequest::new("Grid-scale storage", "intro, findings", "energy");
//! assert_eq!(request.num_queries, 3);
//! ```

// Re-export core error types
pub use crate::error::{Result, YanjiuError};

// Re-export all data types
pub use crate::types::{
    ArtifactQaInput, ArtifactQaOutput, ChatMessage, GeneratedQuery, MessageRole, ReportState,
    ResearchRequest, RewriteMode, SourceBundle, SourceRecord,
};

// Re-export core traits
pub use crate::traits::{
    ChannelProgress, ChatChunk, ChatModel, ChatStream, EnterpriseHit, EnterpriseSearchBackend,
    NoopProgress, ProgressEvent, ProgressKey, ProgressSink, RagAnswer, RagBackend,
    ReasoningStyle, TracingProgress, WebSearchBackend, WebSearchHit,
};

// Re-export configuration
pub use crate::config::{
    ConfigLoader, EciConfig, LlmConfig, PipelineConfig, RagConfig, ResearchSettings,
    TavilyConfig,
};
