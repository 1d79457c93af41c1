//! # Yanjiu Core
//!
//! Core traits, types, and configuration for the Yanjiu deep-research
//! pipeline.
//!
//! This crate provides the building blocks shared by the pipeline stages and
//! the provider integrations:
//!
//! - **Data structures**: `GeneratedQuery`, `SourceRecord`, `SourceBundle`,
//!   `ReportState` and the artifact Q&A types
//! - **Collaborator traits**: `ChatModel`, `RagBackend`, `WebSearchBackend`,
//!   `EnterpriseSearchBackend` and `ProgressSink`
//! - **Configuration**: LLM, backend and pipeline settings with JSON loading
//! - **Sanitization**: prompt-injection checks for user supplied text
//! - **Error handling**: `YanjiuError` and the crate `Result` alias
//!
//! ## Quick Start
//!
//! ```rust
//! use yanjiu_core::prelude::*;
//!
//! let query = GeneratedQuery::new("lithium supply chain", "Overview", "baseline")?;
//! let mut bundle = SourceBundle::new();
//! bundle.push(SourceRecord {
//!     query: query.query().to_string(),
//!     answer: "Most refining happens in three countries.".into(),
//!     section: query.report_section().to_string(),
//!     citation: String::new(),
//! });
//! assert!(bundle.to_xml().starts_with("<sources><source>"));
//! # Ok::<(), YanjiuError>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export commonly used types and traits
pub mod prelude;

// Core modules
pub mod config;
pub mod error;
pub mod sanitize;
pub mod traits;
pub mod types;

// Re-export key types at crate root for convenience
pub use config::{
    ConfigLoader, EciConfig, LlmConfig, PipelineConfig, RagConfig, ResearchSettings, TavilyConfig,
};
pub use error::{Result, YanjiuError};
pub use types::{
    ArtifactQaInput, ArtifactQaOutput, ChatMessage, GeneratedQuery, MessageRole, ReportState,
    ResearchRequest, RewriteMode, SourceBundle, SourceRecord,
};

// Re-export traits for convenience
pub use traits::*;

/// Version information for the Yanjiu core library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the Yanjiu core library.
pub const NAME: &str = env!("CARGO_PKG_NAME");
