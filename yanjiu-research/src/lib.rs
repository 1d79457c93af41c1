//! Deep-research pipeline stages for Yanjiu.
//!
//! This crate turns a topic and a desired report organization into a
//! cited Markdown report. It provides:
//!
//! - **Planning**: [`planner::QueryPlanner`] asks the model for targeted queries
//! - **Retrieval**: [`retriever::MultiSourceRetriever`] tries RAG, enterprise
//!   search and the web in order, gated by [`relevancy::RelevancyGate`]
//! - **Synthesis**: [`synthesizer::ReportSynthesizer`] drafts and extends the report
//! - **Reflection**: [`reflection::ReflectionLoop`] researches knowledge gaps
//! - **Finalization**: [`finalizer::Finalizer`] polishes the draft and appends sources
//! - **Orchestration**: [`pipeline::ResearchPipeline`] runs everything, in one
//!   shot or as a stream of updates
//! - **Artifact Q&A**: [`artifact::ArtifactAssistant`] answers follow-up
//!   questions and rewrites finished reports
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use futures::StreamExt;
//! use yanjiu_core::prelude::*;
//! use yanjiu_research::prelude::*;
//!
//! # async fn example(model: Arc<dyn ChatModel>, rag: Arc<dyn RagBackend>) -> Result<()> {
//! let pipeline = ResearchPipeline::builder().model(model).rag(rag).build()?;
//!
//! let request = ResearchRequest::new("Sodium-ion batteries", "Overview, Costs, Outlook", "energy")
//!     .with_num_reflections(1);
//! let mut updates = pipeline.run_stream(request);
//! while let Some(update) = updates.next().await {
//!     if let PipelineUpdate::Finalized(state) = update {
//!         println!("{}", state.final_report);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Failure model
//!
//! Only invalid requests are errors. Timeouts, provider failures and
//! malformed model output degrade the report: the relevancy gate fails
//! open, an unusable reflection ends the loop early, and finalization falls
//! back to the draft with raw citations.

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod artifact;
pub mod finalizer;
pub mod json;
pub mod llm;
pub mod pipeline;
pub mod planner;
pub mod prompts;
pub mod reasoning;
pub mod reflection;
pub mod relevancy;
pub mod retriever;
pub mod sources;
pub mod synthesizer;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::artifact::ArtifactAssistant;
    pub use crate::finalizer::{FinalReport, Finalizer};
    pub use crate::json::Parsed;
    pub use crate::llm::{Echo, StreamOutcome, stream_with_reasoning};
    pub use crate::pipeline::{PipelineUpdate, ResearchPipeline, ResearchPipelineBuilder, Stage};
    pub use crate::planner::QueryPlanner;
    pub use crate::prompts::PromptTemplates;
    pub use crate::reasoning::{Stripped, extract_payload, strip_reasoning};
    pub use crate::reflection::{ReflectionLoop, RoundOutcome};
    pub use crate::relevancy::{Relevance, RelevancyGate, RelevancyVerdict};
    pub use crate::retriever::{MultiSourceRetriever, RetrievalOutcome, SourceKind};
    pub use crate::sources::{
        deduplicate_and_format_sources, format_citation, format_sources, get_max_source_number,
        redact_urls,
    };
    pub use crate::synthesizer::ReportSynthesizer;
}

pub use pipeline::{PipelineUpdate, ResearchPipeline, ResearchPipelineBuilder};
