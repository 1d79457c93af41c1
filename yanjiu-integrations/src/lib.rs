//! Concrete collaborators for Yanjiu research pipelines.
//!
//! - **LLM**: [`llm::SiumaiChatModel`] adapts any provider supported by
//!   siumai (`OpenAI`, Anthropic, Ollama, OpenAI-compatible local servers)
//! - **RAG**: [`backends::HttpRagBackend`] queries a RAG server's
//!   `/generate` endpoint
//! - **Web search**: [`backends::TavilySearch`]
//! - **Enterprise search**: [`backends::EciSearch`]
//!
//! [`pipeline_from_settings`] wires all of them from a
//! [`ResearchSettings`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use yanjiu_core::config::ConfigLoader;
//! use yanjiu_integrations::pipeline_from_settings;
//!
//! # async fn example() -> yanjiu_core::Result<()> {
//! let settings = ConfigLoader::new().load_json_file("research.json").await?;
//! let pipeline = pipeline_from_settings(&settings).await?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backends;
pub mod error;
pub mod llm;

pub use backends::{EciSearch, HttpRagBackend, TavilySearch};
pub use error::{IntegrationError, Result};
pub use llm::{SiumaiChatModel, SiumaiModelFactory};

use std::sync::Arc;
use tracing::info;

use yanjiu_core::{ProgressSink, ResearchSettings};
use yanjiu_research::{ResearchPipeline, ResearchPipelineBuilder};

/// Build a pipeline builder with every backend `settings` configures.
///
/// Set a progress sink or prompts on the returned builder before building.
pub async fn builder_from_settings(
    settings: &ResearchSettings,
) -> yanjiu_core::Result<ResearchPipelineBuilder> {
    settings.validate()?;

    let model = SiumaiModelFactory::new().create(&settings.llm).await?;
    let rag = HttpRagBackend::new(&settings.rag)?;
    let mut builder = ResearchPipeline::builder()
        .model(model)
        .rag(Arc::new(rag))
        .config(settings.pipeline.clone());

    if let Some(tavily) = &settings.tavily {
        builder = builder.web(Arc::new(TavilySearch::new(tavily.clone())?));
    }
    if let Some(eci) = &settings.eci {
        builder = builder.enterprise(Arc::new(EciSearch::new(eci.clone())?));
    }

    info!(
        web = settings.tavily.is_some(),
        eci = settings.eci.is_some(),
        "Pipeline backends configured"
    );
    Ok(builder)
}

/// Build a ready pipeline from `settings`.
pub async fn pipeline_from_settings(
    settings: &ResearchSettings,
) -> yanjiu_core::Result<ResearchPipeline> {
    builder_from_settings(settings).await?.build()
}

/// Build a ready pipeline from `settings` that reports progress to `progress`.
pub async fn pipeline_with_progress(
    settings: &ResearchSettings,
    progress: Arc<dyn ProgressSink>,
) -> yanjiu_core::Result<ResearchPipeline> {
    builder_from_settings(settings).await?.progress(progress).build()
}

/// Common imports.
pub mod prelude {
    pub use crate::backends::{EciSearch, HttpRagBackend, TavilySearch};
    pub use crate::error::IntegrationError;
    pub use crate::llm::{SiumaiChatModel, SiumaiModelFactory};
    pub use crate::{builder_from_settings, pipeline_from_settings, pipeline_with_progress};
}
