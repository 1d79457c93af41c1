//! # Yanjiu - Deep Research Pipelines
//!
//! Yanjiu turns a topic and a desired report outline into a cited research
//! report. It plans search queries with an LLM, answers each one from a RAG
//! collection (falling back to enterprise and web search when the answer is
//! judged irrelevant), writes a draft, refines it over reflection rounds and
//! appends a numbered Sources section.
//!
//! ## Quick Start
//!
//! ```rust
//! use yanjiu::prelude::*;
//!
//! let request = ResearchRequest::new("Grid-scale storage", "Intro, Costs, Outlook", "energy")
//!     .with_num_queries(4)
//!     .with_web_search(true);
//!
//! assert_eq!(request.num_reflections, 2);
//! assert!(request.validated().is_ok());
//! ```
//!
//! ## Architecture
//!
//! - **yanjiu-core**: Traits, data types, configuration and sanitization
//! - **yanjiu-research**: Pipeline stages and the orchestrator
//! - **yanjiu-integrations**: siumai chat models and HTTP search backends

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export all public APIs from sub-crates
pub use yanjiu_core as core;
pub use yanjiu_integrations as integrations;
pub use yanjiu_research as research;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and traits
/// from all Yanjiu crates.
pub mod prelude {
    pub use yanjiu_core::prelude::*;
    pub use yanjiu_integrations::prelude::*;
    pub use yanjiu_research::prelude::*;
}

/// Version information for the Yanjiu crates.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
