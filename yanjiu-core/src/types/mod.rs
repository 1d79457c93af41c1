//! Core data types for Yanjiu.
//!
//! This module contains the data passed between pipeline stages: queries,
//! retrieval records, the report state, chat messages and the artifact Q&A
//! input and output.

pub mod artifact;
pub mod message;
pub mod query;
pub mod source;
pub mod state;

// Re-export all types for convenience
pub use artifact::*;
pub use message::*;
pub use query::*;
pub use source::*;
pub use state::*;
