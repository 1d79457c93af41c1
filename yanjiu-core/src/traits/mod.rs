//! Collaborator traits for the research pipeline.
//!
//! The pipeline talks to the outside world only through these traits, so
//! every stage can be driven by a scripted model and in-memory backends in
//! tests.

pub mod backend;
pub mod llm;
pub mod progress;

// Re-export all traits for convenience
pub use backend::*;
pub use llm::*;
pub use progress::*;
