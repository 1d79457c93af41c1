//! Configuration for the research pipeline and its collaborators.
//!
//! Settings can be built in code with the `with_*` builders, loaded from a
//! JSON file with environment variable substitution, or read entirely from
//! `YANJIU_*` environment variables.

pub mod backend;
pub mod llm;
pub mod loader;
pub mod pipeline;

pub use backend::{EciConfig, RagConfig, TavilyConfig};
pub use llm::LlmConfig;
pub use loader::{ConfigLoader, ResearchSettings};
pub use pipeline::PipelineConfig;

use crate::{Result, YanjiuError};

fn validate_http_url(what: &str, url: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(YanjiuError::configuration(format!(
            "{what} must start with http:// or https://"
        )))
    }
}
