//! Run a streamed research job and print each update.
//!
//! ```bash
//! RUST_LOG=yanjiu=debug cargo run --example deep_research -- research.json "Grid-scale storage"
//! ```
//!
//! Without a config path, settings are read from `YANJIU_*` environment
//! variables.

use std::sync::Arc;

use anyhow::Result;
use futures::StreamExt;
use tracing::info;
use tracing_subscriber::EnvFilter;
use yanjiu::prelude::*;

const DEFAULT_TOPIC: &str = "Recent advances in grid-scale battery storage";
const DEFAULT_ORGANIZATION: &str = "1. Introduction\n2. Technologies\n3. Costs\n4. Outlook";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("yanjiu=info".parse()?))
        .init();

    let mut args = std::env::args().skip(1);
    let settings = match args.next() {
        Some(path) => ConfigLoader::new().load_json_file(path).await?,
        None => ResearchSettings::from_env()?,
    };
    let topic = args.next().unwrap_or_else(|| DEFAULT_TOPIC.to_string());

    let pipeline = pipeline_with_progress(&settings, Arc::new(TracingProgress)).await?;
    let request = pipeline
        .request(topic, DEFAULT_ORGANIZATION, "default")
        .with_web_search(settings.tavily.is_some())
        .with_enterprise_search(settings.eci.is_some());

    let mut updates = pipeline.run_stream(request);
    while let Some(update) = updates.next().await {
        match update {
            PipelineUpdate::QueriesPlanned(queries) => {
                for query in &queries {
                    info!(section = %query.report_section(), "Planned: {}", query.query());
                }
            }
            PipelineUpdate::ResearchCompleted { citations } => {
                info!(len = citations.len(), "Research completed");
            }
            PipelineUpdate::SummaryUpdated { stage, .. } => {
                info!(stage = %serde_json::to_string(&stage)?, "Summary updated");
            }
            PipelineUpdate::Finalized(state) => {
                println!("{}", state.final_report);
            }
            PipelineUpdate::Failed(message) => {
                anyhow::bail!("research failed: {message}");
            }
        }
    }

    Ok(())
}
