//! End-to-end research pipeline.
//!
//! A run has two stages. Stage one plans search queries for the topic.
//! Stage two retrieves answers for every query concurrently, drafts a
//! report, refines it through reflection rounds, and finalizes it with a
//! rendered Sources section.
//!
//! ```text
//! plan ─► retrieve (fan-out) ─► summarize ─► reflect × N ─► finalize
//! ```

use futures::Stream;
use itertools::Itertools;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{Instrument, info, info_span, instrument, warn};
use uuid::Uuid;

use yanjiu_core::{
    ChatModel, EnterpriseSearchBackend, GeneratedQuery, NoopProgress, PipelineConfig, ProgressKey,
    ProgressSink, RagBackend, ReportState, ResearchRequest, Result, WebSearchBackend, YanjiuError,
};

use crate::artifact::ArtifactAssistant;
use crate::finalizer::Finalizer;
use crate::planner::QueryPlanner;
use crate::prompts::PromptTemplates;
use crate::reflection::{ReflectionLoop, RoundOutcome};
use crate::relevancy::RelevancyGate;
use crate::retriever::MultiSourceRetriever;
use crate::sources::deduplicate_and_format_sources;
use crate::synthesizer::ReportSynthesizer;

const UPDATE_BUFFER: usize = 16;

/// Point in the pipeline a summary update comes from.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// The first draft written from the planned queries.
    InitialSynthesis,
    /// A reflection round, counted from 1.
    Reflection {
        /// Round number.
        round: usize,
    },
}

/// Progress of a streamed run, in pipeline order.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PipelineUpdate {
    /// Stage one finished.
    QueriesPlanned(Vec<GeneratedQuery>),
    /// Retrieval for the planned queries finished.
    ResearchCompleted {
        /// Raw citations gathered so far.
        citations: String,
    },
    /// The running summary changed.
    SummaryUpdated {
        /// Where the change came from.
        stage: Stage,
        /// The new running summary.
        running_summary: String,
    },
    /// The run finished.
    Finalized(ReportState),
    /// The run stopped early.
    Failed(String),
}

struct Updates<'a>(Option<&'a mpsc::Sender<PipelineUpdate>>);

impl Updates<'_> {
    /// Deliver an update. Returns false once the consumer has gone away.
    async fn send(&self, update: PipelineUpdate) -> bool {
        match self.0 {
            Some(tx) => tx.send(update).await.is_ok(),
            None => true,
        }
    }
}

/// The deep-research pipeline.
///
/// Cheap to clone: every collaborator is shared behind an [`Arc`].
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use yanjiu_core::prelude::*;
/// use yanjiu_research::pipeline::ResearchPipeline;
///
/// # async fn example(model: Arc<dyn ChatModel>, rag: Arc<dyn RagBackend>) -> Result<()> {
/// let pipeline = ResearchPipeline::builder()
///     .model(model)
///     .rag(rag)
///     .progress(Arc::new(TracingProgress))
///     .build()?;
///
/// let request = ResearchRequest::new("Grid-scale storage", "Intro, Costs, Outlook", "energy");
/// let state = pipeline.run(&request).await?;
/// println!("{}", state.final_report);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ResearchPipeline {
    model: Arc<dyn ChatModel>,
    retriever: MultiSourceRetriever,
    planner: QueryPlanner,
    synthesizer: ReportSynthesizer,
    reflection: ReflectionLoop,
    finalizer: Finalizer,
    prompts: Arc<PromptTemplates>,
    progress: Arc<dyn ProgressSink>,
    config: PipelineConfig,
}

impl ResearchPipeline {
    /// Create a builder.
    pub fn builder() -> ResearchPipelineBuilder {
        ResearchPipelineBuilder::new()
    }

    /// Pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// A request using this pipeline's default query and reflection counts.
    pub fn request<T, O, C>(
        &self,
        topic: T,
        report_organization: O,
        collection: C,
    ) -> ResearchRequest
    where
        T: Into<String>,
        O: Into<String>,
        C: Into<String>,
    {
        ResearchRequest::from_config(topic, report_organization, collection, &self.config)
    }

    /// The retriever used for every query.
    pub fn retriever(&self) -> &MultiSourceRetriever {
        &self.retriever
    }

    /// The reflection loop.
    pub fn reflection(&self) -> &ReflectionLoop {
        &self.reflection
    }

    /// An assistant for questions about reports this pipeline produced.
    pub fn artifact_assistant(&self) -> ArtifactAssistant {
        ArtifactAssistant::new(
            Arc::clone(&self.model),
            self.retriever.clone(),
            Arc::clone(&self.prompts),
            Arc::clone(&self.progress),
            self.config.clone(),
        )
    }

    /// Stage one: plan queries for a request.
    pub async fn generate_queries(&self, request: &ResearchRequest) -> Result<Vec<GeneratedQuery>> {
        let request = self.prepare(request)?;
        Ok(self.plan(&request).await)
    }

    /// Run both stages.
    ///
    /// Fails only if the request is invalid; every later problem degrades
    /// the report instead.
    #[instrument(skip_all, fields(run_id = %Uuid::new_v4(), topic = %request.topic))]
    pub async fn run(&self, request: &ResearchRequest) -> Result<ReportState> {
        let request = self.prepare(request)?;
        let queries = self.plan(&request).await;
        self.research(&request, queries, &Updates(None))
            .await
            .ok_or_else(|| YanjiuError::internal("Research run stopped without a consumer"))
    }

    /// Stage two on its own, for callers that reviewed or edited the plan.
    #[instrument(skip_all, fields(run_id = %Uuid::new_v4(), queries = queries.len()))]
    pub async fn run_with_queries(
        &self,
        request: &ResearchRequest,
        queries: Vec<GeneratedQuery>,
    ) -> Result<ReportState> {
        let request = self.prepare(request)?;
        self.research(&request, queries, &Updates(None))
            .await
            .ok_or_else(|| YanjiuError::internal("Research run stopped without a consumer"))
    }

    /// Run both stages in the background and stream their results.
    ///
    /// Updates arrive in pipeline order, each after its stage completes.
    /// Dropping the stream stops the run at its next update.
    pub fn run_stream(
        &self,
        request: ResearchRequest,
    ) -> impl Stream<Item = PipelineUpdate> + Send + Unpin + 'static {
        let (tx, rx) = mpsc::channel(UPDATE_BUFFER);
        let pipeline = self.clone();
        let span = info_span!("research_stream", run_id = %Uuid::new_v4(), topic = %request.topic);

        tokio::spawn(
            async move {
                let updates = Updates(Some(&tx));
                let request = match pipeline.prepare(&request) {
                    Ok(request) => request,
                    Err(e) => {
                        updates.send(PipelineUpdate::Failed(e.to_string())).await;
                        return;
                    }
                };

                let queries = pipeline.plan(&request).await;
                if !updates
                    .send(PipelineUpdate::QueriesPlanned(queries.clone()))
                    .await
                {
                    return;
                }

                if pipeline.research(&request, queries, &updates).await.is_none() {
                    info!("Update consumer dropped, stopping research");
                }
            }
            .instrument(span),
        );

        ReceiverStream::new(rx)
    }

    /// Retrieve answers for `queries` concurrently.
    ///
    /// Returns the source bundle XML for all queries and the digest of
    /// unique, non-empty citations in first-seen order.
    pub async fn web_research(
        &self,
        queries: &[GeneratedQuery],
        collection: &str,
        search_web: bool,
        search_eci: bool,
    ) -> (String, String) {
        let outcomes = self
            .retriever
            .process_queries(queries, collection, search_web, search_eci)
            .await;
        let (answers, citations): (Vec<String>, Vec<String>) = outcomes
            .into_iter()
            .map(|outcome| (outcome.answer, outcome.citation))
            .unzip();

        let bundle = deduplicate_and_format_sources(&citations, &answers, queries);
        let digest = citations
            .iter()
            .filter(|citation| !citation.is_empty())
            .unique()
            .join("\n");
        (bundle, digest)
    }

    fn prepare(&self, request: &ResearchRequest) -> Result<ResearchRequest> {
        let mut request = request.validated()?;
        if request.search_web && !self.retriever.has_web() {
            warn!("Web search requested but no web backend is configured; disabling");
            request.search_web = false;
        }
        if request.search_eci && !self.retriever.has_enterprise() {
            warn!("Enterprise search requested but no backend is configured; disabling");
            request.search_eci = false;
        }
        Ok(request)
    }

    async fn plan(&self, request: &ResearchRequest) -> Vec<GeneratedQuery> {
        self.planner
            .generate_queries(
                &request.topic,
                &request.report_organization,
                request.num_queries,
            )
            .await
    }

    /// Stage two. Returns `None` if the update consumer went away.
    async fn research(
        &self,
        request: &ResearchRequest,
        queries: Vec<GeneratedQuery>,
        updates: &Updates<'_>,
    ) -> Option<ReportState> {
        let (bundle, citations) = self
            .web_research(
                &queries,
                &request.collection,
                request.search_web,
                request.search_eci,
            )
            .await;

        let mut state = ReportState::with_queries(queries);
        state.web_research_results.push(bundle);
        state.citations = citations;
        if !updates
            .send(PipelineUpdate::ResearchCompleted {
                citations: state.citations.clone(),
            })
            .await
        {
            return None;
        }

        let latest = state.latest_research().unwrap_or_default().to_string();
        state.running_summary = self
            .synthesizer
            .summarize_report("", &latest, &request.report_organization)
            .await;
        self.progress
            .emit(ProgressKey::RunningSummary, &state.running_summary);
        if !updates
            .send(PipelineUpdate::SummaryUpdated {
                stage: Stage::InitialSynthesis,
                running_summary: state.running_summary.clone(),
            })
            .await
        {
            return None;
        }

        for round in 1..=request.num_reflections {
            if self.reflection.reflect_once(&mut state, request).await == RoundOutcome::Aborted {
                info!(round, "Reflection aborted");
                break;
            }
            if !updates
                .send(PipelineUpdate::SummaryUpdated {
                    stage: Stage::Reflection { round },
                    running_summary: state.running_summary.clone(),
                })
                .await
            {
                return None;
            }
        }

        self.finalizer
            .finalize(&state, &request.report_organization)
            .await
            .apply_to(&mut state);
        info!(len = state.final_report.len(), "Report finalized");

        if !updates.send(PipelineUpdate::Finalized(state.clone())).await {
            return None;
        }
        Some(state)
    }
}

/// Builder for [`ResearchPipeline`].
#[derive(Debug, Default)]
pub struct ResearchPipelineBuilder {
    model: Option<Arc<dyn ChatModel>>,
    rag: Option<Arc<dyn RagBackend>>,
    enterprise: Option<Arc<dyn EnterpriseSearchBackend>>,
    web: Option<Arc<dyn WebSearchBackend>>,
    progress: Option<Arc<dyn ProgressSink>>,
    config: Option<PipelineConfig>,
    prompts: Option<PromptTemplates>,
}

impl ResearchPipelineBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the chat model.
    #[must_use]
    pub fn model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Set the RAG backend.
    #[must_use]
    pub fn rag(mut self, rag: Arc<dyn RagBackend>) -> Self {
        self.rag = Some(rag);
        self
    }

    /// Set the enterprise search backend.
    #[must_use]
    pub fn enterprise(mut self, backend: Arc<dyn EnterpriseSearchBackend>) -> Self {
        self.enterprise = Some(backend);
        self
    }

    /// Set the web search backend.
    #[must_use]
    pub fn web(mut self, backend: Arc<dyn WebSearchBackend>) -> Self {
        self.web = Some(backend);
        self
    }

    /// Set the progress sink. Defaults to [`NoopProgress`].
    #[must_use]
    pub fn progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Set the pipeline configuration.
    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replace the prompt templates.
    #[must_use]
    pub fn prompts(mut self, prompts: PromptTemplates) -> Self {
        self.prompts = Some(prompts);
        self
    }

    /// Build the pipeline.
    pub fn build(self) -> Result<ResearchPipeline> {
        let model = self
            .model
            .ok_or_else(|| YanjiuError::configuration("Chat model is required"))?;
        let rag = self
            .rag
            .ok_or_else(|| YanjiuError::configuration("RAG backend is required"))?;
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let progress: Arc<dyn ProgressSink> =
            self.progress.unwrap_or_else(|| Arc::new(NoopProgress));
        let prompts = Arc::new(self.prompts.unwrap_or_default());

        let gate = RelevancyGate::new(
            Arc::clone(&model),
            Arc::clone(&prompts),
            Arc::clone(&progress),
            config.relevancy_timeout(),
        );
        let retriever = MultiSourceRetriever::new(rag, gate, Arc::clone(&progress))
            .with_enterprise(self.enterprise)
            .with_web(self.web)
            .with_backend_timeout(config.backend_timeout())
            .with_web_score_threshold(config.web_score_threshold);
        let planner = QueryPlanner::new(
            Arc::clone(&model),
            Arc::clone(&prompts),
            Arc::clone(&progress),
            config.llm_timeout(),
        );
        let synthesizer = ReportSynthesizer::new(
            Arc::clone(&model),
            Arc::clone(&prompts),
            Arc::clone(&progress),
            config.llm_timeout(),
        );
        let reflection = ReflectionLoop::new(
            Arc::clone(&model),
            retriever.clone(),
            synthesizer.clone(),
            Arc::clone(&prompts),
            Arc::clone(&progress),
            config.llm_timeout(),
        );
        let finalizer = Finalizer::new(
            Arc::clone(&model),
            Arc::clone(&prompts),
            Arc::clone(&progress),
            config.finalize_timeout(),
        );

        info!(
            model = model.model_name(),
            web = retriever.has_web(),
            eci = retriever.has_enterprise(),
            "Research pipeline built"
        );

        Ok(ResearchPipeline {
            model,
            retriever,
            planner,
            synthesizer,
            reflection,
            finalizer,
            prompts,
            progress,
            config,
        })
    }
}
