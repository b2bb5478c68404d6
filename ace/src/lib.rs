//! Binary-entry-point facade (spec.md §5 EXPANDED): wires the adapters,
//! ingestion pipeline/job queue, and inference workflow into one
//! `AceApp`, grounded on the teacher's `main/src/main.rs` construction
//! order (db client → embedding provider → pipelines → router state) but
//! built for a library consumer rather than an Axum router — spec.md §1
//! keeps the HTTP gateway out of scope, so this crate exposes the same
//! job-submission and query surface as plain async methods for an
//! external gateway to call directly.

use common::config::AceConfig;
use common::error::AceResult;
use common::ids::JobId;
use common::model::IngestionJob;
use graph_adapter::{GraphAdapter, SurrealGraphAdapter};
use inference::{InferenceConfig, InferenceResponse, InferenceWorkflow};
use ingestion::{IngestionConfig, IngestionPipeline, JobQueue, JobTracker, Submission};
use lm_adapter::{LmAdapter, OpenAiLmAdapter};
use prompt_registry::PromptRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use vector_adapter::{SurrealVectorAdapter, VectorAdapter};

/// Everything a gateway needs to accept ingestion submissions, poll job
/// status, and answer inference queries. Construction order mirrors the
/// teacher's `main`/`worker` binaries: connect the graph store, build
/// the LM and vector adapters on top of it, load prompts, then wire the
/// ingestion queue and inference workflow over the same adapter set.
pub struct AceApp {
    queue: JobQueue,
    workflow: InferenceWorkflow,
    worker_handles: Vec<JoinHandle<()>>,
}

impl AceApp {
    /// Connects to the graph/vector/LM backends named in `config` and
    /// spawns `config.ingestion_workers` ingestion workers.
    pub async fn connect(config: &AceConfig) -> AceResult<Self> {
        let graph: Arc<dyn GraphAdapter> = Arc::new(
            SurrealGraphAdapter::connect(&config.graph_uri, "ace", "ace", &config.graph_user, &config.graph_password)
                .await?,
        );

        let lm: Arc<dyn LmAdapter> = Arc::new(OpenAiLmAdapter::new(
            &std::env::var("LM_API_KEY").unwrap_or_default(),
            &config.lm_host,
            &config.lm_model,
            &config.lm_embed_model,
        ));

        let vector_client = surrealdb::engine::any::connect(&config.vector_url)
            .await
            .map_err(|e| common::error::AceError::BackendUnavailable(e.to_string()))?;
        let vector: Arc<dyn VectorAdapter> = Arc::new(SurrealVectorAdapter::new(vector_client, lm.clone()));

        let prompts = Arc::new(PromptRegistry::load_embedded());

        let pipeline = Arc::new(IngestionPipeline::new(
            graph.clone(),
            vector.clone(),
            lm.clone(),
            prompts.clone(),
            IngestionConfig::default(),
        ));
        let tracker = JobTracker::new(Duration::from_secs(config.job_status_retention));
        let reaper_handle = tracker.spawn_reaper(Duration::from_secs(60));
        let (queue, mut worker_handles) =
            JobQueue::spawn(pipeline, tracker, config.ingestion_workers as usize, 256);
        worker_handles.push(reaper_handle);

        let workflow = InferenceWorkflow::new(graph, vector, lm, prompts, InferenceConfig::from_ace_config(config));

        Ok(AceApp {
            queue,
            workflow,
            worker_handles,
        })
    }

    /// Accepts an ingestion submission and returns the assigned job id
    /// immediately (spec.md §6 "Ingestion submission").
    pub async fn submit_ingestion(&self, submission: Submission) -> AceResult<JobId> {
        self.queue.submit(submission).await
    }

    /// Reads the current status of a job, if it is still within its
    /// retention window (spec.md §6 "Job status query").
    pub async fn job_status(&self, job_id: JobId) -> Option<IngestionJob> {
        self.queue.status(job_id).await
    }

    /// Runs one inference query through Historian → Narrator → Checker
    /// (spec.md §6 "Inference query").
    pub async fn query(&self, query: &str) -> AceResult<InferenceResponse> {
        self.workflow.run(query).await
    }

    /// Join handles for the spawned ingestion workers, for callers that
    /// want to await a graceful shutdown.
    pub fn worker_handles(&mut self) -> &mut Vec<JoinHandle<()>> {
        &mut self.worker_handles
    }
}
