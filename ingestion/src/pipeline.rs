//! Drives one ingestion job through Extract → Define → Canonicalize →
//! Write, timing each stage and rolling the outcome up into an
//! [`IngestionJob`]. Grounded on the teacher's `ingestion-pipeline::
//! pipeline::IngestionPipeline::drive_pipeline` (one `Instant` per stage,
//! a single `info!` summary line, `ctx.abort(err)` on any stage failure).

use crate::config::IngestionConfig;
use crate::context::PipelineContext;
use crate::stages;
use crate::state::ready;
use common::error::AceError;
use common::ids::JobId;
use common::model::{IngestionJob, JobStatus, StageDurations};
use graph_adapter::GraphAdapter;
use lm_adapter::LmAdapter;
use prompt_registry::PromptRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use vector_adapter::VectorAdapter;

fn duration_millis(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

pub struct IngestionPipeline {
    graph: Arc<dyn GraphAdapter>,
    vector: Arc<dyn VectorAdapter>,
    lm: Arc<dyn LmAdapter>,
    prompts: Arc<PromptRegistry>,
    config: IngestionConfig,
}

impl IngestionPipeline {
    #[must_use]
    pub fn new(
        graph: Arc<dyn GraphAdapter>,
        vector: Arc<dyn VectorAdapter>,
        lm: Arc<dyn LmAdapter>,
        prompts: Arc<PromptRegistry>,
        config: IngestionConfig,
    ) -> Self {
        Self {
            graph,
            vector,
            lm,
            prompts,
            config,
        }
    }

    /// Runs the full EDC pipeline for one submission and returns the
    /// completed job record. A fatal error at any stage is folded into a
    /// `failed` job rather than propagated — the job queue tracker always
    /// gets a terminal record to show the caller.
    #[tracing::instrument(skip_all, fields(job_id = %job_id))]
    pub async fn run(
        &self,
        job_id: JobId,
        source_text: String,
        source_id: Option<String>,
        metadata: HashMap<String, serde_json::Value>,
        created_at: common::ids::Timestamp,
    ) -> IngestionJob {
        let mut ctx = PipelineContext::new(&self.config, source_text, source_id.clone(), metadata);
        let pipeline_started = Instant::now();
        let mut durations = StageDurations::default();
        let mut fatal: Option<AceError> = None;

        let stage_start = Instant::now();
        let machine = ready();
        let machine = match stages::extract(machine, &mut ctx, self.lm.as_ref(), self.prompts.as_ref()).await {
            Ok(m) => Some(m),
            Err(err) => {
                fatal = Some(err);
                None
            }
        };
        durations.extract_ms = duration_millis(stage_start.elapsed());

        let machine = if let Some(m) = machine {
            let stage_start = Instant::now();
            let result = stages::define(m, &mut ctx);
            durations.define_ms = duration_millis(stage_start.elapsed());
            match result {
                Ok(m) => Some(m),
                Err(err) => {
                    fatal = Some(err);
                    None
                }
            }
        } else {
            None
        };

        let machine = if let Some(m) = machine {
            let stage_start = Instant::now();
            let result = stages::canonicalize(m, &mut ctx);
            durations.canonicalize_ms = duration_millis(stage_start.elapsed());
            match result {
                Ok(m) => Some(m),
                Err(err) => {
                    fatal = Some(err);
                    None
                }
            }
        } else {
            None
        };

        if let Some(m) = machine {
            let stage_start = Instant::now();
            let result = stages::write(
                m,
                &mut ctx,
                self.graph.as_ref(),
                self.vector.as_ref(),
                source_id.as_deref(),
            )
            .await;
            durations.write_ms = duration_millis(stage_start.elapsed());
            if let Err(err) = result {
                fatal = Some(err);
            }
        }

        let total_ms = duration_millis(pipeline_started.elapsed());
        // `entities_written`/`relationships_written` count only *new*
        // records (see stages::write) — a re-ingest of already-known lore
        // legitimately writes zero of either and still completes. Only an
        // empty canonicalization result (nothing survived to attempt a
        // write at all) is grounds for failure here.
        let status = if fatal.is_some() {
            JobStatus::Failed
        } else if ctx.canonical_entities.is_empty() {
            JobStatus::Failed
        } else if ctx.warnings.is_empty() {
            JobStatus::Completed
        } else {
            JobStatus::Partial
        };

        let mut errors = ctx.warnings;
        if let Some(err) = &fatal {
            errors.push(err.to_string());
        }

        info!(
            job_id = %job_id,
            status = ?status,
            total_ms,
            extract_ms = durations.extract_ms,
            define_ms = durations.define_ms,
            canonicalize_ms = durations.canonicalize_ms,
            write_ms = durations.write_ms,
            entities_written = ctx.entities_written,
            relationships_written = ctx.relationships_written,
            "ingestion pipeline finished"
        );

        IngestionJob {
            job_id,
            status,
            durations,
            entities_created: ctx.entities_written,
            relationships_created: ctx.relationships_written,
            errors,
            total_ms,
            created_at,
            completed_at: Some(chrono::Utc::now()),
        }
    }
}
