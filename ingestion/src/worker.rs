//! Bounded worker pool and submission queue (spec.md §4.7). Grounded on
//! the teacher's `ingestion-pipeline::run_worker_loop`
//! (idle-backoff-on-empty-queue poll loop over a store) but driving a
//! bounded `tokio::sync::mpsc` channel directly, since ACE's tracker has
//! no durable store to poll — a dropped-sender/closed-channel is the
//! only "nothing to do" signal a push-based queue needs.

use crate::pipeline::IngestionPipeline;
use crate::tracker::JobTracker;
use common::error::{AceError, AceResult};
use common::ids::{JobId, Timestamp};
use common::model::{IngestionJob, JobStatus, StageDurations};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// A caller's ingestion request: `{ text, source_id?, metadata? }`
/// (spec.md §4.7).
#[derive(Debug, Clone)]
pub struct Submission {
    pub text: String,
    pub source_id: Option<String>,
    pub metadata: HashMap<String, serde_json::Value>,
}

struct WorkItem {
    job_id: JobId,
    submission: Submission,
    created_at: Timestamp,
}

fn pending_job(job_id: JobId, created_at: Timestamp) -> IngestionJob {
    IngestionJob {
        job_id,
        status: JobStatus::Pending,
        durations: StageDurations::default(),
        entities_created: 0,
        relationships_created: 0,
        errors: Vec::new(),
        total_ms: 0,
        created_at,
        completed_at: None,
    }
}

/// Accepts submissions and returns a fresh `job_id` immediately; a fixed
/// pool of workers drains a bounded channel behind it. One worker ever
/// claims a given job (the channel hands each item to exactly one
/// receiver), and the tracker is updated only at job start and job end,
/// so a job is never processed twice and status reads never observe a
/// half-updated record.
pub struct JobQueue {
    tracker: JobTracker,
    sender: mpsc::Sender<WorkItem>,
}

impl JobQueue {
    /// Spawns `worker_count` loops pulling from a channel of capacity
    /// `queue_capacity` and returns the queue handle plus the workers'
    /// join handles (callers decide whether/how to await shutdown).
    #[must_use]
    pub fn spawn(
        pipeline: Arc<IngestionPipeline>,
        tracker: JobTracker,
        worker_count: usize,
        queue_capacity: usize,
    ) -> (Self, Vec<JoinHandle<()>>) {
        let (sender, receiver) = mpsc::channel(queue_capacity);
        let receiver = Arc::new(Mutex::new(receiver));

        let mut handles = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let pipeline = Arc::clone(&pipeline);
            let tracker = tracker.clone();
            let receiver = Arc::clone(&receiver);
            handles.push(tokio::spawn(async move {
                Self::run_worker_loop(worker_id, pipeline, tracker, receiver).await;
            }));
        }

        (Self { tracker, sender }, handles)
    }

    async fn run_worker_loop(
        worker_id: usize,
        pipeline: Arc<IngestionPipeline>,
        tracker: JobTracker,
        receiver: Arc<Mutex<mpsc::Receiver<WorkItem>>>,
    ) {
        loop {
            let item = {
                let mut receiver = receiver.lock().await;
                receiver.recv().await
            };

            let Some(item) = item else {
                info!(worker_id, "job queue closed, worker exiting");
                return;
            };

            info!(worker_id, job_id = %item.job_id, "worker claimed job");
            let mut running = pending_job(item.job_id, item.created_at);
            running.status = JobStatus::Running;
            tracker.insert(running).await;

            let job = pipeline
                .run(
                    item.job_id,
                    item.submission.text,
                    item.submission.source_id,
                    item.submission.metadata,
                    item.created_at,
                )
                .await;

            if job.status == JobStatus::Failed {
                warn!(worker_id, job_id = %item.job_id, errors = ?job.errors, "job failed");
            }
            tracker.insert(job).await;
        }
    }

    /// Validates and accepts a submission, returning the assigned
    /// `job_id` immediately. Rejects synchronously when `text` is empty
    /// (spec.md §4.7), and rejects with a retry-after signal when the
    /// queue buffer is full rather than blocking the caller until a
    /// worker frees up (spec.md §5: "the queue rejects submissions when
    /// the worker pool and queue buffer are both full").
    pub async fn submit(&self, submission: Submission) -> AceResult<JobId> {
        if submission.text.trim().is_empty() {
            return Err(AceError::Validation("submission text must not be empty".to_string()));
        }

        let job_id = JobId::new();
        let created_at = chrono::Utc::now();

        self.sender
            .try_send(WorkItem {
                job_id,
                submission,
                created_at,
            })
            .map_err(|err| match err {
                mpsc::error::TrySendError::Full(_) => {
                    AceError::BackendUnavailable("job queue is full, retry after backoff".to_string())
                }
                mpsc::error::TrySendError::Closed(_) => {
                    AceError::BackendUnavailable("job queue has no running workers".to_string())
                }
            })?;

        self.tracker.insert(pending_job(job_id, created_at)).await;
        Ok(job_id)
    }

    pub async fn status(&self, job_id: JobId) -> Option<IngestionJob> {
        self.tracker.get(job_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_empty_text_synchronously_without_enqueueing() {
        let tracker = JobTracker::new(std::time::Duration::from_secs(60));
        let (sender, _receiver) = mpsc::channel(1);
        let queue = JobQueue { tracker, sender };

        let result = queue
            .submit(Submission {
                text: "   ".to_string(),
                source_id: None,
                metadata: HashMap::new(),
            })
            .await;

        assert!(matches!(result, Err(AceError::Validation(_))));
    }

    #[tokio::test]
    async fn rejects_when_queue_buffer_is_full() {
        let tracker = JobTracker::new(std::time::Duration::from_secs(60));
        let (sender, _receiver) = mpsc::channel(1);
        let queue = JobQueue { tracker, sender };

        let first = queue
            .submit(Submission {
                text: "first submission".to_string(),
                source_id: None,
                metadata: HashMap::new(),
            })
            .await;
        assert!(first.is_ok());

        let second = queue
            .submit(Submission {
                text: "second submission".to_string(),
                source_id: None,
                metadata: HashMap::new(),
            })
            .await;
        assert!(matches!(second, Err(AceError::BackendUnavailable(_))));
    }
}
