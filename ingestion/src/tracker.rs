//! Job Queue & Tracker (C7): in-memory job status with at-least-one-hour
//! retention past completion and concurrent-read-safe updates. Grounded
//! on the teacher's `IngestionTask` status model (`Created`,
//! `InProgress`, `Completed`, `Error`) generalized into ACE's
//! `JobStatus`, and on its `get_unfinished_tasks`/reaper-style cleanup,
//! but held in a process-local map rather than the graph store — spec.md
//! §3's Non-goals exclude durable cross-restart persistence for job
//! status.

use common::ids::{JobId, Timestamp};
use common::model::IngestionJob;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::interval;
use tracing::{debug, info};

/// Default retention window past `completed_at` (spec.md §4.7: "at least
/// one hour").
pub const JOB_STATUS_RETENTION: Duration = Duration::from_secs(3600);

/// Fine-grained status map. Writes happen only at stage boundaries inside
/// the worker that owns a job, so concurrent status reads never observe
/// a torn update — they see either the pre- or post-stage snapshot
/// (spec.md §4.7).
#[derive(Clone)]
pub struct JobTracker {
    jobs: Arc<RwLock<HashMap<JobId, IngestionJob>>>,
    retention: Duration,
}

impl JobTracker {
    #[must_use]
    pub fn new(retention: Duration) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            retention,
        }
    }

    pub async fn insert(&self, job: IngestionJob) {
        self.jobs.write().await.insert(job.job_id, job);
    }

    pub async fn get(&self, job_id: JobId) -> Option<IngestionJob> {
        self.jobs.read().await.get(&job_id).cloned()
    }

    /// Evicts every job whose `completed_at` is older than `retention`.
    /// Jobs still running (`completed_at.is_none()`) are never evicted.
    pub async fn reap(&self, now: Timestamp) {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| match job.completed_at {
            None => true,
            Some(completed_at) => {
                now.signed_duration_since(completed_at).num_seconds()
                    < i64::try_from(self.retention.as_secs()).unwrap_or(i64::MAX)
            }
        });
        let evicted = before - jobs.len();
        if evicted > 0 {
            debug!(evicted, remaining = jobs.len(), "reaped completed jobs past retention");
        }
    }

    /// Spawns a background loop that reaps on `period`, for the life of
    /// the returned `JoinHandle`'s owner.
    pub fn spawn_reaper(&self, period: Duration) -> tokio::task::JoinHandle<()> {
        let tracker = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                ticker.tick().await;
                tracker.reap(chrono::Utc::now()).await;
            }
        })
    }
}

impl Default for JobTracker {
    fn default() -> Self {
        info!(retention_secs = JOB_STATUS_RETENTION.as_secs(), "job tracker initialized");
        Self::new(JOB_STATUS_RETENTION)
    }
}
