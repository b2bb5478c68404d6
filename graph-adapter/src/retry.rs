//! Bounded retry policy for the Graph Adapter (spec.md §4.2 failure modes):
//! transient connection errors get up to 3 tries with exponential backoff
//! starting at 100ms; deadlocks retry once then fail.

use common::error::AceError;
use std::future::IntoFuture;
use tokio_retry::strategy::ExponentialBackoff;

const MAX_TRIES: usize = 3;
const BASE_DELAY_MS: u64 = 100;

fn is_deadlock(err: &surrealdb::Error) -> bool {
    err.to_string().to_lowercase().contains("deadlock")
}

/// Runs `op`, retrying transient failures with exponential backoff
/// (100ms, 200ms, ...) up to [`MAX_TRIES`] total attempts. A deadlock is
/// retried exactly once regardless of how many attempts remain. Anything
/// else is returned immediately.
///
/// `op` returns anything that can be turned into a future yielding a
/// `surrealdb::Error` on failure — this covers both plain `async fn`
/// calls and SurrealDB's query-builder types, which implement
/// `IntoFuture` rather than `Future` directly.
pub async fn with_retry<F, Fut, T>(op: F) -> Result<T, surrealdb::Error>
where
    F: Fn() -> Fut,
    Fut: IntoFuture<Output = Result<T, surrealdb::Error>>,
{
    let mut backoff = ExponentialBackoff::from_millis(BASE_DELAY_MS).take(MAX_TRIES - 1);
    let mut deadlock_retried = false;

    loop {
        match op().into_future().await {
            Ok(value) => return Ok(value),
            Err(err) if is_deadlock(&err) && !deadlock_retried => {
                deadlock_retried = true;
                continue;
            }
            Err(err) => match backoff.next() {
                Some(delay) => tokio::time::sleep(delay).await,
                None => return Err(err),
            },
        }
    }
}

/// Maps a raw `surrealdb::Error` to the adapter's error taxonomy,
/// distinguishing `SchemaError` (constraint violation) from
/// `BackendUnavailable` (everything else transient).
#[must_use]
pub fn classify(err: surrealdb::Error) -> AceError {
    let text = err.to_string();
    if text.to_lowercase().contains("already contains") || text.to_lowercase().contains("constraint") {
        AceError::SchemaError(text)
    } else {
        AceError::BackendUnavailable(text)
    }
}
