//! Ingestion worker binary (spec.md §5 EXPANDED), grounded on the
//! teacher's `main/src/worker.rs` standalone worker process. Connects the
//! real adapters, then blocks forever driving the bounded ingestion
//! worker pool; a gateway process elsewhere calls `AceApp::submit_ingestion`
//! over whatever transport it exposes (out of scope here).

use ace::AceApp;
use common::config::get_config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let config = get_config()?;
    let mut app = AceApp::connect(&config).await?;

    tracing::info!(workers = config.ingestion_workers, "ace-worker pool started");

    for handle in app.worker_handles().drain(..) {
        handle.await?;
    }

    Ok(())
}
