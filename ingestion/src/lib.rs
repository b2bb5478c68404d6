//! Ingestion Pipeline (C6) + Job Queue & Tracker (C7): converts free
//! text into idempotent graph/vector writes through Extract → Define →
//! Canonicalize → Write, behind an accept-and-return-immediately job
//! queue. Grounded throughout on the teacher's `ingestion-pipeline`
//! crate (`pipeline` module structure, `IngestionTask` status/retry
//! model) generalized from a document-ingestion assistant into a
//! lore-extraction pipeline over a closed ontology.

pub mod config;
pub mod context;
pub mod pipeline;
pub mod stages;
pub mod state;
pub mod tracker;
pub mod worker;

pub use config::{IngestionConfig, IngestionTuning};
pub use pipeline::IngestionPipeline;
pub use tracker::{JobTracker, JOB_STATUS_RETENTION};
pub use worker::{JobQueue, Submission};
