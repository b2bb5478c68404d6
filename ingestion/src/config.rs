//! Tunables for the EDC pipeline. Grounded on the teacher's
//! `ingestion-pipeline::pipeline::config::{IngestionConfig,
//! IngestionTuning}`.

#[derive(Debug, Clone)]
pub struct IngestionTuning {
    pub extraction_temperature: f32,
    pub extraction_max_tokens: u32,
    pub graph_store_attempts: usize,
    pub graph_initial_backoff_ms: u64,
    pub graph_max_backoff_ms: u64,
    /// Merge threshold from spec.md §4.6: an attribute is overwritten
    /// during Canonicalize only if empty/missing, or the incoming
    /// entity's confidence exceeds this.
    pub merge_confidence_threshold: f64,
    /// Whether the Write stage embeds source text and entity
    /// descriptions through the vector adapter (spec.md §4.6: "optionally
    /// embed").
    pub embed_on_write: bool,
}

impl Default for IngestionTuning {
    fn default() -> Self {
        Self {
            extraction_temperature: 0.3,
            extraction_max_tokens: 4096,
            graph_store_attempts: 3,
            graph_initial_backoff_ms: 50,
            graph_max_backoff_ms: 800,
            merge_confidence_threshold: 0.7,
            embed_on_write: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IngestionConfig {
    pub tuning: IngestionTuning,
}
