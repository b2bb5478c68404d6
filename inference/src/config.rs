//! Tunables for the inference workflow. Grounded on the teacher's
//! `retrieval-pipeline::pipeline::config::PipelineConfig`.

/// Minimum lowercased token length kept as a Historian keyword term
/// (spec.md §4.8).
pub const KEYWORD_MIN_LEN: usize = 4;

/// Caps the number of keyword terms the Historian searches the graph
/// with per query, so a long query can't fan out unboundedly.
pub const KEYWORD_CAP: usize = 8;

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub max_iterations: u32,
    pub vector_k: usize,
    pub vector_min_score: f32,
    pub graph_keyword_limit: u32,
    pub narrator_max_tokens: u32,
    pub query_deadline_ms: u64,
    pub lm_request_deadline_ms: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            vector_k: 5,
            vector_min_score: 0.7,
            graph_keyword_limit: 5,
            narrator_max_tokens: 2048,
            query_deadline_ms: 30_000,
            lm_request_deadline_ms: 20_000,
        }
    }
}

impl InferenceConfig {
    #[must_use]
    pub fn from_ace_config(config: &common::config::AceConfig) -> Self {
        Self {
            max_iterations: config.max_inference_iterations,
            query_deadline_ms: config.query_deadline,
            lm_request_deadline_ms: config.lm_request_deadline,
            ..Self::default()
        }
    }
}
