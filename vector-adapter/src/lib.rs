//! Vector Adapter (C3): embedding generation (delegated to the LM
//! Adapter) and nearest-neighbor search with metadata. Grounded on the
//! teacher's `find_items_by_vector_similarity`
//! (`composite-retrieval/src/vector.rs`, `<|k,40|>` HNSW operator) and
//! score-fusion helpers (`composite-retrieval/src/scoring.rs`),
//! generalized into a collection-based store keyed by caller-supplied
//! ids rather than the teacher's fixed `knowledge_entity`/`text_chunk`
//! tables.

pub mod cache;
pub mod fake;
pub mod surreal;

use async_trait::async_trait;
use common::error::AceResult;
pub use fake::FakeVectorStore;
pub use surreal::SurrealVectorAdapter;

/// The collection ingested source passages are embedded into at Write
/// time (spec.md §4.6) and the Historian vector-searches at query time
/// (spec.md §4.8) — one constant shared by both sides so "future semantic
/// recall" actually recalls what ingestion wrote.
pub const LORE_COLLECTION: &str = "lore";

/// The collection each canonical entity's salient description is embedded
/// into at Write time (spec.md §4.6).
pub const ENTITY_COLLECTION: &str = "entity_descriptions";

#[derive(Debug, Clone)]
pub struct VectorHit {
    pub id: String,
    pub score: f32,
    pub metadata: serde_json::Value,
}

/// Embedding generation and nearest-neighbor search with metadata
/// (spec.md §4.3). Does not cache embeddings by default — see
/// [`cache::EmbeddingCache`] for the pluggable opt-in.
#[async_trait]
pub trait VectorAdapter: Send + Sync {
    async fn embed(&self, texts: &[String]) -> AceResult<Vec<Vec<f32>>>;

    async fn upsert(
        &self,
        collection: &str,
        id: &str,
        vector: Vec<f32>,
        metadata: serde_json::Value,
    ) -> AceResult<()>;

    /// Returns hits sorted by descending score, truncated at `k` and
    /// `min_score`.
    async fn search(
        &self,
        collection: &str,
        query_vector: &[f32],
        k: usize,
        min_score: f32,
    ) -> AceResult<Vec<VectorHit>>;
}

/// `score = clamp01(1 / (1 + distance))`, the same distance-to-similarity
/// conversion the teacher's `composite-retrieval::scoring` module uses.
#[must_use]
pub fn distance_to_similarity(distance: f32) -> f32 {
    if !distance.is_finite() {
        return 0.0;
    }
    (1.0 / (1.0 + distance.max(0.0))).clamp(0.0, 1.0)
}
