//! Pluggable embedding cache (spec.md §4.3: "does not cache embeddings by
//! default"). A no-op implementation is the default; callers that want
//! memoization provide their own (e.g. an in-memory LRU keyed by text
//! hash) without the adapter needing to know about it.

use async_trait::async_trait;

#[async_trait]
pub trait EmbeddingCache: Send + Sync {
    async fn get(&self, text: &str) -> Option<Vec<f32>>;
    async fn put(&self, text: &str, vector: Vec<f32>);
}

/// Caches nothing; every call is a miss. The adapter's default.
pub struct NoopCache;

#[async_trait]
impl EmbeddingCache for NoopCache {
    async fn get(&self, _text: &str) -> Option<Vec<f32>> {
        None
    }

    async fn put(&self, _text: &str, _vector: Vec<f32>) {}
}
