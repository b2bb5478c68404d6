//! In-memory [`VectorAdapter`] for tests that must run without a
//! SurrealDB dependency. Linear-scan cosine similarity over a
//! `Vec`-backed store per collection, grounded on the same
//! `find_items_by_vector_similarity` shape [`SurrealVectorAdapter`]
//! implements, minus the HNSW index — fine at test scale.

use crate::{VectorAdapter, VectorHit};
use async_trait::async_trait;
use common::error::AceResult;
use lm_adapter::LmAdapter;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

struct StoredVector {
    id: String,
    vector: Vec<f32>,
    metadata: serde_json::Value,
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len().min(b.len());
    if len == 0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Embeds through the `lm` it was built with and keeps every collection
/// as a flat, append-or-replace `Vec<StoredVector>`.
pub struct FakeVectorStore {
    lm: Arc<dyn LmAdapter>,
    collections: RwLock<HashMap<String, Vec<StoredVector>>>,
}

impl FakeVectorStore {
    #[must_use]
    pub fn new(lm: Arc<dyn LmAdapter>) -> Self {
        Self {
            lm,
            collections: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl VectorAdapter for FakeVectorStore {
    async fn embed(&self, texts: &[String]) -> AceResult<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.lm.embed(text).await?);
        }
        Ok(vectors)
    }

    async fn upsert(
        &self,
        collection: &str,
        id: &str,
        vector: Vec<f32>,
        metadata: serde_json::Value,
    ) -> AceResult<()> {
        let mut collections = self.collections.write().unwrap_or_else(|e| e.into_inner());
        let entries = collections.entry(collection.to_string()).or_default();
        entries.retain(|e| e.id != id);
        entries.push(StoredVector {
            id: id.to_string(),
            vector,
            metadata,
        });
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query_vector: &[f32],
        k: usize,
        min_score: f32,
    ) -> AceResult<Vec<VectorHit>> {
        let collections = self.collections.read().unwrap_or_else(|e| e.into_inner());
        let Some(entries) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<VectorHit> = entries
            .iter()
            .map(|e| VectorHit {
                id: e.id.clone(),
                score: crate::distance_to_similarity(1.0 - cosine(query_vector, &e.vector)),
                metadata: e.metadata.clone(),
            })
            .filter(|hit| hit.score >= min_score)
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct IdentityLm;

    #[async_trait]
    impl LmAdapter for IdentityLm {
        async fn generate(&self, _prompt: &str, _opts: lm_adapter::LmCallOptions) -> AceResult<lm_adapter::LmResponse> {
            unimplemented!()
        }

        async fn chat(
            &self,
            _messages: &[lm_adapter::ChatMessage],
            _opts: lm_adapter::LmCallOptions,
        ) -> AceResult<lm_adapter::LmResponse> {
            unimplemented!()
        }

        async fn embed(&self, text: &str) -> AceResult<Vec<f32>> {
            Ok(vec![text.len() as f32, 0.0, 0.0])
        }
    }

    #[tokio::test]
    async fn search_respects_k_and_min_score() {
        let store = FakeVectorStore::new(Arc::new(IdentityLm));
        store
            .upsert("lore", "p1", vec![1.0, 0.0, 0.0], serde_json::json!({"text": "near"}))
            .await
            .unwrap();
        store
            .upsert("lore", "p2", vec![0.0, 5.0, 0.0], serde_json::json!({"text": "far"}))
            .await
            .unwrap();

        let hits = store.search("lore", &[1.0, 0.0, 0.0], 5, 0.0).await.unwrap();
        assert_eq!(hits[0].id, "p1");
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn re_upsert_replaces_not_duplicates() {
        let store = FakeVectorStore::new(Arc::new(IdentityLm));
        store.upsert("lore", "p1", vec![1.0, 0.0, 0.0], serde_json::json!({})).await.unwrap();
        store.upsert("lore", "p1", vec![0.0, 1.0, 0.0], serde_json::json!({})).await.unwrap();

        let hits = store.search("lore", &[0.0, 1.0, 0.0], 10, 0.0).await.unwrap();
        assert_eq!(hits.len(), 1);
    }
}
