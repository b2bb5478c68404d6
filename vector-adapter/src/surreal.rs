//! SurrealDB-backed [`VectorAdapter`] using its HNSW vector index and the
//! `<|k,ef|>` approximate-KNN operator, exactly as the teacher's
//! `find_items_by_vector_similarity` does for `knowledge_entity` and
//! `text_chunk`, generalized to an arbitrary caller-named collection.

use crate::{distance_to_similarity, VectorAdapter, VectorHit};
use async_trait::async_trait;
use chrono::Utc;
use common::error::{AceError, AceResult};
use common::ids::Timestamp;
use lm_adapter::LmAdapter;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::instrument;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VectorRecord {
    id: String,
    vector: Vec<f32>,
    metadata: serde_json::Value,
    created_at: Timestamp,
}

pub struct SurrealVectorAdapter {
    client: Surreal<Any>,
    lm: Arc<dyn LmAdapter>,
    indexed_collections: Mutex<HashSet<String>>,
}

fn sanitize_collection(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "default".to_string()
    } else {
        cleaned
    }
}

impl SurrealVectorAdapter {
    #[must_use]
    pub fn new(client: Surreal<Any>, lm: Arc<dyn LmAdapter>) -> Self {
        SurrealVectorAdapter {
            client,
            lm,
            indexed_collections: Mutex::new(HashSet::new()),
        }
    }

    async fn ensure_index(&self, collection: &str, dimension: usize) -> AceResult<()> {
        {
            let seen = self.indexed_collections.lock().unwrap_or_else(|e| e.into_inner());
            if seen.contains(collection) {
                return Ok(());
            }
        }

        let ddl = format!(
            "DEFINE TABLE IF NOT EXISTS {collection} SCHEMALESS;
             DEFINE INDEX IF NOT EXISTS idx_{collection}_vector ON {collection}
               FIELDS vector HNSW DIMENSION {dimension};"
        );
        self.client
            .query(ddl)
            .await
            .map_err(|e| AceError::BackendUnavailable(e.to_string()))?;

        let mut seen = self.indexed_collections.lock().unwrap_or_else(|e| e.into_inner());
        seen.insert(collection.to_string());
        Ok(())
    }
}

#[async_trait]
impl VectorAdapter for SurrealVectorAdapter {
    #[instrument(skip(self, texts))]
    async fn embed(&self, texts: &[String]) -> AceResult<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.lm.embed(text).await?);
        }
        Ok(vectors)
    }

    #[instrument(skip(self, vector, metadata))]
    async fn upsert(
        &self,
        collection: &str,
        id: &str,
        vector: Vec<f32>,
        metadata: serde_json::Value,
    ) -> AceResult<()> {
        let collection = sanitize_collection(collection);
        self.ensure_index(&collection, vector.len()).await?;

        let record = VectorRecord {
            id: id.to_string(),
            vector,
            metadata,
            created_at: Utc::now(),
        };

        let _: Option<VectorRecord> = self
            .client
            .update((collection.as_str(), id))
            .content(record)
            .await
            .map_err(|e| AceError::BackendUnavailable(e.to_string()))?;
        Ok(())
    }

    #[instrument(skip(self, query_vector))]
    async fn search(
        &self,
        collection: &str,
        query_vector: &[f32],
        k: usize,
        min_score: f32,
    ) -> AceResult<Vec<VectorHit>> {
        let collection = sanitize_collection(collection);
        self.ensure_index(&collection, query_vector.len()).await?;

        let candidate_pool = (k * 4).max(k).max(1);
        let sql = format!(
            "SELECT *, vector::distance::knn() AS distance FROM type::table($collection)
             WHERE vector <|{candidate_pool},40|> $qv ORDER BY distance"
        );

        #[derive(Debug, Deserialize)]
        struct Row {
            id: surrealdb::sql::Thing,
            metadata: serde_json::Value,
            distance: f32,
        }

        let rows: Vec<Row> = self
            .client
            .query(sql)
            .bind(("collection", collection))
            .bind(("qv", query_vector.to_vec()))
            .await
            .map_err(|e| AceError::BackendUnavailable(e.to_string()))?
            .take(0)
            .map_err(|e| AceError::BackendUnavailable(e.to_string()))?;

        let mut hits: Vec<VectorHit> = rows
            .into_iter()
            .map(|row| VectorHit {
                id: row.id.id.to_raw(),
                score: distance_to_similarity(row.distance),
                metadata: row.metadata,
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
    use uuid::Uuid;

    struct FakeLm;

    #[async_trait]
    impl LmAdapter for FakeLm {
        async fn generate(
            &self,
            _prompt: &str,
            _opts: lm_adapter::LmCallOptions,
        ) -> AceResult<lm_adapter::LmResponse> {
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

    async fn test_adapter() -> SurrealVectorAdapter {
        let client = surrealdb::engine::any::connect("mem://").await.unwrap();
        client.use_ns("test").use_db(&Uuid::new_v4().to_string()).await.unwrap();
        SurrealVectorAdapter::new(client, Arc::new(FakeLm))
    }

    #[tokio::test]
    async fn search_respects_k_and_min_score() {
        let adapter = test_adapter().await;
        adapter
            .upsert("lore", "p1", vec![1.0, 0.0, 0.0], serde_json::json!({"text": "near"}))
            .await
            .unwrap();
        adapter
            .upsert("lore", "p2", vec![0.0, 5.0, 0.0], serde_json::json!({"text": "far"}))
            .await
            .unwrap();

        let hits = adapter.search("lore", &[1.0, 0.0, 0.0], 5, 0.0).await.unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].id, "p1");
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }
}
