//! Historian node (spec.md §4.8): hybrid graph + vector retrieval.
//! Grounded on the teacher's `retrieval-pipeline` Default strategy, which
//! issues `CollectCandidates` (vector) and `GraphExpansion` (graph) as
//! independent stages feeding one `Assemble` stage — expressed here with
//! `tokio::join!` instead of the teacher's stage-list driver, since the
//! workflow only has three nodes rather than a configurable pipeline.

use crate::config::{InferenceConfig, KEYWORD_CAP, KEYWORD_MIN_LEN};
use crate::context::WorkflowContext;
use crate::state::WorkflowState;
use crate::stopwords::is_stopword;
use common::error::{AceError, AceResult};
use common::ids::CanonicalId;
use common::model::{Entity, RetrievedContext, ScoredPassage};
use futures::future::join_all;
use graph_adapter::GraphAdapter;
use std::collections::HashSet;
use vector_adapter::{VectorAdapter, LORE_COLLECTION};

fn extract_keywords(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut keywords = Vec::new();
    for token in query.split(|c: char| !c.is_alphanumeric()) {
        let lower = token.to_lowercase();
        if lower.len() < KEYWORD_MIN_LEN || is_stopword(&lower) || !seen.insert(lower.clone()) {
            continue;
        }
        keywords.push(lower);
        if keywords.len() >= KEYWORD_CAP {
            break;
        }
    }
    keywords
}

async fn keyword_search(
    graph: &dyn GraphAdapter,
    keywords: &[String],
    limit: u32,
) -> AceResult<Vec<Entity>> {
    let searches = keywords
        .iter()
        .map(|term| graph.find_entities_by_keyword(term, limit));
    let results = join_all(searches).await;

    let mut seen = HashSet::new();
    let mut entities = Vec::new();
    for result in results {
        for entity in result? {
            if seen.insert(entity.canonical_id.clone()) {
                entities.push(entity);
            }
        }
    }
    Ok(entities)
}

/// Runs the Historian node: fans graph and vector retrieval out in
/// parallel, then fetches relations for the combined entity set.
pub async fn historian(
    ctx: &mut WorkflowContext,
    graph: &dyn GraphAdapter,
    vector: &dyn VectorAdapter,
    config: &InferenceConfig,
) -> AceResult<WorkflowState> {
    if ctx.deadline_elapsed() {
        return Err(AceError::Cancelled("deadline elapsed before historian".into()));
    }

    let keywords = extract_keywords(&ctx.query);
    let query_vector = vector.embed(std::slice::from_ref(&ctx.query)).await?;
    let query_vector = query_vector
        .into_iter()
        .next()
        .ok_or_else(|| AceError::Fatal("embed returned no vector for a single input".into()))?;

    let (vector_hits, keyword_entities) = tokio::join!(
        vector.search(LORE_COLLECTION, &query_vector, config.vector_k, config.vector_min_score),
        keyword_search(graph, &keywords, config.graph_keyword_limit)
    );
    let vector_hits = vector_hits?;
    let keyword_entities = keyword_entities?;

    let entity_ids: Vec<CanonicalId> = keyword_entities.iter().map(|e| e.canonical_id.clone()).collect();
    let relations = graph.find_relations_for_entities(&entity_ids).await?;

    let passages: Vec<ScoredPassage> = vector_hits
        .iter()
        .map(|hit| ScoredPassage {
            text: hit
                .metadata
                .get("text")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            score: f64::from(hit.score),
            source_id: Some(hit.id.clone()),
        })
        .collect();

    let avg_vector_score = if vector_hits.is_empty() {
        0.0
    } else {
        f64::from(vector_hits.iter().map(|h| h.score).sum::<f32>()) / vector_hits.len() as f64
    };
    let hit_count = (keyword_entities.len() + vector_hits.len()) as f64;
    let relevance_score = (hit_count * avg_vector_score.max(0.1)).clamp(0.0, 1.0);

    ctx.retrieved = RetrievedContext {
        entities: keyword_entities,
        relations,
        passages,
        relevance_score,
    };

    Ok(WorkflowState::Narrator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_keywords_drops_short_tokens_and_stopwords() {
        let keywords = extract_keywords("What resources does the Crimson Empire control?");
        assert!(keywords.contains(&"resources".to_string()));
        assert!(keywords.contains(&"crimson".to_string()));
        assert!(keywords.contains(&"empire".to_string()));
        assert!(keywords.contains(&"control".to_string()));
        assert!(!keywords.contains(&"what".to_string()));
        assert!(!keywords.contains(&"the".to_string()));
        assert!(!keywords.contains(&"does".to_string()));
    }

    #[test]
    fn extract_keywords_deduplicates_and_caps() {
        let keywords = extract_keywords("mines mines mines mines mines mines mines mines mines");
        assert_eq!(keywords.len(), 1);
    }
}
