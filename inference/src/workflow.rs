//! Drives one inference query through Historian → Narrator → Checker,
//! timing the run and rolling the outcome up into an [`InferenceResponse`].
//! Grounded on `ace-ingestion::pipeline::IngestionPipeline::run`'s
//! "drive a typed state machine, roll the timing and outcome into one
//! response struct" shape, adapted from a linear stage list into the
//! branching FSM `state::WorkflowState` expresses.

use crate::checker::checker;
use crate::config::InferenceConfig;
use crate::context::WorkflowContext;
use crate::historian::historian;
use crate::narrator::narrator;
use crate::state::WorkflowState;
use common::error::AceResult;
use common::model::{ProposedEntity, ProposedRelation, ValidationResult};
use graph_adapter::GraphAdapter;
use lm_adapter::LmAdapter;
use prompt_registry::PromptRegistry;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;
use vector_adapter::VectorAdapter;

/// Response shape for an inference query (spec.md §6).
#[derive(Debug, Clone)]
pub struct InferenceResponse {
    pub success: bool,
    pub response: String,
    pub entities: Vec<ProposedEntity>,
    pub relationships: Vec<ProposedRelation>,
    pub validation: ValidationResult,
    pub iterations: u32,
    pub retrieved_context_summary: String,
}

pub struct InferenceWorkflow {
    graph: Arc<dyn GraphAdapter>,
    vector: Arc<dyn VectorAdapter>,
    lm: Arc<dyn LmAdapter>,
    prompts: Arc<PromptRegistry>,
    config: InferenceConfig,
}

impl InferenceWorkflow {
    #[must_use]
    pub fn new(
        graph: Arc<dyn GraphAdapter>,
        vector: Arc<dyn VectorAdapter>,
        lm: Arc<dyn LmAdapter>,
        prompts: Arc<PromptRegistry>,
        config: InferenceConfig,
    ) -> Self {
        Self {
            graph,
            vector,
            lm,
            prompts,
            config,
        }
    }

    /// The underlying LM adapter, for callers (e.g. the evaluation
    /// harness) that need to run judge-mode calls alongside a workflow run.
    #[must_use]
    pub fn lm(&self) -> &Arc<dyn LmAdapter> {
        &self.lm
    }

    /// Runs the full Historian → Narrator → Checker cycle for `query`,
    /// bounded to `config.max_iterations` Narrator invocations (spec.md
    /// §8 invariant 5).
    #[tracing::instrument(skip(self, query))]
    pub async fn run(&self, query: &str) -> AceResult<InferenceResponse> {
        let deadline = Some(Instant::now() + Duration::from_millis(self.config.query_deadline_ms));
        let mut ctx = WorkflowContext::new(query.to_string(), deadline);
        let started = Instant::now();

        let mut state = WorkflowState::Historian;
        loop {
            state = match state {
                WorkflowState::Historian => {
                    historian(&mut ctx, self.graph.as_ref(), self.vector.as_ref(), &self.config).await?
                }
                WorkflowState::Narrator => {
                    ctx.iterations += 1;
                    narrator(
                        &mut ctx,
                        self.lm.as_ref(),
                        &self.prompts,
                        self.config.narrator_max_tokens,
                        self.config.lm_request_deadline_ms,
                    )
                    .await?
                }
                WorkflowState::Checker => checker(&mut ctx, self.graph.as_ref(), self.config.max_iterations).await?,
                WorkflowState::EndOk | WorkflowState::EndFail => break,
            };
        }

        info!(
            iterations = ctx.iterations,
            success = state == WorkflowState::EndOk,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "inference workflow finished"
        );

        let validation = ctx.validation.clone().unwrap_or_default();
        let summary = crate::narrator::context_summary(
            &ctx.retrieved.entities,
            &ctx.retrieved.relations,
            &ctx.retrieved.passages,
        );

        Ok(match (state, ctx.draft) {
            (WorkflowState::EndOk, Some(draft)) => InferenceResponse {
                success: true,
                response: draft.text,
                entities: draft.entities,
                relationships: draft.relationships,
                validation,
                iterations: ctx.iterations,
                retrieved_context_summary: summary,
            },
            (_, draft) => InferenceResponse {
                success: false,
                response: draft.as_ref().map(|d| d.text.clone()).unwrap_or_default(),
                entities: draft.as_ref().map(|d| d.entities.clone()).unwrap_or_default(),
                relationships: draft.map(|d| d.relationships).unwrap_or_default(),
                validation,
                iterations: ctx.iterations,
                retrieved_context_summary: summary,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ontology::{canonical_id, EntityType};
    use graph_adapter::FakeGraphStore;
    use lm_adapter::ScriptedLmAdapter;
    use prompt_registry::PromptRegistry;
    use std::collections::HashMap;
    use vector_adapter::FakeVectorStore;

    async fn seed_crimson_empire(graph: &FakeGraphStore) {
        let id = canonical_id(EntityType::Faction, "Crimson Empire");
        graph
            .upsert_entity(
                EntityType::Faction,
                &id,
                [
                    ("name".to_string(), serde_json::json!("Crimson Empire")),
                    ("alignment".to_string(), serde_json::json!("Lawful Evil")),
                ]
                .into_iter()
                .collect(),
                vec![],
            )
            .await
            .unwrap();

        let mines = canonical_id(EntityType::Resource, "Ruby Mines");
        graph
            .upsert_entity(
                EntityType::Resource,
                &mines,
                [
                    ("name".to_string(), serde_json::json!("Ruby Mines")),
                    ("type".to_string(), serde_json::json!("mineral")),
                ]
                .into_iter()
                .collect(),
                vec![],
            )
            .await
            .unwrap();

        graph
            .upsert_relation(&id, common::ontology::RelationType::ControlsResource, &mines, HashMap::new(), None)
            .await
            .unwrap();
    }

    /// Invariant 5/6 (spec.md §8): the workflow terminates within
    /// `MAX_INFERENCE_ITERATIONS` Narrator invocations, and `ok` implies a
    /// clean validation result.
    #[tokio::test]
    async fn terminates_within_bound_and_ok_implies_clean_validation() {
        let graph = Arc::new(FakeGraphStore::new());
        seed_crimson_empire(&graph).await;
        let vector = Arc::new(FakeVectorStore::new(Arc::new(ScriptedLmAdapter::new())));

        let good_reply = serde_json::json!({
            "text": "The Crimson Empire controls the Ruby Mines.",
            "entities": [{ "entity_type": "faction", "properties": { "name": "Crimson Empire", "alignment": "Lawful Evil" } }],
            "relationships": [],
            "confidence": 0.9,
            "reasoning": "grounded"
        });
        let lm = Arc::new(ScriptedLmAdapter::new().with_json_reply(good_reply));

        let workflow = InferenceWorkflow::new(
            graph,
            vector,
            lm,
            Arc::new(PromptRegistry::load_embedded()),
            InferenceConfig {
                query_deadline_ms: 60_000,
                ..InferenceConfig::default()
            },
        );

        let response = workflow.run("What resources does the Crimson Empire control?").await.unwrap();
        assert!(response.iterations <= 3);
        if response.validation.ok {
            assert!(response.validation.schema_violations.is_empty());
            assert!(response.validation.contradictions.is_empty());
            assert!(response.validation.score >= 0.8);
        }
    }

    /// S5-style scenario: every Narrator attempt keeps proposing a
    /// contradictory alignment, so the workflow exhausts its retries and
    /// reports failure with the contradiction surfaced.
    #[tokio::test]
    async fn exhausts_retries_on_persistent_contradiction() {
        let graph = Arc::new(FakeGraphStore::new());
        seed_crimson_empire(&graph).await;
        let vector = Arc::new(FakeVectorStore::new(Arc::new(ScriptedLmAdapter::new())));

        let contradictory_reply = serde_json::json!({
            "text": "The Crimson Empire is Chaotic Good.",
            "entities": [{ "entity_type": "faction", "properties": { "name": "Crimson Empire", "alignment": "Chaotic Good" } }],
            "relationships": [],
            "confidence": 0.9,
            "reasoning": "..."
        });
        let lm = Arc::new(
            ScriptedLmAdapter::new()
                .with_json_reply(contradictory_reply.clone())
                .with_json_reply(contradictory_reply.clone())
                .with_json_reply(contradictory_reply),
        );

        let workflow = InferenceWorkflow::new(
            graph,
            vector,
            lm,
            Arc::new(PromptRegistry::load_embedded()),
            InferenceConfig {
                query_deadline_ms: 60_000,
                ..InferenceConfig::default()
            },
        );

        let response = workflow.run("What alignment is the Crimson Empire?").await.unwrap();
        assert!(!response.success);
        assert_eq!(response.iterations, 3);
        assert!(!response.validation.contradictions.is_empty());
    }
}
