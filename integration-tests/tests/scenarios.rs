//! End-to-end scenarios (spec.md §8, S1-S6), grounded on the teacher's
//! `integration-tests` crate (one `tests/` binary per workspace,
//! `TestServer`-style setup helpers shared across cases) generalized
//! from HTTP-request scenarios into direct pipeline/workflow calls
//! against `FakeGraphStore`/`FakeVectorStore`/`ScriptedLmAdapter`, so the
//! suite runs deterministically with no network access.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use common::error::AceError;
use common::model::JobStatus;
use common::ontology::{canonical_id, EntityType, RelationType};
use graph_adapter::{FakeGraphStore, GraphAdapter};
use ingestion::{IngestionConfig, IngestionPipeline, JobQueue, JobTracker, Submission};
use inference::{InferenceConfig, InferenceWorkflow};
use lm_adapter::ScriptedLmAdapter;
use prompt_registry::PromptRegistry;
use vector_adapter::FakeVectorStore;

fn prompts() -> Arc<PromptRegistry> {
    Arc::new(PromptRegistry::load_embedded())
}

fn faction_lore_extraction() -> serde_json::Value {
    serde_json::json!({
        "entities": [
            {
                "mention": "the Crimson Empire",
                "raw_type": "faction",
                "raw_attributes": { "name": "Crimson Empire", "alignment": "Lawful Evil" },
                "confidence": 0.95,
                "evidence": "The Crimson Empire marched south under General Thorne."
            },
            {
                "mention": "General Thorne",
                "raw_type": "character",
                "raw_attributes": { "name": "General Thorne", "role": "commander" },
                "confidence": 0.9,
                "evidence": "under General Thorne"
            },
            {
                "mention": "the Ruby Mines",
                "raw_type": "resource",
                "raw_attributes": { "name": "Ruby Mines", "type": "mineral" },
                "confidence": 0.9,
                "evidence": "seized the Ruby Mines"
            },
            {
                "mention": "the Ashen Pact",
                "raw_type": "faction",
                "raw_attributes": { "name": "Ashen Pact", "alignment": "Neutral" },
                "confidence": 0.85,
                "evidence": "allied with the Ashen Pact"
            }
        ],
        "relations": [
            {
                "from_mention": "General Thorne",
                "to_mention": "the Crimson Empire",
                "raw_type": "commands",
                "evidence": "under General Thorne",
                "confidence": 0.9
            },
            {
                "from_mention": "the Crimson Empire",
                "to_mention": "the Ruby Mines",
                "raw_type": "controls",
                "evidence": "seized the Ruby Mines",
                "confidence": 0.9
            },
            {
                "from_mention": "the Crimson Empire",
                "to_mention": "the Ashen Pact",
                "raw_type": "allied with",
                "evidence": "allied with the Ashen Pact",
                "confidence": 0.85
            }
        ]
    })
}

const FACTION_LORE_TEXT: &str = "The Crimson Empire marched south under General Thorne, \
    seized the Ruby Mines, and remains allied with the Ashen Pact.";

/// S1: ingesting one passage of faction lore produces a completed job
/// with the expected canonical entities and relationships written.
#[tokio::test]
async fn s1_ingest_one_faction_completes_with_expected_graph_writes() {
    let graph: Arc<dyn GraphAdapter> = Arc::new(FakeGraphStore::new());
    let lm = Arc::new(ScriptedLmAdapter::new().with_json_reply(faction_lore_extraction()));
    let vector = Arc::new(FakeVectorStore::new(lm.clone()));
    let pipeline = IngestionPipeline::new(graph.clone(), vector, lm, prompts(), IngestionConfig::default());

    let job = pipeline
        .run(
            common::ids::JobId::new(),
            FACTION_LORE_TEXT.to_string(),
            Some("scroll-1".to_string()),
            HashMap::new(),
            Utc::now(),
        )
        .await;

    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.entities_created >= 4, "expected >=4 entities, got {}", job.entities_created);
    assert!(
        job.relationships_created >= 3,
        "expected >=3 relationships, got {}",
        job.relationships_created
    );

    let empire_id = canonical_id(EntityType::Faction, "Crimson Empire");
    let empire = graph.get_entity(&empire_id).await.unwrap().expect("empire written");
    assert_eq!(empire.alignment(), Some("Lawful Evil"));

    let thorne_id = canonical_id(EntityType::Character, "General Thorne");
    let relations = graph
        .find_relations_for_entities(&[thorne_id.clone()])
        .await
        .unwrap();
    assert!(relations
        .iter()
        .any(|r| r.from_canonical_id == thorne_id && r.relation_type == RelationType::Commands));
}

/// S2: re-ingesting byte-identical lore is idempotent — the graph state
/// doesn't change and the second run reports zero new writes while still
/// completing successfully.
#[tokio::test]
async fn s2_idempotent_reingest_reports_zero_new_writes() {
    let graph: Arc<dyn GraphAdapter> = Arc::new(FakeGraphStore::new());
    let lm = Arc::new(
        ScriptedLmAdapter::new()
            .with_json_reply(faction_lore_extraction())
            .with_json_reply(faction_lore_extraction()),
    );
    let vector = Arc::new(FakeVectorStore::new(lm.clone()));
    let pipeline = IngestionPipeline::new(graph, vector, lm, prompts(), IngestionConfig::default());

    let first = pipeline
        .run(
            common::ids::JobId::new(),
            FACTION_LORE_TEXT.to_string(),
            Some("scroll-1".to_string()),
            HashMap::new(),
            Utc::now(),
        )
        .await;
    assert_eq!(first.status, JobStatus::Completed);
    assert!(first.entities_created >= 4);

    let second = pipeline
        .run(
            common::ids::JobId::new(),
            FACTION_LORE_TEXT.to_string(),
            Some("scroll-1".to_string()),
            HashMap::new(),
            Utc::now(),
        )
        .await;

    assert_eq!(second.status, JobStatus::Completed);
    assert_eq!(second.entities_created, 0);
    assert_eq!(second.relationships_created, 0);
}

async fn seed_crimson_empire(graph: &FakeGraphStore) -> common::ids::CanonicalId {
    let empire_id = canonical_id(EntityType::Faction, "Crimson Empire");
    graph
        .upsert_entity(
            EntityType::Faction,
            &empire_id,
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

    let mines_id = canonical_id(EntityType::Resource, "Ruby Mines");
    graph
        .upsert_entity(
            EntityType::Resource,
            &mines_id,
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
        .upsert_relation(&empire_id, RelationType::ControlsResource, &mines_id, HashMap::new(), None)
        .await
        .unwrap();

    empire_id
}

/// S3: a query about who controls a known resource is answered, grounded
/// in the retrieved graph context, and passes the Checker on the first
/// attempt.
#[tokio::test]
async fn s3_query_resource_control_answers_from_graph() {
    let graph: Arc<dyn GraphAdapter> = Arc::new(FakeGraphStore::new());
    seed_crimson_empire(&graph).await;
    let vector: Arc<dyn vector_adapter::VectorAdapter> =
        Arc::new(FakeVectorStore::new(Arc::new(ScriptedLmAdapter::new())));

    let grounded_reply = serde_json::json!({
        "text": "The Crimson Empire controls the Ruby Mines.",
        "entities": [{
            "entity_type": "faction",
            "properties": { "name": "Crimson Empire", "alignment": "Lawful Evil" }
        }],
        "relationships": [{
            "relation_type": "CONTROLS_RESOURCE",
            "from_name": "Crimson Empire",
            "to_name": "Ruby Mines"
        }],
        "confidence": 0.9,
        "reasoning": "grounded in the retrieved faction context"
    });
    let lm = Arc::new(ScriptedLmAdapter::new().with_json_reply(grounded_reply));

    let workflow = InferenceWorkflow::new(
        graph,
        vector,
        lm,
        prompts(),
        InferenceConfig {
            query_deadline_ms: 60_000,
            ..InferenceConfig::default()
        },
    );

    let response = workflow
        .run("What resources does the Crimson Empire control?")
        .await
        .unwrap();

    assert!(response.success, "validation: {:?}", response.validation);
    assert_eq!(response.iterations, 1);
    assert!(response.validation.ok);
    assert!(response.response.contains("Ruby Mines"));
}

/// S4: the Narrator proposes a relation to an entity that exists nowhere
/// in the graph or its own proposal — a hallucinated endpoint — and the
/// Checker rejects the draft as a schema violation rather than letting
/// it through.
#[tokio::test]
async fn s4_hallucinated_relation_endpoint_is_rejected() {
    let graph: Arc<dyn GraphAdapter> = Arc::new(FakeGraphStore::new());
    seed_crimson_empire(&graph).await;
    let vector: Arc<dyn vector_adapter::VectorAdapter> =
        Arc::new(FakeVectorStore::new(Arc::new(ScriptedLmAdapter::new())));

    let hallucinated_reply = serde_json::json!({
        "text": "The Crimson Empire also secretly controls the Obsidian Throne.",
        "entities": [],
        "relationships": [{
            "relation_type": "CONTROLS_RESOURCE",
            "from_name": "Crimson Empire",
            "to_name": "Obsidian Throne"
        }],
        "confidence": 0.4,
        "reasoning": "speculative"
    });
    let lm = Arc::new(ScriptedLmAdapter::new().with_json_reply(hallucinated_reply.clone()).with_json_reply(
        hallucinated_reply.clone(),
    ).with_json_reply(hallucinated_reply));

    let workflow = InferenceWorkflow::new(
        graph,
        vector,
        lm,
        prompts(),
        InferenceConfig {
            query_deadline_ms: 60_000,
            ..InferenceConfig::default()
        },
    );

    let response = workflow
        .run("Does the Crimson Empire control any other resources?")
        .await
        .unwrap();

    assert!(!response.success);
    assert!(!response.validation.schema_violations.is_empty());
    assert!(response
        .validation
        .schema_violations
        .iter()
        .any(|v| v.contains("unresolved endpoint")));
}

/// S5: the Narrator keeps proposing an alignment that contradicts the
/// graph; the workflow exhausts its bounded retry budget and reports
/// failure with the contradiction surfaced rather than looping forever.
#[tokio::test]
async fn s5_persistent_contradiction_exhausts_bounded_retries() {
    let graph: Arc<dyn GraphAdapter> = Arc::new(FakeGraphStore::new());
    seed_crimson_empire(&graph).await;
    let vector: Arc<dyn vector_adapter::VectorAdapter> =
        Arc::new(FakeVectorStore::new(Arc::new(ScriptedLmAdapter::new())));

    let contradictory_reply = serde_json::json!({
        "text": "The Crimson Empire is in fact Chaotic Good.",
        "entities": [{
            "entity_type": "faction",
            "properties": { "name": "Crimson Empire", "alignment": "Chaotic Good" }
        }],
        "relationships": [],
        "confidence": 0.7,
        "reasoning": "revisionist"
    });
    let lm = Arc::new(
        ScriptedLmAdapter::new()
            .with_json_reply(contradictory_reply.clone())
            .with_json_reply(contradictory_reply.clone())
            .with_json_reply(contradictory_reply),
    );

    let config = InferenceConfig {
        query_deadline_ms: 60_000,
        ..InferenceConfig::default()
    };
    let max_iterations = config.max_iterations;
    let workflow = InferenceWorkflow::new(graph, vector, lm, prompts(), config);

    let response = workflow.run("What alignment is the Crimson Empire?").await.unwrap();

    assert!(!response.success);
    assert_eq!(response.iterations, max_iterations);
    assert!(!response.validation.contradictions.is_empty());
}

/// S6: a submission of empty (whitespace-only) text is rejected
/// synchronously by the job queue, before any worker ever claims it —
/// the caller gets a `Validation` error back on the `submit` call itself,
/// not a job that later fails.
#[tokio::test]
async fn s6_empty_submission_rejected_synchronously() {
    let graph: Arc<dyn GraphAdapter> = Arc::new(FakeGraphStore::new());
    let lm = Arc::new(ScriptedLmAdapter::new());
    let vector = Arc::new(FakeVectorStore::new(lm.clone()));
    let pipeline = Arc::new(IngestionPipeline::new(graph, vector, lm, prompts(), IngestionConfig::default()));
    let tracker = JobTracker::new(std::time::Duration::from_secs(60));
    let (queue, handles) = JobQueue::spawn(pipeline, tracker, 2, 8);

    let result = queue
        .submit(Submission {
            text: "   \n\t  ".to_string(),
            source_id: None,
            metadata: HashMap::new(),
        })
        .await;

    assert!(matches!(result, Err(AceError::Validation(_))));

    drop(queue);
    for handle in handles {
        let _ = handle.await;
    }
}
