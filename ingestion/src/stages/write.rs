//! Write stage (spec.md §4.6): upserts entities then relations — each
//! canonical entity and its outgoing relations in one transaction via
//! `GraphAdapter::upsert_entity_with_relations` — then optionally embeds
//! the source text and each entity's salient description through the
//! vector adapter. Grounded on the teacher's `ingestion-pipeline::
//! pipeline::stages::persist` (the final stage, fallible I/O, records
//! counts).

use crate::context::PipelineContext;
use crate::state::{map_guard_error, Canonicalized, IngestionMachine, Written};
use common::error::AceError;
use graph_adapter::GraphAdapter;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;
use vector_adapter::{VectorAdapter, ENTITY_COLLECTION, LORE_COLLECTION};

fn entity_description(entity_type: &str, properties: &HashMap<String, Value>) -> String {
    let name = properties
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    format!("{entity_type}: {name}")
}

pub async fn write(
    machine: IngestionMachine<(), Canonicalized>,
    ctx: &mut PipelineContext<'_>,
    graph: &dyn GraphAdapter,
    vector: &dyn VectorAdapter,
    source_id: Option<&str>,
) -> Result<IngestionMachine<(), Written>, AceError> {
    for entity in &ctx.canonical_entities {
        // Figured out before the upsert, since the upsert itself is
        // idempotent and would otherwise erase the distinction: a
        // re-ingest of identical lore must report zero new entities and
        // relationships (spec.md's idempotent re-ingest scenario) while
        // still completing successfully.
        let pre_existing_entity = graph.get_entity(&entity.canonical_id).await?;
        let is_new_entity = pre_existing_entity.is_none();
        let pre_existing_relations = if pre_existing_entity.is_some() {
            graph
                .find_relations_for_entities(std::slice::from_ref(&entity.canonical_id))
                .await?
        } else {
            Vec::new()
        };

        let outgoing: Vec<_> = ctx
            .canonical_relations
            .iter()
            .filter(|r| r.from_canonical_id == entity.canonical_id)
            .map(|r| {
                let mut properties = HashMap::new();
                properties.insert("evidence".to_string(), Value::String(r.evidence.clone()));
                (r.relation_type, r.to_canonical_id.clone(), properties)
            })
            .collect();

        let new_relation_count = outgoing
            .iter()
            .filter(|(relation_type, to_id, _)| {
                !pre_existing_relations.iter().any(|existing| {
                    existing.from_canonical_id == entity.canonical_id
                        && existing.relation_type == *relation_type
                        && existing.to_canonical_id == *to_id
                })
            })
            .count() as u64;

        let (written_entity, _relations) = graph
            .upsert_entity_with_relations(
                entity.entity_type,
                &entity.canonical_id,
                entity.properties.clone(),
                entity.merged_from.clone(),
                outgoing,
            )
            .await?;

        if is_new_entity {
            ctx.entities_written += 1;
        }
        ctx.relationships_written += new_relation_count;

        if ctx.config.tuning.embed_on_write {
            let description = entity_description(entity.entity_type.as_str(), &written_entity.properties);
            match vector.embed(&[description.clone()]).await {
                Ok(mut vectors) => {
                    if let Some(embedding) = vectors.pop() {
                        if let Err(err) = vector
                            .upsert(
                                ENTITY_COLLECTION,
                                entity.canonical_id.as_ref(),
                                embedding,
                                serde_json::json!({ "canonical_id": entity.canonical_id.0 }),
                            )
                            .await
                        {
                            warn!(canonical_id = %entity.canonical_id, error = %err, "entity embedding upsert failed");
                            ctx.warnings.push(format!(
                                "failed to embed entity `{}`: {err}",
                                entity.canonical_id
                            ));
                        }
                    }
                }
                Err(err) => {
                    warn!(canonical_id = %entity.canonical_id, error = %err, "entity embedding failed");
                    ctx.warnings.push(format!(
                        "failed to embed entity `{}`: {err}",
                        entity.canonical_id
                    ));
                }
            }
        }
    }

    if ctx.config.tuning.embed_on_write {
        let source_key = source_id
            .map(ToString::to_string)
            .unwrap_or_else(|| format!("passage-{}", uuid::Uuid::new_v4()));

        match vector.embed(&[ctx.source_text.clone()]).await {
            Ok(mut vectors) => {
                if let Some(embedding) = vectors.pop() {
                    if let Err(err) = vector
                        .upsert(
                            LORE_COLLECTION,
                            &source_key,
                            embedding,
                            serde_json::json!({ "text": ctx.source_text, "source_id": source_id }),
                        )
                        .await
                    {
                        warn!(error = %err, "source passage embedding upsert failed");
                        ctx.warnings.push(format!("failed to embed source passage: {err}"));
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, "source passage embedding failed");
                ctx.warnings.push(format!("failed to embed source passage: {err}"));
            }
        }
    }

    machine
        .write()
        .map_err(|(_, guard)| map_guard_error("write", &guard))
}
