//! Canonicalize stage (spec.md §4.6): groups classified entities by
//! derived `canonical_id`, merges their property bags by the
//! confidence-gated overwrite rule, and resolves relation endpoints to
//! canonical ids by case-insensitive trimmed name match. Grounded on the
//! teacher's `ingestion-pipeline::pipeline::stages::enrich` (a pure
//! transform stage with no I/O).

use crate::context::{CanonicalRelation, PipelineContext};
use crate::state::{map_guard_error, Canonicalized, Defined, IngestionMachine};
use common::error::AceError;
use common::model::CanonicalEntity;
use common::ontology::canonical_id;
use serde_json::Value;
use std::collections::HashMap;

fn merge_attributes(
    base: &mut HashMap<String, Value>,
    incoming: &HashMap<String, Value>,
    incoming_confidence: f64,
    threshold: f64,
) {
    for (key, value) in incoming {
        let should_overwrite = match base.get(key) {
            None => true,
            Some(Value::Null) => true,
            Some(Value::String(s)) if s.is_empty() => true,
            Some(_) => incoming_confidence > threshold,
        };
        if should_overwrite {
            base.insert(key.clone(), value.clone());
        }
    }
}

pub fn canonicalize(
    machine: IngestionMachine<(), Defined>,
    ctx: &mut PipelineContext<'_>,
) -> Result<IngestionMachine<(), Canonicalized>, AceError> {
    let threshold = ctx.config.tuning.merge_confidence_threshold;

    // Preserve extraction order: first-seen canonical_id determines group
    // ordering; entities within a group are merged in extraction order.
    let mut order: Vec<common::ids::CanonicalId> = Vec::new();
    let mut groups: HashMap<common::ids::CanonicalId, CanonicalEntity> = HashMap::new();
    let mut name_index: HashMap<String, common::ids::CanonicalId> = HashMap::new();

    for classified in &ctx.classified_entities {
        let name = classified
            .raw_attributes
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let id = canonical_id(classified.entity_type, name);

        name_index.insert(
            classified.mention.trim().to_lowercase(),
            id.clone(),
        );
        name_index.insert(name.trim().to_lowercase(), id.clone());

        match groups.get_mut(&id) {
            None => {
                order.push(id.clone());
                groups.insert(
                    id.clone(),
                    CanonicalEntity {
                        canonical_id: id,
                        entity_type: classified.entity_type,
                        properties: classified.raw_attributes.clone(),
                        merged_from: vec![classified.temp_id.clone()],
                    },
                );
            }
            Some(existing) => {
                merge_attributes(
                    &mut existing.properties,
                    &classified.raw_attributes,
                    classified.confidence,
                    threshold,
                );
                existing.merged_from.push(classified.temp_id.clone());
            }
        }
    }

    ctx.canonical_entities = order
        .into_iter()
        .map(|id| groups.remove(&id).expect("group inserted for every id in order"))
        .collect();

    let mut canonical_relations = Vec::with_capacity(ctx.defined_relations.len());
    for relation in &ctx.defined_relations {
        let from = name_index.get(&relation.from_mention.trim().to_lowercase()).cloned();
        let to = name_index.get(&relation.to_mention.trim().to_lowercase()).cloned();

        match (from, to) {
            (Some(from_id), Some(to_id)) => canonical_relations.push(CanonicalRelation {
                from_canonical_id: from_id,
                relation_type: relation.relation_type,
                to_canonical_id: to_id,
                evidence: relation.evidence.clone(),
            }),
            _ => ctx.warnings.push(format!(
                "dropping relation `{}`->`{}` ({}): endpoint unresolved",
                relation.from_mention, relation.to_mention, relation.relation_type
            )),
        }
    }
    ctx.canonical_relations = canonical_relations;

    machine
        .canonicalize()
        .map_err(|(_, guard)| map_guard_error("canonicalize", &guard))
}
