//! Define stage (spec.md §4.6): maps each extracted entity to its
//! ontology label, assigns a transient id, validates required
//! attributes, and normalizes relation labels. No persistent writes.
//! Grounded on the teacher's `ingestion-pipeline::pipeline::stages::
//! retrieve_related` (one pure stage function per state transition).

use crate::context::{DefinedRelation, PipelineContext};
use crate::state::{map_guard_error, Defined, Extracted, IngestionMachine};
use common::error::AceError;
use common::model::ClassifiedEntity;
use common::ontology::entity::validate_entity;
use common::ontology::relation::normalize_relation_label;
use common::ontology::EntityType;
use std::str::FromStr;

/// Define never fails the job outright — entities whose raw type doesn't
/// map to the closed ontology set are dropped with a warning rather than
/// aborting the whole extraction batch, since a single bad mention
/// shouldn't sink an otherwise-good ingestion.
pub fn define(
    machine: IngestionMachine<(), Extracted>,
    ctx: &mut PipelineContext<'_>,
) -> Result<IngestionMachine<(), Defined>, AceError> {
    let mut monotonic: u64 = 0;
    let mut classified = Vec::with_capacity(ctx.extracted_entities.len());

    for (index, extracted) in ctx.extracted_entities.iter().enumerate() {
        let entity_type = match EntityType::from_str(&extracted.raw_type) {
            Ok(t) => t,
            Err(_) => {
                ctx.warnings.push(format!(
                    "dropping mention `{}`: unknown entity type `{}`",
                    extracted.mention, extracted.raw_type
                ));
                continue;
            }
        };

        let outcome = validate_entity(entity_type, &extracted.raw_attributes);
        if !outcome.ok {
            ctx.warnings.push(format!(
                "mention `{}` (type {entity_type}) missing required fields: {}",
                extracted.mention,
                outcome.errors.join(", ")
            ));
        }

        monotonic += 1;
        let temp_id = format!("temp_{entity_type}_{index}_{monotonic}");

        classified.push(ClassifiedEntity {
            temp_id,
            entity_type,
            raw_attributes: extracted.raw_attributes.clone(),
            confidence: extracted.confidence,
            mention: extracted.mention.clone(),
        });
    }

    let mut defined_relations = Vec::with_capacity(ctx.extracted_relations.len());
    for relation in &ctx.extracted_relations {
        let label = normalize_relation_label(&relation.raw_type);
        match common::ontology::RelationType::from_str(&label) {
            Ok(relation_type) => defined_relations.push(DefinedRelation {
                from_mention: relation.from_mention.clone(),
                to_mention: relation.to_mention.clone(),
                relation_type,
                evidence: relation.evidence.clone(),
            }),
            Err(_) => ctx.warnings.push(format!(
                "dropping relation `{}`->`{}`: unrecognized label `{}` (normalized `{label}`)",
                relation.from_mention, relation.to_mention, relation.raw_type
            )),
        }
    }

    ctx.classified_entities = classified;
    ctx.defined_relations = defined_relations;

    machine
        .define()
        .map_err(|(_, guard)| map_guard_error("define", &guard))
}
