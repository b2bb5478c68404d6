//! Consistency Checker node (spec.md §4.8): schema validation then
//! contradiction detection against the live graph. Grounded on the
//! teacher's `retrieval-pipeline::scoring` module's two-pass
//! candidate-then-score shape, generalized from retrieval scoring into
//! draft validation.
//!
//! Open Question resolution (see DESIGN.md): the literal score formula
//! (`(checks - issues) / max(checks, 1)`) treats schema violations and
//! contradictions symmetrically, but `ok` additionally requires
//! `schema_violations` to be empty outright — a schema violation always
//! fails the draft regardless of how the score happens to land.

use crate::context::WorkflowContext;
use crate::state::WorkflowState;
use common::error::AceResult;
use common::model::{Contradiction, GeneratedDraft, ProposedEntity, ProposedRelation, ValidationResult};
use common::ontology::{validate_entity, validate_relation, EntityType, RelationType};
use graph_adapter::GraphAdapter;
use std::str::FromStr;

fn proposed_entity_name(entity: &ProposedEntity) -> Option<&str> {
    entity.properties.get("name").and_then(|v| v.as_str())
}

/// Resolves a relation endpoint's name to its entity type, checking the
/// draft's own proposed entities first and falling back to a live-graph
/// lookup. `None` means the endpoint is unresolved (dangling).
async fn resolve_endpoint_type(
    name: &str,
    entities: &[ProposedEntity],
    graph: &dyn GraphAdapter,
) -> Option<EntityType> {
    if let Some(entity) = entities
        .iter()
        .find(|e| proposed_entity_name(e).is_some_and(|n| n.eq_ignore_ascii_case(name)))
    {
        return Some(entity.entity_type);
    }
    for entity_type in EntityType::variants() {
        if graph
            .get_entity_by_name(*entity_type, name)
            .await
            .ok()
            .flatten()
            .is_some()
        {
            return Some(*entity_type);
        }
    }
    None
}

/// Pass 1: resolves the Narrator's raw string-typed proposal into the
/// closed ontology, recording one violation per unresolved entity/
/// relation type or missing endpoint/required field.
async fn schema_pass(
    raw: &crate::narrator::RawDraft,
    graph: &dyn GraphAdapter,
) -> (GeneratedDraft, Vec<String>) {
    let mut violations = Vec::new();
    let mut entities = Vec::with_capacity(raw.entities.len());

    for raw_entity in &raw.entities {
        match EntityType::from_str(&raw_entity.entity_type) {
            Ok(entity_type) => {
                let outcome = validate_entity(entity_type, &raw_entity.properties);
                if !outcome.ok {
                    violations.extend(outcome.errors);
                }
                entities.push(ProposedEntity {
                    entity_type,
                    properties: raw_entity.properties.clone(),
                });
            }
            Err(_) => violations.push(format!("unknown entity type `{}`", raw_entity.entity_type)),
        }
    }

    let mut relationships = Vec::with_capacity(raw.relationships.len());
    for raw_relation in &raw.relationships {
        let Ok(relation_type) = RelationType::from_str(&raw_relation.relation_type) else {
            violations.push(format!("unknown relation type `{}`", raw_relation.relation_type));
            continue;
        };

        let from_type = resolve_endpoint_type(&raw_relation.from_name, &entities, graph).await;
        let to_type = resolve_endpoint_type(&raw_relation.to_name, &entities, graph).await;
        let (Some(from_type), Some(to_type)) = (from_type, to_type) else {
            violations.push(format!(
                "relation `{}` -[{relation_type}]-> `{}` has an unresolved endpoint",
                raw_relation.from_name, raw_relation.to_name
            ));
            continue;
        };

        let outcome = validate_relation(relation_type, from_type, to_type);
        if !outcome.ok {
            violations.extend(outcome.errors);
            continue;
        }

        relationships.push(ProposedRelation {
            relation_type,
            from_name: raw_relation.from_name.clone(),
            to_name: raw_relation.to_name.clone(),
        });
    }

    (
        GeneratedDraft {
            text: raw.text.clone(),
            entities,
            relationships,
            confidence: raw.confidence,
            reasoning: raw.reasoning.clone(),
        },
        violations,
    )
}

/// Pass 2: for every proposed entity sharing a `canonical_id` with an
/// existing graph entity, compares properties one by one.
async fn contradiction_pass(
    draft: &GeneratedDraft,
    graph: &dyn GraphAdapter,
) -> AceResult<Vec<Contradiction>> {
    let mut contradictions = Vec::new();
    for entity in &draft.entities {
        let Some(name) = proposed_entity_name(entity) else {
            continue;
        };
        let canonical = common::ontology::canonical_id(entity.entity_type, name);
        let Some(existing) = graph.get_entity_by_name(entity.entity_type, name).await? else {
            continue;
        };

        for (key, proposed_value) in &entity.properties {
            if let Some(graph_value) = existing.properties.get(key) {
                let graph_is_empty = graph_value.is_null()
                    || graph_value.as_str().is_some_and(str::is_empty);
                if !graph_is_empty && graph_value != proposed_value {
                    contradictions.push(Contradiction {
                        canonical_id: canonical.clone(),
                        property: key.clone(),
                        graph_value: graph_value.clone(),
                        proposed_value: proposed_value.clone(),
                    });
                }
            }
        }
    }
    Ok(contradictions)
}

/// Runs the Checker node and decides the next FSM transition under the
/// bounded-retry iteration policy (spec.md §4.8).
pub async fn checker(
    ctx: &mut WorkflowContext,
    graph: &dyn GraphAdapter,
    max_iterations: u32,
) -> AceResult<WorkflowState> {
    let validation = if let Some(raw) = ctx.raw_draft.take() {
        let (draft, schema_violations) = schema_pass(&raw, graph).await;
        let contradictions = contradiction_pass(&draft, graph).await?;

        let checks = (draft.entities.len() + draft.relationships.len()).max(1);
        let issues = schema_violations.len() + contradictions.len();
        #[allow(clippy::cast_precision_loss)]
        let score = (checks as f64 - issues as f64).max(0.0) / checks as f64;

        let ok = schema_violations.is_empty() && contradictions.is_empty() && score >= 0.8;
        ctx.draft = Some(draft);

        ValidationResult {
            ok,
            schema_violations,
            contradictions,
            score,
            suggestions: Vec::new(),
        }
    } else {
        // Narrator already produced a checker-style invalid result (parse
        // failure) — nothing to validate, pass it through unchanged.
        ctx.validation.clone().unwrap_or_default()
    };

    let ok = validation.ok;
    ctx.validation = Some(validation.clone());

    if ok {
        return Ok(WorkflowState::EndOk);
    }

    if ctx.iterations >= max_iterations {
        return Ok(WorkflowState::EndFail);
    }

    ctx.rejection_history.push(validation);
    Ok(WorkflowState::Narrator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph_adapter::FakeGraphStore;

    #[tokio::test]
    async fn ok_implies_no_violations_no_contradictions_and_min_score() {
        let graph = FakeGraphStore::new();
        let mut ctx = WorkflowContext::new("query".to_string(), None);
        ctx.raw_draft = Some(crate::narrator::RawDraft {
            text: "The Crimson Empire controls the Ruby Mines.".to_string(),
            entities: vec![crate::narrator::RawProposedEntity {
                entity_type: "faction".to_string(),
                properties: [("name".to_string(), serde_json::json!("Crimson Empire"))]
                    .into_iter()
                    .collect(),
            }],
            relationships: Vec::new(),
            confidence: 0.9,
            reasoning: "grounded in context".to_string(),
        });

        let next = checker(&mut ctx, &graph, 3).await.unwrap();
        let validation = ctx.validation.clone().unwrap();
        if validation.ok {
            assert!(validation.schema_violations.is_empty());
            assert!(validation.contradictions.is_empty());
            assert!(validation.score >= 0.8);
            assert_eq!(next, WorkflowState::EndOk);
        }
    }

    #[tokio::test]
    async fn unresolved_relation_endpoint_is_a_schema_violation() {
        let graph = FakeGraphStore::new();
        let mut ctx = WorkflowContext::new("query".to_string(), None);
        ctx.raw_draft = Some(crate::narrator::RawDraft {
            text: "text".to_string(),
            entities: Vec::new(),
            relationships: vec![crate::narrator::RawProposedRelation {
                relation_type: "CONTROLS_RESOURCE".to_string(),
                from_name: "Nonexistent Faction".to_string(),
                to_name: "Nonexistent Resource".to_string(),
            }],
            confidence: 0.5,
            reasoning: String::new(),
        });

        checker(&mut ctx, &graph, 3).await.unwrap();
        let validation = ctx.validation.unwrap();
        assert!(!validation.ok);
        assert!(!validation.schema_violations.is_empty());
    }

    #[tokio::test]
    async fn resolved_relation_with_mismatched_endpoint_types_is_a_schema_violation() {
        let graph = FakeGraphStore::new();
        let mut ctx = WorkflowContext::new("query".to_string(), None);
        ctx.raw_draft = Some(crate::narrator::RawDraft {
            text: "The Ruby Mines commands the Crimson Empire.".to_string(),
            entities: vec![
                crate::narrator::RawProposedEntity {
                    entity_type: "faction".to_string(),
                    properties: [("name".to_string(), serde_json::json!("Crimson Empire"))]
                        .into_iter()
                        .collect(),
                },
                crate::narrator::RawProposedEntity {
                    entity_type: "resource".to_string(),
                    properties: [("name".to_string(), serde_json::json!("Ruby Mines"))]
                        .into_iter()
                        .collect(),
                },
            ],
            relationships: vec![crate::narrator::RawProposedRelation {
                // COMMANDS requires a character -> faction endpoint pair; a
                // resource on the `from` side resolves fine but fails
                // `validate_relation`'s endpoint-type check.
                relation_type: "COMMANDS".to_string(),
                from_name: "Ruby Mines".to_string(),
                to_name: "Crimson Empire".to_string(),
            }],
            confidence: 0.5,
            reasoning: String::new(),
        });

        checker(&mut ctx, &graph, 3).await.unwrap();
        let validation = ctx.validation.unwrap();
        assert!(!validation.ok);
        assert!(validation
            .schema_violations
            .iter()
            .any(|v| v.contains("cannot originate from a `resource` entity")));
    }

    #[tokio::test]
    async fn exhausted_iterations_end_fail() {
        let graph = FakeGraphStore::new();
        let mut ctx = WorkflowContext::new("query".to_string(), None);
        ctx.iterations = 3;
        ctx.raw_draft = Some(crate::narrator::RawDraft {
            text: "text".to_string(),
            entities: vec![crate::narrator::RawProposedEntity {
                entity_type: "unknown-type".to_string(),
                properties: Default::default(),
            }],
            relationships: Vec::new(),
            confidence: 0.1,
            reasoning: String::new(),
        });

        let next = checker(&mut ctx, &graph, 3).await.unwrap();
        assert_eq!(next, WorkflowState::EndFail);
    }
}
