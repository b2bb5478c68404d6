//! Data model (spec.md §3): persisted entities/relations/jobs and the
//! transient structs that flow through the ingestion and inference
//! pipelines.

use crate::ids::{CanonicalId, JobId, Timestamp};
use crate::ontology::{EntityType, RelationType};
use crate::{entity_record, record::StoredRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

entity_record! {
    /// A typed node in the world graph (spec.md §3).
    pub struct Entity, table = "entity" {
        pub canonical_id: CanonicalId,
        pub entity_type: EntityType,
        pub properties: HashMap<String, serde_json::Value>,
        pub merged_from: Vec<String>,
    }
}

impl Entity {
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.properties.get("name").and_then(serde_json::Value::as_str)
    }

    #[must_use]
    pub fn alignment(&self) -> Option<&str> {
        self.properties.get("alignment").and_then(serde_json::Value::as_str)
    }
}

entity_record! {
    /// A directed typed edge `(from, type, to)` (spec.md §3).
    pub struct Relation, table = "relation" {
        pub from_canonical_id: CanonicalId,
        pub relation_type: RelationType,
        pub to_canonical_id: CanonicalId,
        pub since: Option<Timestamp>,
        pub properties: HashMap<String, serde_json::Value>,
    }
}

/// Transient, pipeline-internal untyped mention. Created by Extract,
/// destroyed at end of Canonicalize; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub mention: String,
    pub raw_type: String,
    pub raw_attributes: HashMap<String, serde_json::Value>,
    pub confidence: f64,
    pub evidence: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedRelation {
    pub from_mention: String,
    pub to_mention: String,
    pub raw_type: String,
    pub evidence: String,
    pub confidence: f64,
}

/// `ExtractedEntity` plus a resolved ontology label and a temporary id.
/// Bounded to a single ingestion job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedEntity {
    pub temp_id: String,
    pub entity_type: EntityType,
    pub raw_attributes: HashMap<String, serde_json::Value>,
    pub confidence: f64,
    pub mention: String,
}

/// Post-dedup form: final canonical id, final type, merged property bag,
/// and the set of transient ids it subsumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalEntity {
    pub canonical_id: CanonicalId,
    pub entity_type: EntityType,
    pub properties: HashMap<String, serde_json::Value>,
    pub merged_from: Vec<String>,
}

/// Status of an ingestion job (spec.md §3, §8 invariant 7: transitions
/// only pending → running → {completed, partial, failed}).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Partial,
    Failed,
}

impl JobStatus {
    /// True if `next` is a legal successor of `self` under the ordering
    /// pending → running → {completed, partial, failed}.
    #[must_use]
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (
                    JobStatus::Running,
                    JobStatus::Completed | JobStatus::Partial | JobStatus::Failed
                )
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageDurations {
    pub extract_ms: u64,
    pub define_ms: u64,
    pub canonicalize_ms: u64,
    pub write_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionJob {
    pub job_id: JobId,
    pub status: JobStatus,
    pub durations: StageDurations,
    pub entities_created: u64,
    pub relationships_created: u64,
    pub errors: Vec<String>,
    pub total_ms: u64,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

/// Ordered set of graph entities, graph relations, and semantically
/// similar text passages retrieved for one inference query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievedContext {
    pub entities: Vec<Entity>,
    pub relations: Vec<Relation>,
    pub passages: Vec<ScoredPassage>,
    pub relevance_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub text: String,
    pub score: f64,
    pub source_id: Option<String>,
}

/// Model output plus proposed graph writes, confidence, and reasoning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedDraft {
    pub text: String,
    pub entities: Vec<ProposedEntity>,
    pub relationships: Vec<ProposedRelation>,
    pub confidence: f64,
    pub reasoning: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposedEntity {
    pub entity_type: EntityType,
    pub properties: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposedRelation {
    pub relation_type: RelationType,
    pub from_name: String,
    pub to_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contradiction {
    pub canonical_id: CanonicalId,
    pub property: String,
    pub graph_value: serde_json::Value,
    pub proposed_value: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub ok: bool,
    pub schema_violations: Vec<String>,
    pub contradictions: Vec<Contradiction>,
    pub score: f64,
    pub suggestions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_transitions_only_forward() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Running));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Running));
        assert!(!JobStatus::Running.can_transition_to(JobStatus::Pending));
    }

    #[test]
    fn entity_table_name_is_stable() {
        assert_eq!(Entity::table_name(), "entity");
        assert_eq!(Relation::table_name(), "relation");
    }
}
