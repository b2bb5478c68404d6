//! Mutable in-flight state threaded through the EDC stages. Grounded on
//! the teacher's `ingestion-pipeline::pipeline::context::PipelineContext`
//! (a struct of `Option<T>` slots filled in by each stage and taken by
//! the next).

use crate::config::IngestionConfig;
use common::ids::CanonicalId;
use common::model::{CanonicalEntity, ClassifiedEntity, ExtractedEntity, ExtractedRelation};
use common::ontology::RelationType;
use std::collections::HashMap;

/// A relation after Define: endpoints are still free-text mentions, but
/// the label has been normalized via C1's static mapping.
#[derive(Debug, Clone)]
pub struct DefinedRelation {
    pub from_mention: String,
    pub to_mention: String,
    pub relation_type: RelationType,
    pub evidence: String,
}

/// A relation after Canonicalize: both endpoints resolved to canonical
/// ids. Relations that fail to resolve are dropped before this point
/// (spec.md §4.6).
#[derive(Debug, Clone)]
pub struct CanonicalRelation {
    pub from_canonical_id: CanonicalId,
    pub relation_type: RelationType,
    pub to_canonical_id: CanonicalId,
    pub evidence: String,
}

pub struct PipelineContext<'a> {
    pub config: &'a IngestionConfig,
    pub source_text: String,
    pub source_id: Option<String>,
    pub metadata: HashMap<String, serde_json::Value>,

    pub extracted_entities: Vec<ExtractedEntity>,
    pub extracted_relations: Vec<ExtractedRelation>,

    pub classified_entities: Vec<ClassifiedEntity>,
    pub defined_relations: Vec<DefinedRelation>,

    pub canonical_entities: Vec<CanonicalEntity>,
    pub canonical_relations: Vec<CanonicalRelation>,

    pub entities_written: u64,
    pub relationships_written: u64,

    pub warnings: Vec<String>,
}

impl<'a> PipelineContext<'a> {
    #[must_use]
    pub fn new(
        config: &'a IngestionConfig,
        source_text: String,
        source_id: Option<String>,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            config,
            source_text,
            source_id,
            metadata,
            extracted_entities: Vec::new(),
            extracted_relations: Vec::new(),
            classified_entities: Vec::new(),
            defined_relations: Vec::new(),
            canonical_entities: Vec::new(),
            canonical_relations: Vec::new(),
            entities_written: 0,
            relationships_written: 0,
            warnings: Vec::new(),
        }
    }
}
