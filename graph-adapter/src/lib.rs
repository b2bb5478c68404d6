//! Graph Adapter (C2): parameterized idempotent writes and read templates
//! against a property graph. Grounded on the teacher's `SurrealDbClient`
//! (`src/storage/db.rs`, `src/ingress/jobqueue.rs`) and its raw-query
//! read helpers (`src/retrieval/graph.rs`, `query_helper.rs`), generalized
//! behind a trait so the external graph store stays pluggable (spec.md
//! §6) and so every other component only ever calls typed methods here —
//! spec.md §4.2: "the adapter is the only component allowed to emit
//! native graph queries."

pub mod fake;
pub mod retry;
pub mod surreal;
pub mod types;

use async_trait::async_trait;
use common::error::AceResult;
use common::ids::{CanonicalId, Timestamp};
use common::model::{Entity, Relation};
use common::ontology::{EntityType, RelationType};
use std::collections::HashMap;

pub use fake::FakeGraphStore;
pub use surreal::SurrealGraphAdapter;
pub use types::{ContradictionCandidate, FactionContext, ResourceControlChain};

/// Every write is an upsert keyed on `canonical_id` (entities) or
/// `(from, type, to)` (relations); every read is a named template. No
/// caller outside this trait's implementor may construct a native graph
/// query (spec.md §4.2).
#[async_trait]
pub trait GraphAdapter: Send + Sync {
    /// Upserts an entity keyed on `canonical_id`. Preserves the original
    /// `created_at` on an existing record and always refreshes
    /// `updated_at`.
    async fn upsert_entity(
        &self,
        entity_type: EntityType,
        canonical_id: &CanonicalId,
        properties: HashMap<String, serde_json::Value>,
        merged_from: Vec<String>,
    ) -> AceResult<Entity>;

    /// Upserts a relation keyed on `(from, type, to)`. Both endpoints
    /// must already exist as entities or the write fails with
    /// `SchemaError`.
    async fn upsert_relation(
        &self,
        from: &CanonicalId,
        relation_type: RelationType,
        to: &CanonicalId,
        properties: HashMap<String, serde_json::Value>,
        since: Option<Timestamp>,
    ) -> AceResult<Relation>;

    /// Upserts one entity and its outgoing relations in a single
    /// transaction, rolling back all of it on any error (spec.md §4.2:
    /// "multi-statement writes for a single canonical entity and its
    /// relations run in a single transaction").
    async fn upsert_entity_with_relations(
        &self,
        entity_type: EntityType,
        canonical_id: &CanonicalId,
        properties: HashMap<String, serde_json::Value>,
        merged_from: Vec<String>,
        relations: Vec<(RelationType, CanonicalId, HashMap<String, serde_json::Value>)>,
    ) -> AceResult<(Entity, Vec<Relation>)>;

    async fn get_entity(&self, canonical_id: &CanonicalId) -> AceResult<Option<Entity>>;

    /// Looks up an entity by its display name and type — used by the
    /// Consistency Checker to find the persisted counterpart of a
    /// proposed entity (spec.md §4.8).
    async fn get_entity_by_name(
        &self,
        entity_type: EntityType,
        name: &str,
    ) -> AceResult<Option<Entity>>;

    async fn get_all_factions(&self) -> AceResult<Vec<Entity>>;

    async fn get_faction_context(&self, name: &str) -> AceResult<Option<FactionContext>>;

    /// Ally-chain control: does any faction reach `resource` within
    /// `max_hops` (1-3) through a chain of `IS_ALLY_OF` edges from a
    /// faction that directly `CONTROLS_RESOURCE` it?
    async fn find_indirect_resource_control(
        &self,
        resource: &str,
        max_hops: u8,
    ) -> AceResult<Vec<ResourceControlChain>>;

    async fn find_potential_contradictions(
        &self,
        faction_a: &str,
        faction_b: &str,
    ) -> AceResult<Vec<ContradictionCandidate>>;

    async fn get_events_by_time_range(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> AceResult<Vec<Entity>>;

    async fn find_entities_by_keyword(&self, keyword: &str, limit: u32) -> AceResult<Vec<Entity>>;

    async fn find_relations_for_entities(&self, ids: &[CanonicalId]) -> AceResult<Vec<Relation>>;
}
