//! Result shapes for the Graph Adapter's read templates (spec.md §4.2).
//! These are adapter-specific view models, not persisted records — they
//! exist only to carry the answer of one named query back to a caller.

use common::model::{Entity, Relation};
use serde::{Deserialize, Serialize};

/// `get_faction_context(name)`: a faction with its resources, key
/// characters, allies, and events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactionContext {
    pub faction: Entity,
    pub resources: Vec<Entity>,
    pub characters: Vec<Entity>,
    pub allies: Vec<Entity>,
    pub events: Vec<Entity>,
}

/// One hop in an ally-chain resource control path found by
/// `find_indirect_resource_control`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceControlChain {
    pub faction: Entity,
    pub hops: u8,
    pub path: Vec<String>,
}

/// A pair of properties that disagree between two factions' shared
/// relations, surfaced by `find_potential_contradictions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContradictionCandidate {
    pub faction_a: Entity,
    pub faction_b: Entity,
    pub property: String,
    pub value_a: serde_json::Value,
    pub value_b: serde_json::Value,
}
