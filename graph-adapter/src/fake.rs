//! In-memory [`GraphAdapter`] for unit and scenario tests that must run
//! without a SurrealDB dependency at all. Grounded on the teacher's heavy
//! use of `SurrealDbClient::memory(...)` for fast in-process tests,
//! generalized one step further: `ace-inference`/`ace-ingestion` unit
//! tests and the workspace-root end-to-end scenarios need a graph they
//! can seed and inspect directly, without standing up even an in-memory
//! SurrealDB engine.

use crate::types::{ContradictionCandidate, FactionContext, ResourceControlChain};
use crate::GraphAdapter;
use async_trait::async_trait;
use chrono::Utc;
use common::error::{AceError, AceResult};
use common::ids::{CanonicalId, Timestamp};
use common::model::{Entity, Relation};
use common::ontology::{self, EntityType, RelationType};
use std::collections::HashMap;
use std::sync::RwLock;

fn relation_key(from: &CanonicalId, relation_type: RelationType, to: &CanonicalId) -> String {
    format!("{}__{}__{}", from.0, relation_type.as_str(), to.0)
}

/// A `HashMap`-backed [`GraphAdapter`] mirroring `SurrealGraphAdapter`'s
/// semantics (idempotent upsert, endpoint-existence check, ally-chain
/// walk) without any storage engine underneath.
#[derive(Default)]
pub struct FakeGraphStore {
    entities: RwLock<HashMap<String, Entity>>,
    relations: RwLock<HashMap<String, Relation>>,
}

impl FakeGraphStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GraphAdapter for FakeGraphStore {
    async fn upsert_entity(
        &self,
        entity_type: EntityType,
        canonical_id: &CanonicalId,
        properties: HashMap<String, serde_json::Value>,
        merged_from: Vec<String>,
    ) -> AceResult<Entity> {
        let now = Utc::now();
        let mut entities = self.entities.write().unwrap_or_else(|e| e.into_inner());
        let created_at = entities.get(&canonical_id.0).map_or(now, |e| e.created_at);

        let record = Entity {
            id: canonical_id.0.clone(),
            created_at,
            updated_at: now,
            canonical_id: canonical_id.clone(),
            entity_type,
            properties,
            merged_from,
        };
        entities.insert(canonical_id.0.clone(), record.clone());
        Ok(record)
    }

    async fn upsert_relation(
        &self,
        from: &CanonicalId,
        relation_type: RelationType,
        to: &CanonicalId,
        properties: HashMap<String, serde_json::Value>,
        since: Option<Timestamp>,
    ) -> AceResult<Relation> {
        if self.get_entity(from).await?.is_none() || self.get_entity(to).await?.is_none() {
            return Err(AceError::SchemaError(format!(
                "relation endpoint missing: {from} -[{relation_type}]-> {to}"
            )));
        }

        let key = relation_key(from, relation_type, to);
        let now = Utc::now();
        let mut relations = self.relations.write().unwrap_or_else(|e| e.into_inner());
        let created_at = relations.get(&key).map_or(now, |r| r.created_at);

        let record = Relation {
            id: key.clone(),
            created_at,
            updated_at: now,
            from_canonical_id: from.clone(),
            relation_type,
            to_canonical_id: to.clone(),
            since,
            properties,
        };
        relations.insert(key, record.clone());
        Ok(record)
    }

    async fn upsert_entity_with_relations(
        &self,
        entity_type: EntityType,
        canonical_id: &CanonicalId,
        properties: HashMap<String, serde_json::Value>,
        merged_from: Vec<String>,
        relations: Vec<(RelationType, CanonicalId, HashMap<String, serde_json::Value>)>,
    ) -> AceResult<(Entity, Vec<Relation>)> {
        let entity = self
            .upsert_entity(entity_type, canonical_id, properties, merged_from)
            .await?;

        let mut written = Vec::with_capacity(relations.len());
        for (relation_type, to, props) in relations {
            let relation = self
                .upsert_relation(canonical_id, relation_type, &to, props, None)
                .await?;
            written.push(relation);
        }
        Ok((entity, written))
    }

    async fn get_entity(&self, canonical_id: &CanonicalId) -> AceResult<Option<Entity>> {
        Ok(self
            .entities
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&canonical_id.0)
            .cloned())
    }

    async fn get_entity_by_name(
        &self,
        entity_type: EntityType,
        name: &str,
    ) -> AceResult<Option<Entity>> {
        let canonical = ontology::canonical_id(entity_type, name);
        self.get_entity(&canonical).await
    }

    async fn get_all_factions(&self) -> AceResult<Vec<Entity>> {
        let mut factions: Vec<Entity> = self
            .entities
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|e| e.entity_type == EntityType::Faction)
            .cloned()
            .collect();
        factions.sort_by(|a, b| a.canonical_id.cmp(&b.canonical_id));
        Ok(factions)
    }

    async fn get_faction_context(&self, name: &str) -> AceResult<Option<FactionContext>> {
        let Some(faction) = self.get_entity_by_name(EntityType::Faction, name).await? else {
            return Ok(None);
        };

        let relations = self
            .find_relations_for_entities(std::slice::from_ref(&faction.canonical_id))
            .await?;

        let mut resources = Vec::new();
        let mut characters = Vec::new();
        let mut allies = Vec::new();
        let mut events = Vec::new();

        for relation in &relations {
            let other = if relation.from_canonical_id == faction.canonical_id {
                &relation.to_canonical_id
            } else {
                &relation.from_canonical_id
            };
            let Some(other_entity) = self.get_entity(other).await? else {
                continue;
            };
            match relation.relation_type {
                RelationType::ControlsResource => resources.push(other_entity),
                RelationType::Commands | RelationType::MemberOf => characters.push(other_entity),
                RelationType::IsAllyOf => allies.push(other_entity),
                RelationType::ParticipatedIn => events.push(other_entity),
                RelationType::LocatedIn => {}
            }
        }

        Ok(Some(FactionContext {
            faction,
            resources,
            characters,
            allies,
            events,
        }))
    }

    async fn find_indirect_resource_control(
        &self,
        resource: &str,
        max_hops: u8,
    ) -> AceResult<Vec<ResourceControlChain>> {
        let max_hops = max_hops.clamp(1, 3);
        let resource_id = ontology::canonical_id(EntityType::Resource, resource);

        let direct: Vec<Relation> = {
            let relations = self.relations.read().unwrap_or_else(|e| e.into_inner());
            relations
                .values()
                .filter(|r| r.to_canonical_id == resource_id && r.relation_type == RelationType::ControlsResource)
                .cloned()
                .collect()
        };

        let mut chains = Vec::new();
        let mut frontier: Vec<(CanonicalId, Vec<String>)> = direct
            .into_iter()
            .map(|r| (r.from_canonical_id.clone(), vec![r.from_canonical_id.0.clone()]))
            .collect();

        for hop in 0..=max_hops {
            for (faction_id, path) in &frontier {
                if let Some(entity) = self.get_entity(faction_id).await? {
                    chains.push(ResourceControlChain {
                        faction: entity,
                        hops: hop,
                        path: path.clone(),
                    });
                }
            }
            if hop == max_hops {
                break;
            }

            let mut next_frontier = Vec::new();
            for (faction_id, path) in &frontier {
                // IS_ALLY_OF is undirected for chain-walking purposes: an
                // alliance declared either way links both factions.
                let ally_ids: Vec<CanonicalId> = {
                    let relations = self.relations.read().unwrap_or_else(|e| e.into_inner());
                    relations
                        .values()
                        .filter(|r| r.relation_type == RelationType::IsAllyOf)
                        .filter_map(|r| {
                            if r.from_canonical_id == *faction_id {
                                Some(r.to_canonical_id.clone())
                            } else if r.to_canonical_id == *faction_id {
                                Some(r.from_canonical_id.clone())
                            } else {
                                None
                            }
                        })
                        .collect()
                };
                for ally_id in ally_ids {
                    if path.contains(&ally_id.0) {
                        continue;
                    }
                    let mut next_path = path.clone();
                    next_path.push(ally_id.0.clone());
                    next_frontier.push((ally_id, next_path));
                }
            }
            frontier = next_frontier;
        }

        Ok(chains)
    }

    async fn find_potential_contradictions(
        &self,
        faction_a: &str,
        faction_b: &str,
    ) -> AceResult<Vec<ContradictionCandidate>> {
        let Some(a) = self.get_entity_by_name(EntityType::Faction, faction_a).await? else {
            return Ok(Vec::new());
        };
        let Some(b) = self.get_entity_by_name(EntityType::Faction, faction_b).await? else {
            return Ok(Vec::new());
        };

        let mut found = Vec::new();
        for (key, value_a) in &a.properties {
            if let Some(value_b) = b.properties.get(key) {
                if value_a != value_b {
                    found.push(ContradictionCandidate {
                        faction_a: a.clone(),
                        faction_b: b.clone(),
                        property: key.clone(),
                        value_a: value_a.clone(),
                        value_b: value_b.clone(),
                    });
                }
            }
        }
        Ok(found)
    }

    async fn get_events_by_time_range(&self, start: Timestamp, end: Timestamp) -> AceResult<Vec<Entity>> {
        let events = self
            .entities
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|e| {
                e.entity_type == EntityType::Event
                    && e.properties
                        .get("date")
                        .and_then(|v| v.as_str())
                        .and_then(|s| s.parse::<Timestamp>().ok())
                        .is_some_and(|d| d >= start && d <= end)
            })
            .cloned()
            .collect();
        Ok(events)
    }

    async fn find_entities_by_keyword(&self, keyword: &str, limit: u32) -> AceResult<Vec<Entity>> {
        let pattern = keyword.to_lowercase();
        let mut hits: Vec<Entity> = self
            .entities
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|e| {
                e.name()
                    .is_some_and(|name| name.to_lowercase().contains(&pattern))
            })
            .cloned()
            .collect();
        hits.sort_by(|a, b| a.canonical_id.cmp(&b.canonical_id));
        hits.truncate(limit as usize);
        Ok(hits)
    }

    async fn find_relations_for_entities(&self, ids: &[CanonicalId]) -> AceResult<Vec<Relation>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let relations = self
            .relations
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|r| ids.contains(&r.from_canonical_id) || ids.contains(&r.to_canonical_id))
            .cloned()
            .collect();
        Ok(relations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(pairs: &[(&str, &str)]) -> HashMap<String, serde_json::Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), json!(v))).collect()
    }

    #[tokio::test]
    async fn upsert_entity_preserves_created_at_on_re_upsert() {
        let store = FakeGraphStore::new();
        let id = ontology::canonical_id(EntityType::Faction, "Crimson Empire");

        let first = store
            .upsert_entity(EntityType::Faction, &id, props(&[("name", "Crimson Empire")]), vec![])
            .await
            .unwrap();
        let second = store
            .upsert_entity(EntityType::Faction, &id, props(&[("name", "Crimson Empire")]), vec![])
            .await
            .unwrap();

        assert_eq!(first.created_at, second.created_at);
        assert_eq!(store.get_all_factions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn upsert_relation_rejects_missing_endpoint() {
        let store = FakeGraphStore::new();
        let a = ontology::canonical_id(EntityType::Faction, "Crimson Empire");
        let b = ontology::canonical_id(EntityType::Resource, "Ruby Mines");

        store
            .upsert_entity(EntityType::Faction, &a, props(&[("name", "Crimson Empire")]), vec![])
            .await
            .unwrap();

        let err = store
            .upsert_relation(&a, RelationType::ControlsResource, &b, HashMap::new(), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), common::error::ErrorKind::SchemaError);
    }

    #[tokio::test]
    async fn find_indirect_resource_control_walks_ally_chain() {
        let store = FakeGraphStore::new();
        let empire = ontology::canonical_id(EntityType::Faction, "Crimson Empire");
        let ally = ontology::canonical_id(EntityType::Faction, "Ashen Pact");
        let mines = ontology::canonical_id(EntityType::Resource, "Ruby Mines");

        store
            .upsert_entity(EntityType::Faction, &empire, props(&[("name", "Crimson Empire")]), vec![])
            .await
            .unwrap();
        store
            .upsert_entity(EntityType::Faction, &ally, props(&[("name", "Ashen Pact")]), vec![])
            .await
            .unwrap();
        store
            .upsert_entity(EntityType::Resource, &mines, props(&[("name", "Ruby Mines")]), vec![])
            .await
            .unwrap();

        store
            .upsert_relation(&empire, RelationType::ControlsResource, &mines, HashMap::new(), None)
            .await
            .unwrap();
        store
            .upsert_relation(&ally, RelationType::IsAllyOf, &empire, HashMap::new(), None)
            .await
            .unwrap();

        let chains = store.find_indirect_resource_control("Ruby Mines", 2).await.unwrap();
        assert!(chains.iter().any(|c| c.faction.canonical_id == empire && c.hops == 0));
        assert!(chains.iter().any(|c| c.faction.canonical_id == ally && c.hops == 1));
    }
}
