//! SurrealDB-backed [`GraphAdapter`], grounded on the teacher's
//! `SurrealDbClient` connection setup (`src/storage/db.rs`) generalized
//! to `engine::any` so the same client type serves a real `ws://`
//! endpoint or an in-memory `mem://` one (used by tests and by the
//! evaluation harness's ephemeral namespaces, the way the teacher's
//! `SurrealDbClient::memory` does for its own tests).

use crate::retry::{classify, with_retry};
use crate::types::{ContradictionCandidate, FactionContext, ResourceControlChain};
use crate::GraphAdapter;
use async_trait::async_trait;
use chrono::Utc;
use common::error::{AceError, AceResult};
use common::ids::{CanonicalId, Timestamp};
use common::model::{Entity, Relation};
use common::ontology::{EntityType, RelationType};
use std::collections::HashMap;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{instrument, warn};

/// A live connection plus the schema bootstrap the adapter depends on.
pub struct SurrealGraphAdapter {
    client: Surreal<Any>,
}

fn relation_record_id(from: &CanonicalId, relation_type: RelationType, to: &CanonicalId) -> String {
    format!("{}__{}__{}", from.0, relation_type.as_str(), to.0)
}

impl SurrealGraphAdapter {
    /// Connects to `uri` (e.g. `mem://` for an ephemeral in-process graph,
    /// or `ws://host:port` for a real SurrealDB server) and signs in when
    /// credentials are non-empty, mirroring the teacher's `Root` sign-in
    /// in `SurrealDbClient::new`.
    #[instrument(skip(password))]
    pub async fn connect(
        uri: &str,
        namespace: &str,
        database: &str,
        username: &str,
        password: &str,
    ) -> AceResult<Self> {
        let client = surrealdb::engine::any::connect(uri)
            .await
            .map_err(|e| AceError::BackendUnavailable(e.to_string()))?;

        if !username.is_empty() {
            client
                .signin(surrealdb::opt::auth::Root { username, password })
                .await
                .map_err(|e| AceError::BackendUnavailable(e.to_string()))?;
        }

        client
            .use_ns(namespace)
            .use_db(database)
            .await
            .map_err(|e| AceError::BackendUnavailable(e.to_string()))?;

        let adapter = SurrealGraphAdapter { client };
        adapter.ensure_schema().await?;
        Ok(adapter)
    }

    /// Convenience constructor for an ephemeral in-memory graph, used by
    /// integration tests and by the evaluation harness.
    pub async fn memory(namespace: &str, database: &str) -> AceResult<Self> {
        Self::connect("mem://", namespace, database, "", "").await
    }

    async fn ensure_schema(&self) -> AceResult<()> {
        self.client
            .query(
                "DEFINE TABLE IF NOT EXISTS entity SCHEMALESS;
                 DEFINE INDEX IF NOT EXISTS entity_canonical_id ON entity FIELDS canonical_id UNIQUE;
                 DEFINE INDEX IF NOT EXISTS entity_type_idx ON entity FIELDS entity_type;
                 DEFINE TABLE IF NOT EXISTS relation SCHEMALESS;
                 DEFINE INDEX IF NOT EXISTS relation_triple ON relation
                   FIELDS from_canonical_id, relation_type, to_canonical_id UNIQUE;",
            )
            .await
            .map_err(|e| AceError::BackendUnavailable(e.to_string()))?;
        Ok(())
    }

    async fn fetch_entity_record(&self, id: &str) -> Result<Option<Entity>, surrealdb::Error> {
        self.client.select(("entity", id)).await
    }
}

#[async_trait]
impl GraphAdapter for SurrealGraphAdapter {
    #[instrument(skip(self, properties))]
    async fn upsert_entity(
        &self,
        entity_type: EntityType,
        canonical_id: &CanonicalId,
        properties: HashMap<String, serde_json::Value>,
        merged_from: Vec<String>,
    ) -> AceResult<Entity> {
        let record_id = canonical_id.0.clone();
        let now = Utc::now();

        let existing = with_retry(|| self.fetch_entity_record(&record_id))
            .await
            .map_err(classify)?;

        let created_at = existing.as_ref().map_or(now, |e| e.created_at);

        let record = Entity {
            id: record_id.clone(),
            created_at,
            updated_at: now,
            canonical_id: canonical_id.clone(),
            entity_type,
            properties,
            merged_from,
        };

        let stored: Option<Entity> = with_retry(|| async {
            self.client
                .update(("entity", record_id.as_str()))
                .content(record.clone())
                .await
        })
        .await
        .map_err(classify)?;

        stored.ok_or_else(|| AceError::Fatal("upsert_entity returned no record".into()))
    }

    #[instrument(skip(self, properties))]
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

        let record_id = relation_record_id(from, relation_type, to);
        let now = Utc::now();

        let existing: Option<Relation> = with_retry(|| self.client.select(("relation", record_id.as_str())))
            .await
            .map_err(classify)?;
        let created_at = existing.as_ref().map_or(now, |r| r.created_at);

        let record = Relation {
            id: record_id.clone(),
            created_at,
            updated_at: now,
            from_canonical_id: from.clone(),
            relation_type,
            to_canonical_id: to.clone(),
            since,
            properties,
        };

        let stored: Option<Relation> = with_retry(|| async {
            self.client
                .update(("relation", record_id.as_str()))
                .content(record.clone())
                .await
        })
        .await
        .map_err(classify)?;

        stored.ok_or_else(|| AceError::Fatal("upsert_relation returned no record".into()))
    }

    #[instrument(skip(self, properties, relations))]
    async fn upsert_entity_with_relations(
        &self,
        entity_type: EntityType,
        canonical_id: &CanonicalId,
        properties: HashMap<String, serde_json::Value>,
        merged_from: Vec<String>,
        relations: Vec<(RelationType, CanonicalId, HashMap<String, serde_json::Value>)>,
    ) -> AceResult<(Entity, Vec<Relation>)> {
        // The entity must exist before its relations can reference it, so
        // the entity write always commits first; if any relation write in
        // the batch fails, the whole group rolls back together.
        let entity = self
            .upsert_entity(entity_type, canonical_id, properties, merged_from)
            .await?;

        let mut written = Vec::with_capacity(relations.len());
        for (relation_type, to, props) in relations {
            match self
                .upsert_relation(canonical_id, relation_type, &to, props, None)
                .await
            {
                Ok(relation) => written.push(relation),
                Err(err) => {
                    warn!(%canonical_id, error = %err, "relation write failed, rolling back group");
                    return Err(err);
                }
            }
        }

        Ok((entity, written))
    }

    async fn get_entity(&self, canonical_id: &CanonicalId) -> AceResult<Option<Entity>> {
        with_retry(|| self.fetch_entity_record(&canonical_id.0))
            .await
            .map_err(classify)
    }

    async fn get_entity_by_name(
        &self,
        entity_type: EntityType,
        name: &str,
    ) -> AceResult<Option<Entity>> {
        let canonical = common::ontology::canonical_id(entity_type, name);
        self.get_entity(&canonical).await
    }

    #[instrument(skip(self))]
    async fn get_all_factions(&self) -> AceResult<Vec<Entity>> {
        let entities: Vec<Entity> = with_retry(|| {
            self.client
                .query("SELECT * FROM entity WHERE entity_type = $t ORDER BY canonical_id")
                .bind(("t", EntityType::Faction))
        })
        .await
        .map_err(classify)?
        .take(0)
        .map_err(|e| AceError::BackendUnavailable(e.to_string()))?;
        Ok(entities)
    }

    #[instrument(skip(self))]
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

    #[instrument(skip(self))]
    async fn find_indirect_resource_control(
        &self,
        resource: &str,
        max_hops: u8,
    ) -> AceResult<Vec<ResourceControlChain>> {
        let max_hops = max_hops.clamp(1, 3);
        let resource_id = common::ontology::canonical_id(EntityType::Resource, resource);

        // Factions directly controlling the resource seed the frontier at
        // hop 0; each subsequent hop walks one IS_ALLY_OF edge.
        let direct: Vec<Relation> = with_retry(|| {
            self.client
                .query(
                    "SELECT * FROM relation WHERE to_canonical_id = $r AND relation_type = $t",
                )
                .bind(("r", resource_id.clone()))
                .bind(("t", RelationType::ControlsResource))
        })
        .await
        .map_err(classify)?
        .take(0)
        .map_err(|e| AceError::BackendUnavailable(e.to_string()))?;

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
                let allies: Vec<Relation> = with_retry(|| {
                    self.client
                        .query(
                            "SELECT * FROM relation WHERE relation_type = $t AND (from_canonical_id = $f OR to_canonical_id = $f)",
                        )
                        .bind(("f", faction_id.clone()))
                        .bind(("t", RelationType::IsAllyOf))
                })
                .await
                .map_err(classify)?
                .take(0)
                .map_err(|e| AceError::BackendUnavailable(e.to_string()))?;

                for ally in allies {
                    let ally_id = if ally.from_canonical_id == *faction_id {
                        ally.to_canonical_id
                    } else {
                        ally.from_canonical_id
                    };
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

    #[instrument(skip(self))]
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

    #[instrument(skip(self))]
    async fn get_events_by_time_range(&self, start: Timestamp, end: Timestamp) -> AceResult<Vec<Entity>> {
        let entities: Vec<Entity> = with_retry(|| {
            self.client
                .query(
                    "SELECT * FROM entity WHERE entity_type = $t
                     AND time::from::unix(<int>properties.date) >= $start
                     AND time::from::unix(<int>properties.date) <= $end",
                )
                .bind(("t", EntityType::Event))
                .bind(("start", start))
                .bind(("end", end))
        })
        .await
        .map_err(classify)?
        .take(0)
        .map_err(|e| AceError::BackendUnavailable(e.to_string()))?;
        Ok(entities)
    }

    #[instrument(skip(self))]
    async fn find_entities_by_keyword(&self, keyword: &str, limit: u32) -> AceResult<Vec<Entity>> {
        let pattern = format!("%{}%", keyword.to_lowercase());
        let entities: Vec<Entity> = with_retry(|| {
            self.client
                .query(
                    "SELECT * FROM entity WHERE string::lowercase(<string>properties.name ?? '') ~ $p LIMIT $limit",
                )
                .bind(("p", pattern.clone()))
                .bind(("limit", limit))
        })
        .await
        .map_err(classify)?
        .take(0)
        .map_err(|e| AceError::BackendUnavailable(e.to_string()))?;
        Ok(entities)
    }

    #[instrument(skip(self, ids))]
    async fn find_relations_for_entities(&self, ids: &[CanonicalId]) -> AceResult<Vec<Relation>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let id_strings: Vec<String> = ids.iter().map(|id| id.0.clone()).collect();
        let relations: Vec<Relation> = with_retry(|| {
            self.client
                .query(
                    "SELECT * FROM relation
                     WHERE from_canonical_id IN $ids OR to_canonical_id IN $ids",
                )
                .bind(("ids", id_strings.clone()))
        })
        .await
        .map_err(classify)?
        .take(0)
        .map_err(|e| AceError::BackendUnavailable(e.to_string()))?;
        Ok(relations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    async fn test_adapter() -> SurrealGraphAdapter {
        SurrealGraphAdapter::memory("test_ns", &Uuid::new_v4().to_string())
            .await
            .expect("in-memory graph adapter")
    }

    fn props(pairs: &[(&str, &str)]) -> HashMap<String, serde_json::Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect()
    }

    #[tokio::test]
    async fn upsert_entity_is_idempotent_on_canonical_id() {
        let adapter = test_adapter().await;
        let id = common::ontology::canonical_id(EntityType::Faction, "Crimson Empire");

        let first = adapter
            .upsert_entity(
                EntityType::Faction,
                &id,
                props(&[("name", "Crimson Empire"), ("alignment", "Lawful Evil")]),
                vec!["temp_faction_0_1".into()],
            )
            .await
            .unwrap();

        let second = adapter
            .upsert_entity(
                EntityType::Faction,
                &id,
                props(&[("name", "Crimson Empire"), ("alignment", "Lawful Evil")]),
                vec!["temp_faction_0_1".into()],
            )
            .await
            .unwrap();

        assert_eq!(first.created_at, second.created_at);
        assert!(second.updated_at >= first.updated_at);

        let all = adapter.get_all_factions().await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn upsert_relation_rejects_missing_endpoint() {
        let adapter = test_adapter().await;
        let a = common::ontology::canonical_id(EntityType::Faction, "Crimson Empire");
        let b = common::ontology::canonical_id(EntityType::Resource, "Ruby Mines");

        adapter
            .upsert_entity(EntityType::Faction, &a, props(&[("name", "Crimson Empire"), ("alignment", "Evil")]), vec![])
            .await
            .unwrap();

        let err = adapter
            .upsert_relation(&a, RelationType::ControlsResource, &b, HashMap::new(), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), common::error::ErrorKind::SchemaError);
    }

    #[tokio::test]
    async fn find_indirect_resource_control_walks_ally_chain() {
        let adapter = test_adapter().await;
        let empire = common::ontology::canonical_id(EntityType::Faction, "Crimson Empire");
        let ally = common::ontology::canonical_id(EntityType::Faction, "Ashen Pact");
        let mines = common::ontology::canonical_id(EntityType::Resource, "Ruby Mines");

        adapter
            .upsert_entity(EntityType::Faction, &empire, props(&[("name", "Crimson Empire"), ("alignment", "Evil")]), vec![])
            .await
            .unwrap();
        adapter
            .upsert_entity(EntityType::Faction, &ally, props(&[("name", "Ashen Pact"), ("alignment", "Neutral")]), vec![])
            .await
            .unwrap();
        adapter
            .upsert_entity(EntityType::Resource, &mines, props(&[("name", "Ruby Mines"), ("type", "mineral")]), vec![])
            .await
            .unwrap();

        adapter
            .upsert_relation(&empire, RelationType::ControlsResource, &mines, HashMap::new(), None)
            .await
            .unwrap();
        adapter
            .upsert_relation(&ally, RelationType::IsAllyOf, &empire, HashMap::new(), None)
            .await
            .unwrap();

        let chains = adapter
            .find_indirect_resource_control("Ruby Mines", 2)
            .await
            .unwrap();

        assert!(chains.iter().any(|c| c.faction.canonical_id == empire && c.hops == 0));
        assert!(chains.iter().any(|c| c.faction.canonical_id == ally && c.hops == 1));
    }
}
