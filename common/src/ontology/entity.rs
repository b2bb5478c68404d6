//! Closed entity-type label set and per-type required-field validation,
//! grounded on the teacher's `KnowledgeEntityType` (`variants()`,
//! `From<String>` lower-cased match) generalized so validation never
//! guesses: an unknown type is an error, not a default.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// The closed set of entity labels (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Faction,
    Character,
    Location,
    Resource,
    Event,
}

impl EntityType {
    #[must_use]
    pub fn variants() -> &'static [EntityType] {
        &[
            EntityType::Faction,
            EntityType::Character,
            EntityType::Location,
            EntityType::Resource,
            EntityType::Event,
        ]
    }

    /// Required property keys for this type (spec.md §3).
    #[must_use]
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            EntityType::Faction => &["name", "alignment"],
            EntityType::Character => &["name", "role"],
            EntityType::Location => &["name", "type"],
            EntityType::Resource => &["name", "type"],
            EntityType::Event => &["name", "type", "date"],
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Faction => "faction",
            EntityType::Character => "character",
            EntityType::Location => "location",
            EntityType::Resource => "resource",
            EntityType::Event => "event",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a raw string doesn't name a closed-set entity type.
/// Unlike the teacher's `From<String> for KnowledgeEntityType` (which
/// defaults to a catch-all variant), ontology validation never guesses.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown entity type: {0}")]
pub struct UnknownEntityType(pub String);

impl FromStr for EntityType {
    type Err = UnknownEntityType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "faction" => Ok(EntityType::Faction),
            "character" => Ok(EntityType::Character),
            "location" => Ok(EntityType::Location),
            "resource" => Ok(EntityType::Resource),
            "event" => Ok(EntityType::Event),
            other => Err(UnknownEntityType(other.to_string())),
        }
    }
}

/// Outcome of `validate_entity`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub ok: bool,
    pub errors: Vec<String>,
}

impl ValidationOutcome {
    fn ok() -> Self {
        ValidationOutcome {
            ok: true,
            errors: Vec::new(),
        }
    }

    fn failed(errors: Vec<String>) -> Self {
        ValidationOutcome { ok: false, errors }
    }
}

/// Validates that every required field for `entity_type` is present in
/// `attrs`. Missing fields are enumerated; nothing is filled in or
/// guessed (spec.md §4.1).
#[must_use]
pub fn validate_entity(entity_type: EntityType, attrs: &HashMap<String, Value>) -> ValidationOutcome {
    let missing: Vec<String> = entity_type
        .required_fields()
        .iter()
        .filter(|field| !attrs.contains_key(**field))
        .map(|field| format!("missing required field `{field}` for entity type `{entity_type}`"))
        .collect();

    if missing.is_empty() {
        ValidationOutcome::ok()
    } else {
        ValidationOutcome::failed(missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn faction_requires_name_and_alignment() {
        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), json!("Crimson Empire"));
        let outcome = validate_entity(EntityType::Faction, &attrs);
        assert!(!outcome.ok);
        assert_eq!(outcome.errors.len(), 1);

        attrs.insert("alignment".to_string(), json!("Lawful Evil"));
        let outcome = validate_entity(EntityType::Faction, &attrs);
        assert!(outcome.ok);
    }

    #[test]
    fn unknown_type_string_is_rejected_not_defaulted() {
        assert!(EntityType::from_str("spaceship").is_err());
    }

    #[test]
    fn variants_round_trip_through_as_str() {
        for variant in EntityType::variants() {
            assert_eq!(EntityType::from_str(variant.as_str()).unwrap(), *variant);
        }
    }
}
