//! Ontology & Schemas (C1): closed label sets, validation, and
//! deterministic canonical-id / relation-label normalization.

pub mod entity;
pub mod relation;

pub use entity::{validate_entity, EntityType, UnknownEntityType, ValidationOutcome};
pub use relation::{normalize_relation_label, validate_relation, RelationType, UnknownRelationType};

use crate::ids::CanonicalId;

/// Lowercases, trims, and replaces whitespace runs with `-`. Contains only
/// `[a-z0-9-]` afterward (spec.md §8 invariant 9).
#[must_use]
pub fn slug(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut last_was_dash = false;
    for ch in lowered.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
            last_was_dash = false;
        } else if !last_was_dash {
            out.push('-');
            last_was_dash = true;
        }
    }
    out.trim_matches('-').to_string()
}

/// `canonical_id(type, name) = lower(type) + "-" + slug(name)`
/// (spec.md §4.1). Pure and deterministic so ingestion from different
/// documents about the same entity converges.
#[must_use]
pub fn canonical_id(entity_type: EntityType, name: &str) -> CanonicalId {
    CanonicalId(format!("{}-{}", entity_type.as_str(), slug(name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_contains_only_lowercase_alnum_and_dash() {
        let s = slug("  The Crimson   Empire!! ");
        assert_eq!(s, "the-crimson-empire");
        assert!(s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
    }

    #[test]
    fn slug_is_idempotent() {
        for raw in ["The Crimson Empire", "emperor-valen", "  multi   space  "] {
            let once = slug(raw);
            let twice = slug(&once);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn canonical_id_matches_type_and_slug() {
        let id = canonical_id(EntityType::Faction, "The Crimson Empire");
        assert_eq!(id.0, "faction-the-crimson-empire");
    }

    #[test]
    fn canonical_id_is_derivable_not_stored() {
        let a = canonical_id(EntityType::Character, "Emperor Valen");
        let b = canonical_id(EntityType::Character, "emperor   valen");
        assert_eq!(a, b);
    }
}
