//! `entity_record!` — generates the `id` / `created_at` / `updated_at`
//! plumbing and a [`StoredRecord`] impl for a persisted type, the way the
//! teacher's `stored_object!` macro does for `KnowledgeEntity` /
//! `IngestionTask`. Unlike the teacher's macro (which targets a generic
//! `SurrealDbClient::store_item::<T>()`), ACE's persisted types are always
//! written through the Graph Adapter's typed upsert methods (spec.md
//! §4.2: "the adapter is the only component allowed to emit native graph
//! queries"), so this macro only supplies the record shape and trait, not
//! a generic store/get implementation.

use crate::ids::Timestamp;

/// A persisted record: something with a stable identity and row lifetime.
pub trait StoredRecord {
    /// The storage table/collection name.
    fn table_name() -> &'static str;
    fn record_id(&self) -> &str;
    fn created_at(&self) -> Timestamp;
    fn updated_at(&self) -> Timestamp;
}

/// Declares a struct with `id: String`, `created_at: Timestamp`,
/// `updated_at: Timestamp` plus the given fields, and implements
/// [`StoredRecord`] for it.
///
/// ```ignore
/// entity_record! {
///     pub struct Entity, table = "entity" {
///         pub canonical_id: CanonicalId,
///         pub entity_type: EntityType,
///         pub properties: HashMap<String, serde_json::Value>,
///         pub merged_from: Vec<String>,
///     }
/// }
/// ```
#[macro_export]
macro_rules! entity_record {
    (
        $(#[$meta:meta])*
        pub struct $name:ident, table = $table:literal {
            $( $(#[$field_meta:meta])* pub $field:ident : $ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
        pub struct $name {
            pub id: String,
            pub created_at: $crate::ids::Timestamp,
            pub updated_at: $crate::ids::Timestamp,
            $( $(#[$field_meta])* pub $field : $ty ),*
        }

        impl $crate::record::StoredRecord for $name {
            fn table_name() -> &'static str {
                $table
            }

            fn record_id(&self) -> &str {
                &self.id
            }

            fn created_at(&self) -> $crate::ids::Timestamp {
                self.created_at
            }

            fn updated_at(&self) -> $crate::ids::Timestamp {
                self.updated_at
            }
        }
    };
}
