//! Shared ontology, error taxonomy, configuration, and record plumbing used
//! by every other ACE crate.

pub mod config;
pub mod error;
pub mod ids;
pub mod model;
pub mod ontology;
pub mod record;

pub use error::{AceError, AceResult};
