//! The ACE inference workflow: Historian → Narrator → Checker (spec.md
//! §4.8). A question enters as free text, the Historian retrieves
//! grounding context from the graph and vector stores, the Narrator
//! drafts an answer plus proposed world-state updates, and the Checker
//! validates the draft against the closed ontology and the live graph
//! before the workflow either returns an answer or retries.

pub mod checker;
pub mod config;
pub mod context;
pub mod historian;
pub mod narrator;
pub mod state;
pub mod stopwords;
pub mod workflow;

pub use config::InferenceConfig;
pub use state::WorkflowState;
pub use workflow::{InferenceResponse, InferenceWorkflow};
