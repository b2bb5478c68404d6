//! Mutable in-flight state threaded through the workflow nodes. Grounded
//! on the teacher's `retrieval-pipeline::pipeline::PipelineContext` (a
//! struct of slots filled in by each stage and read by the next).

use crate::narrator::RawDraft;
use common::model::{GeneratedDraft, RetrievedContext, ValidationResult};
use std::time::Instant;

/// Carries everything one inference query accumulates across Historian,
/// Narrator, and Checker invocations. One `WorkflowContext` per query
/// task — never shared across queries (spec.md §5: "no in-memory state
/// is shared between query tasks").
pub struct WorkflowContext {
    pub query: String,
    pub iterations: u32,
    pub retrieved: RetrievedContext,
    /// The Narrator's most recent raw reply, `None` if it failed to
    /// parse (see [`crate::narrator::narrator`]).
    pub raw_draft: Option<RawDraft>,
    /// The typed draft the Checker built from `raw_draft`, once every
    /// entity/relation type resolved against the closed ontology.
    pub draft: Option<GeneratedDraft>,
    pub validation: Option<ValidationResult>,
    /// Appended validation history so a re-asked Narrator can see why its
    /// previous draft was rejected (spec.md §4.8: "loop to NARRATOR with
    /// the validation result appended to context").
    pub rejection_history: Vec<ValidationResult>,
    pub deadline: Option<Instant>,
}

impl WorkflowContext {
    #[must_use]
    pub fn new(query: String, deadline: Option<Instant>) -> Self {
        Self {
            query,
            iterations: 0,
            retrieved: RetrievedContext::default(),
            raw_draft: None,
            draft: None,
            validation: None,
            rejection_history: Vec::new(),
            deadline,
        }
    }

    /// True once `deadline` has passed. Checked at every adapter call
    /// boundary (spec.md §5: "every operation accepts a deadline").
    #[must_use]
    pub fn deadline_elapsed(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}
