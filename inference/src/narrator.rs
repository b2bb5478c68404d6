//! Narrator node (spec.md §4.8): structured generation grounded only in
//! the Historian's retrieved context. Grounded on the teacher's
//! `IngestionEnricher::perform_analysis` (`ResponseFormat::JsonSchema`,
//! `strict: Some(true)`) generalized from lore enrichment to in-world
//! question answering.

use crate::context::WorkflowContext;
use crate::state::WorkflowState;
use common::error::{AceError, AceResult};
use common::model::{Entity, Relation, ScoredPassage};
use lm_adapter::temperature::NARRATION;
use lm_adapter::{chat_structured, ChatMessage, LmAdapter, StructuredOutputSchema};
use prompt_registry::PromptRegistry;
use serde::Deserialize;
use std::collections::HashMap;

/// The Narrator's raw structured reply, kept string-typed on
/// `entity_type`/`relation_type` so unrecognized labels become Checker
/// schema violations rather than a parse failure — mirrors the
/// Define stage's "unknown type drops the mention with a warning"
/// policy, except here the Checker is the one recording it.
#[derive(Debug, Deserialize)]
pub struct RawDraft {
    pub text: String,
    #[serde(default)]
    pub entities: Vec<RawProposedEntity>,
    #[serde(default)]
    pub relationships: Vec<RawProposedRelation>,
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Deserialize)]
pub struct RawProposedEntity {
    pub entity_type: String,
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct RawProposedRelation {
    pub relation_type: String,
    pub from_name: String,
    pub to_name: String,
}

fn narrator_schema() -> StructuredOutputSchema {
    StructuredOutputSchema {
        name: "narrator_response".to_string(),
        schema: serde_json::json!({
            "type": "object",
            "properties": {
                "text": { "type": "string" },
                "entities": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "entity_type": { "type": "string" },
                            "properties": { "type": "object" }
                        },
                        "required": ["entity_type"]
                    }
                },
                "relationships": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "relation_type": { "type": "string" },
                            "from_name": { "type": "string" },
                            "to_name": { "type": "string" }
                        },
                        "required": ["relation_type", "from_name", "to_name"]
                    }
                },
                "confidence": { "type": "number" },
                "reasoning": { "type": "string" }
            },
            "required": ["text", "confidence"]
        }),
    }
}

fn top<T: Clone>(items: &[T], n: usize) -> Vec<T> {
    items.iter().take(n).cloned().collect()
}

/// Assembles the Narrator's context summary: top 10 entities, top 10
/// relations, top 3 vector passages (spec.md §4.8).
#[must_use]
pub fn context_summary(entities: &[Entity], relations: &[Relation], passages: &[ScoredPassage]) -> String {
    let mut summary = String::new();
    summary.push_str("Known entities:\n");
    for entity in top(entities, 10) {
        summary.push_str(&format!(
            "- {} ({}): {}\n",
            entity.name().unwrap_or("unnamed"),
            entity.entity_type,
            serde_json::to_string(&entity.properties).unwrap_or_default()
        ));
    }
    summary.push_str("Known relations:\n");
    for relation in top(relations, 10) {
        summary.push_str(&format!(
            "- {} -[{}]-> {}\n",
            relation.from_canonical_id, relation.relation_type, relation.to_canonical_id
        ));
    }
    summary.push_str("Supporting passages:\n");
    for passage in top(passages, 3) {
        summary.push_str(&format!("- {}\n", passage.text));
    }
    summary
}

/// Runs the Narrator node. On parse failure, propagates a checker-style
/// invalid result with `suggestions: ["reparse"]` instead of failing the
/// workflow (spec.md §4.8) — the Checker node sees `ctx.draft == None`
/// and the pre-filled validation and skips straight to the iteration
/// policy.
pub async fn narrator(
    ctx: &mut WorkflowContext,
    lm: &dyn LmAdapter,
    prompts: &PromptRegistry,
    max_tokens: u32,
    lm_request_deadline_ms: u64,
) -> AceResult<WorkflowState> {
    if ctx.deadline_elapsed() {
        return Err(AceError::Cancelled("deadline elapsed before narrator".into()));
    }

    let prompt = prompts.load("narrator", "0.1.0")?;
    let summary = context_summary(&ctx.retrieved.entities, &ctx.retrieved.relations, &ctx.retrieved.passages);

    let mut messages = vec![
        ChatMessage::system(&prompt.content),
        ChatMessage::user(format!("Query: {}\n\nContext:\n{}", ctx.query, summary)),
    ];
    for rejection in &ctx.rejection_history {
        messages.push(ChatMessage::user(format!(
            "Your previous answer was rejected by the consistency checker: {} \
             (contradictions: {}). Revise your answer to address this.",
            rejection.schema_violations.join("; "),
            rejection
                .contradictions
                .iter()
                .map(|c| format!("{} ({})", c.canonical_id, c.property))
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }

    let outcome: AceResult<RawDraft> = chat_structured(
        lm,
        &messages,
        narrator_schema(),
        NARRATION,
        max_tokens,
        Some(lm_request_deadline_ms),
    )
    .await;

    match outcome {
        Ok(raw) => {
            ctx.raw_draft = Some(raw);
            Ok(WorkflowState::Checker)
        }
        Err(AceError::MalformedOutput(detail)) => {
            ctx.raw_draft = None;
            ctx.validation = Some(common::model::ValidationResult {
                ok: false,
                schema_violations: vec![format!("narrator output did not parse: {detail}")],
                contradictions: Vec::new(),
                score: 0.0,
                suggestions: vec!["reparse".to_string()],
            });
            Ok(WorkflowState::Checker)
        }
        Err(other) => Err(other),
    }
}
