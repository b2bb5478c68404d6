//! Extract stage (spec.md §4.6): one LM call against the extraction
//! prompt, parsed into untyped entity/relation mentions. Grounded on the
//! teacher's `ingestion-pipeline::pipeline::stages::prepare_content`
//! (one stage function, consumes the machine in its starting state,
//! returns it advanced).

use crate::context::PipelineContext;
use crate::state::{map_guard_error, Extracted, IngestionMachine, Ready};
use common::error::AceError;
use common::model::{ExtractedEntity, ExtractedRelation};
use lm_adapter::{chat_structured, ChatMessage, LmAdapter, StructuredOutputSchema};
use prompt_registry::PromptRegistry;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct RawEntity {
    mention: String,
    raw_type: String,
    #[serde(default)]
    raw_attributes: HashMap<String, serde_json::Value>,
    confidence: f64,
    #[serde(default)]
    evidence: String,
}

#[derive(Debug, Deserialize)]
struct RawRelation {
    from_mention: String,
    to_mention: String,
    raw_type: String,
    #[serde(default)]
    evidence: String,
    confidence: f64,
}

#[derive(Debug, Default, Deserialize)]
struct ExtractionResult {
    #[serde(default)]
    entities: Vec<RawEntity>,
    #[serde(default)]
    relations: Vec<RawRelation>,
}

fn extraction_schema() -> StructuredOutputSchema {
    StructuredOutputSchema {
        name: "lore_extraction".to_string(),
        schema: serde_json::json!({
            "type": "object",
            "properties": {
                "entities": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "mention": { "type": "string" },
                            "raw_type": { "type": "string" },
                            "raw_attributes": { "type": "object" },
                            "confidence": { "type": "number" },
                            "evidence": { "type": "string" }
                        },
                        "required": ["mention", "raw_type", "confidence"]
                    }
                },
                "relations": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "from_mention": { "type": "string" },
                            "to_mention": { "type": "string" },
                            "raw_type": { "type": "string" },
                            "evidence": { "type": "string" },
                            "confidence": { "type": "number" }
                        },
                        "required": ["from_mention", "to_mention", "raw_type", "confidence"]
                    }
                }
            },
            "required": ["entities", "relations"]
        }),
    }
}

/// Runs the single extraction LM call. On parse failure, per spec.md
/// §4.6, the stage returns an empty result with the error surfaced as a
/// warning rather than failing outright; the pipeline only short-circuits
/// to `failed` when zero entities come out of it.
pub async fn extract(
    machine: IngestionMachine<(), Ready>,
    ctx: &mut PipelineContext<'_>,
    lm: &dyn LmAdapter,
    prompts: &PromptRegistry,
) -> Result<IngestionMachine<(), Extracted>, AceError> {
    let prompt = prompts.load("extraction", "0.1.0")?;
    let messages = vec![
        ChatMessage::system(&prompt.content),
        ChatMessage::user(&ctx.source_text),
    ];

    let outcome: Result<ExtractionResult, AceError> = chat_structured(
        lm,
        &messages,
        extraction_schema(),
        ctx.config.tuning.extraction_temperature,
        ctx.config.tuning.extraction_max_tokens,
        None,
    )
    .await;

    let result = match outcome {
        Ok(result) => result,
        Err(err) => {
            ctx.warnings.push(format!("extraction parse failed: {err}"));
            ExtractionResult::default()
        }
    };

    ctx.extracted_entities = result
        .entities
        .into_iter()
        .map(|e| ExtractedEntity {
            mention: e.mention,
            raw_type: e.raw_type,
            raw_attributes: e.raw_attributes,
            confidence: e.confidence,
            evidence: e.evidence,
        })
        .collect();
    ctx.extracted_relations = result
        .relations
        .into_iter()
        .map(|r| ExtractedRelation {
            from_mention: r.from_mention,
            to_mention: r.to_mention,
            raw_type: r.raw_type,
            evidence: r.evidence,
            confidence: r.confidence,
        })
        .collect();

    if ctx.extracted_entities.is_empty() {
        return Err(AceError::Validation(
            "extract stage produced zero entities".to_string(),
        ));
    }

    machine
        .extract()
        .map_err(|(_, guard)| map_guard_error("extract", &guard))
}
