//! Evidence coverage scorer (spec.md §4.9): enumerates evidence points
//! in the retrieved context and marks each covered/missed by the
//! generated text. Score = covered / total.

use common::error::AceResult;
use lm_adapter::temperature::JUDGE;
use lm_adapter::{chat_structured, ChatMessage, LmAdapter, StructuredOutputSchema};
use prompt_registry::PromptRegistry;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct JudgedPoint {
    point: String,
    covered: bool,
}

#[derive(Debug, Deserialize)]
struct CoverageJudgement {
    #[serde(default)]
    evidence_points: Vec<JudgedPoint>,
}

#[derive(Debug, Clone)]
pub struct CoverageResult {
    pub score: f64,
    pub total_points: usize,
    pub missed_points: Vec<String>,
}

fn schema() -> StructuredOutputSchema {
    StructuredOutputSchema {
        name: "coverage_judgement".to_string(),
        schema: serde_json::json!({
            "type": "object",
            "properties": {
                "evidence_points": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "point": { "type": "string" },
                            "covered": { "type": "boolean" }
                        },
                        "required": ["point", "covered"]
                    }
                }
            },
            "required": ["evidence_points"]
        }),
    }
}

/// A context with no evidence points at all is vacuously fully covered.
pub async fn score_evidence_coverage(
    lm: &dyn LmAdapter,
    prompts: &PromptRegistry,
    generated_text: &str,
    retrieved_context: &str,
) -> AceResult<CoverageResult> {
    let prompt = prompts.load("judge-coverage", "0.1.0")?;
    let messages = vec![
        ChatMessage::system(&prompt.content),
        ChatMessage::user(format!(
            "Retrieved context:\n{retrieved_context}\n\nGenerated text:\n{generated_text}"
        )),
    ];

    let judgement: CoverageJudgement = chat_structured(lm, &messages, schema(), JUDGE, 2048, None).await?;
    if judgement.evidence_points.is_empty() {
        return Ok(CoverageResult {
            score: 1.0,
            total_points: 0,
            missed_points: Vec::new(),
        });
    }

    let covered = judgement.evidence_points.iter().filter(|p| p.covered).count();
    let missed_points = judgement
        .evidence_points
        .iter()
        .filter(|p| !p.covered)
        .map(|p| p.point.clone())
        .collect();

    #[allow(clippy::cast_precision_loss)]
    let score = covered as f64 / judgement.evidence_points.len() as f64;

    Ok(CoverageResult {
        score,
        total_points: judgement.evidence_points.len(),
        missed_points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lm_adapter::ScriptedLmAdapter;
    use prompt_registry::PromptRegistry;

    #[tokio::test]
    async fn score_reflects_covered_fraction() {
        let prompts = PromptRegistry::load_embedded();
        let reply = serde_json::json!({
            "evidence_points": [
                { "point": "Crimson Empire controls Ruby Mines", "covered": true },
                { "point": "Ruby Mines produce rubies", "covered": false }
            ]
        });
        let lm = ScriptedLmAdapter::new().with_json_reply(reply);

        let result = score_evidence_coverage(
            &lm,
            &prompts,
            "The Crimson Empire controls the Ruby Mines.",
            "The Crimson Empire controls the Ruby Mines, which produce rubies.",
        )
        .await
        .unwrap();

        assert!((result.score - 0.5).abs() < f64::EPSILON);
        assert_eq!(result.missed_points.len(), 1);
    }
}
