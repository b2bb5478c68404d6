//! Answer accuracy scorer (spec.md §4.9): an optional, reference-based
//! score combining factual consistency against the expected answer
//! (70%) with embedding cosine similarity (30%). Only runs when a
//! golden test case carries an `expected` answer.

use common::error::AceResult;
use lm_adapter::temperature::JUDGE;
use lm_adapter::{chat_structured, ChatMessage, LmAdapter, StructuredOutputSchema};
use prompt_registry::PromptRegistry;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct JudgedClaim {
    consistent: bool,
}

#[derive(Debug, Deserialize)]
struct ConsistencyJudgement {
    #[serde(default)]
    claims: Vec<JudgedClaim>,
}

#[derive(Debug, Clone)]
pub struct AccuracyResult {
    pub score: f64,
    pub factual_consistency: f64,
    pub semantic_similarity: f64,
}

const FACTUAL_WEIGHT: f64 = 0.7;
const SEMANTIC_WEIGHT: f64 = 0.3;

fn schema() -> StructuredOutputSchema {
    StructuredOutputSchema {
        name: "consistency_judgement".to_string(),
        schema: serde_json::json!({
            "type": "object",
            "properties": {
                "claims": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "consistent": { "type": "boolean" }
                        },
                        "required": ["consistent"]
                    }
                }
            },
            "required": ["claims"]
        }),
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    f64::from(dot / (norm_a * norm_b))
}

/// Scores `generated_text` against a reference `expected` answer.
pub async fn score_answer_accuracy(
    lm: &dyn LmAdapter,
    prompts: &PromptRegistry,
    generated_text: &str,
    expected: &str,
) -> AceResult<AccuracyResult> {
    let prompt = prompts.load("judge-faithfulness", "0.1.0")?;
    let messages = vec![
        ChatMessage::system(&prompt.content),
        ChatMessage::user(format!(
            "Reference answer:\n{expected}\n\nCandidate answer:\n{generated_text}"
        )),
    ];

    let judgement: ConsistencyJudgement = chat_structured(lm, &messages, schema(), JUDGE, 1024, None).await?;
    let factual_consistency = if judgement.claims.is_empty() {
        1.0
    } else {
        let consistent = judgement.claims.iter().filter(|c| c.consistent).count();
        #[allow(clippy::cast_precision_loss)]
        let ratio = consistent as f64 / judgement.claims.len() as f64;
        ratio
    };

    let generated_embedding = lm.embed(generated_text).await?;
    let expected_embedding = lm.embed(expected).await?;
    let semantic_similarity = cosine_similarity(&generated_embedding, &expected_embedding).clamp(0.0, 1.0);

    let score = FACTUAL_WEIGHT * factual_consistency + SEMANTIC_WEIGHT * semantic_similarity;

    Ok(AccuracyResult {
        score,
        factual_consistency,
        semantic_similarity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lm_adapter::ScriptedLmAdapter;
    use prompt_registry::PromptRegistry;

    #[tokio::test]
    async fn combines_consistency_and_similarity() {
        let prompts = PromptRegistry::load_embedded();
        let reply = serde_json::json!({ "claims": [{ "consistent": true }, { "consistent": true }] });
        let lm = ScriptedLmAdapter::new().with_json_reply(reply);

        let result = score_answer_accuracy(
            &lm,
            &prompts,
            "The Crimson Empire controls the Ruby Mines.",
            "The Crimson Empire controls the Ruby Mines.",
        )
        .await
        .unwrap();

        assert!((result.factual_consistency - 1.0).abs() < f64::EPSILON);
        assert!(result.score > 0.0);
    }
}
