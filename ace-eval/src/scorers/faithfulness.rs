//! Faithfulness scorer (spec.md §4.9): breaks the generated text into
//! atomic claims and marks each grounded/ungrounded against the
//! retrieved context. Score = grounded / total.

use common::error::AceResult;
use lm_adapter::temperature::JUDGE;
use lm_adapter::{chat_structured, ChatMessage, LmAdapter, StructuredOutputSchema};
use prompt_registry::PromptRegistry;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct JudgedClaim {
    claim: String,
    grounded: bool,
}

#[derive(Debug, Deserialize)]
struct FaithfulnessJudgement {
    #[serde(default)]
    claims: Vec<JudgedClaim>,
}

#[derive(Debug, Clone)]
pub struct FaithfulnessResult {
    pub score: f64,
    pub total_claims: usize,
    pub ungrounded_claims: Vec<String>,
}

fn schema() -> StructuredOutputSchema {
    StructuredOutputSchema {
        name: "faithfulness_judgement".to_string(),
        schema: serde_json::json!({
            "type": "object",
            "properties": {
                "claims": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "claim": { "type": "string" },
                            "grounded": { "type": "boolean" }
                        },
                        "required": ["claim", "grounded"]
                    }
                }
            },
            "required": ["claims"]
        }),
    }
}

/// Asks the judge to mark each atomic claim in `generated_text` grounded
/// or ungrounded against `retrieved_context`. An empty generated text is
/// vacuously fully faithful (no claims to contradict the context).
pub async fn score_faithfulness(
    lm: &dyn LmAdapter,
    prompts: &PromptRegistry,
    generated_text: &str,
    retrieved_context: &str,
) -> AceResult<FaithfulnessResult> {
    let prompt = prompts.load("judge-faithfulness", "0.1.0")?;
    let messages = vec![
        ChatMessage::system(&prompt.content),
        ChatMessage::user(format!(
            "Retrieved context:\n{retrieved_context}\n\nGenerated text:\n{generated_text}"
        )),
    ];

    let judgement: FaithfulnessJudgement = chat_structured(lm, &messages, schema(), JUDGE, 2048, None).await?;
    if judgement.claims.is_empty() {
        return Ok(FaithfulnessResult {
            score: 1.0,
            total_claims: 0,
            ungrounded_claims: Vec::new(),
        });
    }

    let grounded = judgement.claims.iter().filter(|c| c.grounded).count();
    let ungrounded_claims = judgement
        .claims
        .iter()
        .filter(|c| !c.grounded)
        .map(|c| c.claim.clone())
        .collect();

    #[allow(clippy::cast_precision_loss)]
    let score = grounded as f64 / judgement.claims.len() as f64;

    Ok(FaithfulnessResult {
        score,
        total_claims: judgement.claims.len(),
        ungrounded_claims,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lm_adapter::ScriptedLmAdapter;
    use prompt_registry::PromptRegistry;

    #[tokio::test]
    async fn score_reflects_grounded_fraction() {
        let prompts = PromptRegistry::load_embedded();
        let reply = serde_json::json!({
            "claims": [
                { "claim": "The Crimson Empire controls the Ruby Mines.", "grounded": true },
                { "claim": "The Crimson Empire has nuclear weapons.", "grounded": false }
            ]
        });
        let lm = ScriptedLmAdapter::new().with_json_reply(reply);

        let result = score_faithfulness(
            &lm,
            &prompts,
            "The Crimson Empire controls the Ruby Mines and has nuclear weapons.",
            "The Crimson Empire controls the Ruby Mines.",
        )
        .await
        .unwrap();

        assert!((result.score - 0.5).abs() < f64::EPSILON);
        assert_eq!(result.ungrounded_claims.len(), 1);
    }

    #[tokio::test]
    async fn empty_claim_list_is_vacuously_faithful() {
        let prompts = PromptRegistry::load_embedded();
        let lm = ScriptedLmAdapter::new().with_json_reply(serde_json::json!({ "claims": [] }));

        let result = score_faithfulness(&lm, &prompts, "", "context").await.unwrap();
        assert!((result.score - 1.0).abs() < f64::EPSILON);
    }
}
