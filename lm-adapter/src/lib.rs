//! LM Adapter (C4): prompt submission with JSON-mode/structured-output
//! enforcement, re-ask-once on parse failure, and embeddings. Grounded on
//! the teacher's `async-openai` usage in `src/utils/llm.rs` and
//! `src/retrieval/query_helper.rs` (`ResponseFormat::JsonSchema`,
//! `CreateChatCompletionRequestArgs`, `CreateEmbeddingRequestArgs`),
//! generalized behind a trait so the backing model server stays
//! pluggable (spec.md §6).

pub mod fake;
pub mod openai;
pub mod temperature;

use async_trait::async_trait;
use common::error::{AceError, AceResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use fake::ScriptedLmAdapter;
pub use openai::OpenAiLmAdapter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A named JSON schema the model must structure its output to, carried
/// alongside the call so the adapter can request JSON mode.
#[derive(Debug, Clone)]
pub struct StructuredOutputSchema {
    pub name: String,
    pub schema: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct LmCallOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    pub schema: Option<StructuredOutputSchema>,
    pub deadline_ms: Option<u64>,
}

impl Default for LmCallOptions {
    fn default() -> Self {
        LmCallOptions {
            temperature: temperature::NARRATION,
            max_tokens: 2048,
            schema: None,
            deadline_ms: None,
        }
    }
}

/// Raw model output plus whether the token budget truncated it
/// (spec.md §4.4: "over-budget outputs are truncated and reported").
#[derive(Debug, Clone)]
pub struct LmResponse {
    pub text: String,
    pub truncated: bool,
}

/// Prompt submission and embeddings against a language-model backend.
#[async_trait]
pub trait LmAdapter: Send + Sync {
    async fn generate(&self, prompt: &str, opts: LmCallOptions) -> AceResult<LmResponse>;
    async fn chat(&self, messages: &[ChatMessage], opts: LmCallOptions) -> AceResult<LmResponse>;
    async fn embed(&self, text: &str) -> AceResult<Vec<f32>>;
}

/// Submits `messages` with `schema` enforced as structured JSON output,
/// deserializes the response into `T`, and re-asks exactly once (with a
/// corrective follow-up message) if the first reply fails to parse —
/// spec.md §4.4. Kept as a free function rather than a trait method so
/// `LmAdapter` stays object-safe (`Arc<dyn LmAdapter>` is shared by every
/// caller); generic structured decoding lives here instead.
pub async fn chat_structured<T, A>(
    adapter: &A,
    messages: &[ChatMessage],
    schema: StructuredOutputSchema,
    temperature: f32,
    max_tokens: u32,
    deadline_ms: Option<u64>,
) -> AceResult<T>
where
    T: DeserializeOwned,
    A: LmAdapter + ?Sized,
{
    let opts = LmCallOptions {
        temperature,
        max_tokens,
        schema: Some(schema),
        deadline_ms,
    };

    let first = adapter.chat(messages, opts.clone()).await?;
    if let Ok(value) = serde_json::from_str::<T>(&first.text) {
        return Ok(value);
    }

    let mut retry_messages = messages.to_vec();
    retry_messages.push(ChatMessage::user(
        "Your previous reply was not valid JSON matching the required schema. \
         Reply again with ONLY the JSON object, no commentary.",
    ));
    let second = adapter.chat(&retry_messages, opts).await?;
    serde_json::from_str::<T>(&second.text)
        .map_err(|e| AceError::MalformedOutput(format!("after reprompt: {e}")))
}
