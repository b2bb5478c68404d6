//! A scriptable [`LmAdapter`] for deterministic tests of extraction,
//! narration, and judge call-sites without a live model backend.
//! Grounded on the teacher's own test-only `FakeLm` stub
//! (`vector-adapter::surreal::tests::FakeLm`), generalized from a
//! single fixed embedding into a queue of scripted chat replies so
//! `ace-inference`/`ace-eval`/the workspace scenario tests can script
//! exactly the Narrator/Checker/judge turns a scenario needs.

use crate::{ChatMessage, LmAdapter, LmCallOptions, LmResponse};
use async_trait::async_trait;
use common::error::{AceError, AceResult};
use std::collections::VecDeque;
use std::sync::Mutex;

/// One scripted outcome for a `chat`/`generate` call.
enum Scripted {
    Text(String),
    Err(AceError),
}

/// Replies to `chat`/`generate` from a FIFO script, falling back to
/// echoing the last user message verbatim once the script is drained —
/// this keeps unscripted calls from panicking mid-test while still
/// making scripted expectations explicit and ordered.
pub struct ScriptedLmAdapter {
    script: Mutex<VecDeque<Scripted>>,
}

impl ScriptedLmAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
        }
    }

    /// Appends a reply that will be returned, in order, to the next
    /// `chat`/`generate` call.
    #[must_use]
    pub fn with_reply(self, text: impl Into<String>) -> Self {
        self.script.lock().unwrap_or_else(|e| e.into_inner()).push_back(Scripted::Text(text.into()));
        self
    }

    /// Appends a reply as the JSON-serialized form of `value`.
    #[must_use]
    pub fn with_json_reply(self, value: serde_json::Value) -> Self {
        self.with_reply(value.to_string())
    }

    /// Appends an error to be returned from the next call.
    #[must_use]
    pub fn with_error(self, err: AceError) -> Self {
        self.script.lock().unwrap_or_else(|e| e.into_inner()).push_back(Scripted::Err(err));
        self
    }

    fn next(&self, fallback: &str) -> AceResult<LmResponse> {
        let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
        match script.pop_front() {
            Some(Scripted::Text(text)) => Ok(LmResponse { text, truncated: false }),
            Some(Scripted::Err(err)) => Err(err),
            None => Ok(LmResponse {
                text: fallback.to_string(),
                truncated: false,
            }),
        }
    }
}

impl Default for ScriptedLmAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Stable, cheap pseudo-embedding: a small fixed-dimension vector derived
/// from byte statistics of `text`, deterministic across runs so vector
/// search tests can assert on relative ordering.
#[must_use]
pub fn deterministic_embedding(text: &str, dims: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; dims.max(1)];
    for (i, byte) in text.bytes().enumerate() {
        let slot = i % vector.len();
        vector[slot] += f32::from(byte);
    }
    vector
}

#[async_trait]
impl LmAdapter for ScriptedLmAdapter {
    async fn generate(&self, prompt: &str, _opts: LmCallOptions) -> AceResult<LmResponse> {
        self.next(prompt)
    }

    async fn chat(&self, messages: &[ChatMessage], _opts: LmCallOptions) -> AceResult<LmResponse> {
        let fallback = messages.last().map_or("", |m| m.content.as_str());
        self.next(fallback)
    }

    async fn embed(&self, text: &str) -> AceResult<Vec<f32>> {
        Ok(deterministic_embedding(text, 8))
    }
}
