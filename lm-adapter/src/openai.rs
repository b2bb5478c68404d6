//! `async-openai`-backed [`LmAdapter`], grounded on the teacher's
//! `generate_embedding` (`src/utils/embedding.rs`) and
//! `create_chat_request`/`process_llm_response`
//! (`src/retrieval/query_helper.rs`) patterns: `ResponseFormat::JsonSchema`
//! for structured output, `CreateEmbeddingRequestArgs` for embeddings.

use crate::{ChatMessage, LmAdapter, LmCallOptions, LmResponse, Role};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestUserMessage, CreateChatCompletionRequestArgs,
    CreateEmbeddingRequestArgs, ResponseFormat, ResponseFormatJsonSchema,
};
use async_trait::async_trait;
use common::error::{AceError, AceResult};
use std::time::Duration;
use tracing::{instrument, warn};

pub struct OpenAiLmAdapter {
    client: async_openai::Client<OpenAIConfig>,
    chat_model: String,
    embed_model: String,
}

impl OpenAiLmAdapter {
    #[must_use]
    pub fn new(api_key: &str, api_base: &str, chat_model: &str, embed_model: &str) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base);
        OpenAiLmAdapter {
            client: async_openai::Client::with_config(config),
            chat_model: chat_model.to_string(),
            embed_model: embed_model.to_string(),
        }
    }

    fn to_request_message(
        message: &ChatMessage,
    ) -> async_openai::types::ChatCompletionRequestMessage {
        match message.role {
            Role::System => ChatCompletionRequestSystemMessage::from(message.content.as_str()).into(),
            Role::User => ChatCompletionRequestUserMessage::from(message.content.as_str()).into(),
            Role::Assistant => {
                ChatCompletionRequestAssistantMessage::from(message.content.as_str()).into()
            }
        }
    }

    async fn run_chat(&self, messages: &[ChatMessage], opts: &LmCallOptions) -> AceResult<LmResponse> {
        let request_messages: Vec<_> = messages.iter().map(Self::to_request_message).collect();

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.chat_model)
            .temperature(opts.temperature)
            .max_tokens(opts.max_tokens)
            .messages(request_messages);

        if let Some(schema) = &opts.schema {
            builder.response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    description: Some(format!("Structured output for {}", schema.name)),
                    name: schema.name.clone(),
                    schema: Some(schema.schema.clone()),
                    strict: Some(true),
                },
            });
        }

        let request = builder
            .build()
            .map_err(|e| AceError::Fatal(format!("building chat request: {e}")))?;

        let call = self.client.chat().create(request);
        let response = match opts.deadline_ms {
            Some(ms) => tokio::time::timeout(Duration::from_millis(ms), call)
                .await
                .map_err(|_| AceError::BackendTimeout("lm chat call exceeded deadline".into()))?
                .map_err(|e| AceError::BackendUnavailable(e.to_string()))?,
            None => call.await.map_err(|e| AceError::BackendUnavailable(e.to_string()))?,
        };

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AceError::MalformedOutput("no choices in lm response".into()))?;

        let text = choice
            .message
            .content
            .ok_or_else(|| AceError::MalformedOutput("no content in lm response".into()))?;
        let truncated = choice.finish_reason.as_ref().is_some_and(|reason| {
            matches!(reason, async_openai::types::FinishReason::Length)
        });
        if truncated {
            warn!(model = %self.chat_model, "lm response truncated by token budget");
        }

        Ok(LmResponse { text, truncated })
    }
}

#[async_trait]
impl LmAdapter for OpenAiLmAdapter {
    #[instrument(skip(self, prompt))]
    async fn generate(&self, prompt: &str, opts: LmCallOptions) -> AceResult<LmResponse> {
        self.run_chat(&[ChatMessage::user(prompt)], &opts).await
    }

    #[instrument(skip(self, messages))]
    async fn chat(&self, messages: &[ChatMessage], opts: LmCallOptions) -> AceResult<LmResponse> {
        self.run_chat(messages, &opts).await
    }

    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> AceResult<Vec<f32>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.embed_model)
            .input([text])
            .build()
            .map_err(|e| AceError::Fatal(format!("building embedding request: {e}")))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| AceError::BackendUnavailable(e.to_string()))?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| AceError::MalformedOutput("no embedding data received".into()))
    }
}
