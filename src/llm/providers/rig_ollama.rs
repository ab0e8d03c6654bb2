//! `rig-core`/ollama adapter, gated behind the `llm-rig` feature, reaching
//! for `rig::providers::ollama` directly. Kept as an alternate provider
//! beside [`super::http_json::HttpJsonProvider`], which remains the default.

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use rig::client::CompletionClient;
use rig::completion::CompletionModel;
use rig::providers::ollama;

use crate::llm::{ChatMessage, GenerateOptions, LlmChunk, LlmError, LlmProvider, LlmResponse, Role};

pub struct RigOllamaProvider {
    client: ollama::Client,
    model: String,
}

impl RigOllamaProvider {
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: ollama::Client::new(),
            model: model.into(),
        }
    }

    fn preamble(messages: &[ChatMessage]) -> String {
        messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.clone())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn last_user_turn(messages: &[ChatMessage]) -> Option<&ChatMessage> {
        messages.iter().rev().find(|m| m.role == Role::User)
    }
}

#[async_trait]
impl LlmProvider for RigOllamaProvider {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        options: &GenerateOptions,
    ) -> Result<LlmResponse, LlmError> {
        let user_turn = Self::last_user_turn(messages).ok_or(LlmError::InvalidResponse)?;
        let completion_model = self.client.completion_model(&self.model);

        let request = completion_model
            .completion_request(rig::completion::Message::user(user_turn.content.clone()))
            .preamble(Self::preamble(messages))
            .temperature(f64::from(options.temperature))
            .build();

        let call = completion_model.completion(request);
        let response = tokio::time::timeout(options.deadline, call)
            .await
            .map_err(|_| LlmError::Timeout)?
            .map_err(|_| LlmError::Unavailable)?;

        // `response.choice` entries don't expose a uniform plain-text accessor
        // across rig's content variants, so fall back to `Debug` rendering.
        let content = response
            .choice
            .into_iter()
            .map(|choice| format!("{choice:?}"))
            .collect::<Vec<_>>()
            .join(" ");

        if content.trim().is_empty() {
            return Err(LlmError::InvalidResponse);
        }

        Ok(LlmResponse {
            content,
            tokens_used: None,
        })
    }

    async fn generate_stream(
        &self,
        messages: &[ChatMessage],
        options: &GenerateOptions,
    ) -> Result<BoxStream<'static, Result<LlmChunk, LlmError>>, LlmError> {
        let response = self.generate(messages, options).await?;
        Ok(stream::iter(vec![Ok(LlmChunk {
            delta: response.content,
            done: true,
        })])
        .boxed())
    }
}
