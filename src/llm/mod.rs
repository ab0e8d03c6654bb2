//! LLM provider port and semantic cache (spec.md §4.5).
//!
//! The port is narrow and provider-agnostic: callers never see
//! provider-specific errors, only the closed taxonomy in [`LlmError`].
//! Adapters live under [`providers`]; [`cache::SemanticCache`] is a
//! read-through, single-flight cache sitting in front of any provider.

pub mod cache;
pub mod cached_provider;
pub mod providers;

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Per-call generation options. `deadline` is mandatory: every suspension
/// point in the gateway honors a request deadline (spec.md §5).
#[derive(Clone, Debug)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    pub stop: Vec<String>,
    pub deadline: Duration,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 512,
            stop: Vec::new(),
            deadline: Duration::from_secs(30),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub tokens_used: Option<u32>,
}

#[derive(Clone, Debug)]
pub struct LlmChunk {
    pub delta: String,
    pub done: bool,
}

/// Closed error taxonomy; adapters map every provider-specific failure into
/// one of these (spec.md §4.5).
#[derive(Debug, Error, Clone)]
pub enum LlmError {
    #[error("llm provider unavailable")]
    Unavailable,
    #[error("llm call timed out")]
    Timeout,
    #[error("llm provider rate limited")]
    RateLimited,
    #[error("llm returned an invalid response")]
    InvalidResponse,
    #[error("llm call cancelled")]
    Cancelled,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        options: &GenerateOptions,
    ) -> Result<LlmResponse, LlmError>;

    async fn generate_stream(
        &self,
        messages: &[ChatMessage],
        options: &GenerateOptions,
    ) -> Result<BoxStream<'static, Result<LlmChunk, LlmError>>, LlmError>;

    /// Best-effort token count for observability; `None` when the adapter
    /// has no tokenizer available (optional capability, spec.md §9).
    fn count_tokens(&self, _text: &str) -> Option<u32> {
        None
    }
}

/// Wraps a provider with one retry on `Unavailable`/transient `Timeout`,
/// exponential backoff capped by the remaining deadline (spec.md §5).
/// `RateLimited` and `InvalidResponse` are never retried.
pub async fn generate_with_retry(
    provider: &dyn LlmProvider,
    messages: &[ChatMessage],
    options: &GenerateOptions,
) -> Result<LlmResponse, LlmError> {
    let first = tokio::time::timeout(options.deadline, provider.generate(messages, options)).await;

    let first_result = match first {
        Ok(result) => result,
        Err(_) => return Err(LlmError::Timeout),
    };

    match first_result {
        Err(LlmError::Unavailable) | Err(LlmError::Timeout) => {
            tokio::time::sleep(Duration::from_millis(50)).await;
            match tokio::time::timeout(options.deadline, provider.generate(messages, options)).await
            {
                Ok(result) => result,
                Err(_) => Err(LlmError::Timeout),
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use providers::mock::MockProvider;

    #[tokio::test]
    async fn retries_once_on_unavailable_then_succeeds() {
        let provider = MockProvider::failing_then_succeeding(LlmError::Unavailable, "ok");
        let messages = [ChatMessage::user("hi")];
        let result = generate_with_retry(&provider, &messages, &GenerateOptions::default()).await;
        assert_eq!(result.unwrap().content, "ok");
    }

    #[tokio::test]
    async fn does_not_retry_rate_limited() {
        let provider = MockProvider::always_failing(LlmError::RateLimited);
        let messages = [ChatMessage::user("hi")];
        let result = generate_with_retry(&provider, &messages, &GenerateOptions::default()).await;
        assert!(matches!(result, Err(LlmError::RateLimited)));
        assert_eq!(provider.call_count(), 1);
    }
}
