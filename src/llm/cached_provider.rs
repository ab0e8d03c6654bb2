//! Wraps an [`LlmProvider`] with the session-scoped [`SemanticCache`]
//! (spec.md §4.5), so the gateway can hand the dispatcher a single
//! `LlmProvider` regardless of whether caching is enabled.
//!
//! The cache key is computed from the last user message in the call —
//! the sanitized prompt the dispatcher is about to send — plus the
//! session id, mode, and institutional salt. Streaming calls bypass the
//! cache entirely (spec.md §4.5 "never stores streamed responses partially").

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::domain::SessionId;
use crate::types::SessionMode;

use super::cache::{compute_key, SemanticCache};
use super::{ChatMessage, GenerateOptions, LlmChunk, LlmError, LlmProvider, LlmResponse};

pub struct CachedProvider {
    inner: Arc<dyn LlmProvider>,
    cache: Arc<SemanticCache>,
    cache_salt: String,
    session_id: SessionId,
    mode: SessionMode,
}

impl CachedProvider {
    #[must_use]
    pub fn new(
        inner: Arc<dyn LlmProvider>,
        cache: Arc<SemanticCache>,
        cache_salt: String,
        session_id: SessionId,
        mode: SessionMode,
    ) -> Self {
        Self {
            inner,
            cache,
            cache_salt,
            session_id,
            mode,
        }
    }

    fn key_for(&self, messages: &[ChatMessage]) -> String {
        let prompt = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, super::Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        let redacted_context = messages
            .iter()
            .filter(|m| matches!(m.role, super::Role::System))
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        compute_key(&self.cache_salt, self.session_id, self.mode, prompt, &redacted_context)
    }
}

#[async_trait]
impl LlmProvider for CachedProvider {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        options: &GenerateOptions,
    ) -> Result<LlmResponse, LlmError> {
        let key = self.key_for(messages);
        self.cache
            .get_or_generate(&key, self.inner.as_ref(), messages, options)
            .await
    }

    async fn generate_stream(
        &self,
        messages: &[ChatMessage],
        options: &GenerateOptions,
    ) -> Result<BoxStream<'static, Result<LlmChunk, LlmError>>, LlmError> {
        self.inner.generate_stream(messages, options).await
    }

    fn count_tokens(&self, text: &str) -> Option<u32> {
        self.inner.count_tokens(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::providers::mock::MockProvider;
    use std::time::Duration;

    #[tokio::test]
    async fn distinct_sessions_bypass_each_others_cache_entry() {
        let cache = Arc::new(SemanticCache::new(Duration::from_secs(60), 10));
        let inner = Arc::new(MockProvider::succeeding("reply"));
        let a = CachedProvider::new(
            inner.clone(),
            cache.clone(),
            "salt".to_string(),
            SessionId::new(),
            SessionMode::Tutor,
        );
        let b = CachedProvider::new(
            inner.clone(),
            cache.clone(),
            "salt".to_string(),
            SessionId::new(),
            SessionMode::Tutor,
        );
        let messages = [ChatMessage::user("same prompt")];
        let options = GenerateOptions::default();
        a.generate(&messages, &options).await.unwrap();
        b.generate(&messages, &options).await.unwrap();
        assert_eq!(inner.call_count(), 2, "different sessions must not share a cache entry");
    }

    #[tokio::test]
    async fn same_session_hits_cache_on_second_call() {
        let cache = Arc::new(SemanticCache::new(Duration::from_secs(60), 10));
        let inner = Arc::new(MockProvider::succeeding("reply"));
        let session_id = SessionId::new();
        let provider = CachedProvider::new(
            inner.clone(),
            cache,
            "salt".to_string(),
            session_id,
            SessionMode::Tutor,
        );
        let messages = [ChatMessage::user("same prompt")];
        let options = GenerateOptions::default();
        provider.generate(&messages, &options).await.unwrap();
        provider.generate(&messages, &options).await.unwrap();
        assert_eq!(inner.call_count(), 1);
    }
}
