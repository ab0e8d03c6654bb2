//! Deterministic test double for [`LlmProvider`], used throughout the
//! integration test suite so pipeline tests never make a real network call.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream;

use crate::llm::{ChatMessage, GenerateOptions, LlmChunk, LlmError, LlmProvider, LlmResponse};

enum Script {
    Succeed(String),
    Fail(LlmError),
    SleepThenSucceed(Duration, String),
}

pub struct MockProvider {
    scripts: Mutex<Vec<Script>>,
    calls: AtomicU32,
    captured: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockProvider {
    #[must_use]
    pub fn succeeding(content: impl Into<String>) -> Self {
        Self {
            scripts: Mutex::new(vec![Script::Succeed(content.into())]),
            calls: AtomicU32::new(0),
            captured: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn always_failing(error: LlmError) -> Self {
        Self {
            scripts: Mutex::new(vec![Script::Fail(error); 64]
                .into_iter()
                .collect()),
            calls: AtomicU32::new(0),
            captured: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn failing_then_succeeding(error: LlmError, content: impl Into<String>) -> Self {
        Self {
            scripts: Mutex::new(vec![Script::Fail(error), Script::Succeed(content.into())]),
            calls: AtomicU32::new(0),
            captured: Mutex::new(Vec::new()),
        }
    }

    /// Sleeps longer than any reasonable request deadline, for testing the
    /// timeout-fallback-to-template path (spec.md §8 "LLM timeout fallback").
    #[must_use]
    pub fn sleeping_forever() -> Self {
        Self {
            scripts: Mutex::new(vec![Script::SleepThenSucceed(
                Duration::from_secs(3600),
                "too late".to_string(),
            )]),
            calls: AtomicU32::new(0),
            captured: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every message list this provider has been called with, in call
    /// order — lets a test assert on exactly what text crossed the LLM
    /// boundary (e.g. that PII was redacted before it got this far).
    #[must_use]
    pub fn captured_messages(&self) -> Vec<Vec<ChatMessage>> {
        self.captured.lock().unwrap().clone()
    }

    fn next(&self) -> Script {
        let mut scripts = self.scripts.lock().unwrap();
        if scripts.len() > 1 {
            scripts.remove(0)
        } else {
            match scripts.first() {
                Some(Script::Succeed(s)) => Script::Succeed(s.clone()),
                Some(Script::Fail(e)) => Script::Fail(e.clone()),
                Some(Script::SleepThenSucceed(d, s)) => Script::SleepThenSucceed(*d, s.clone()),
                None => Script::Fail(LlmError::Unavailable),
            }
        }
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        _options: &GenerateOptions,
    ) -> Result<LlmResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.captured.lock().unwrap().push(messages.to_vec());
        match self.next() {
            Script::Succeed(content) => Ok(LlmResponse {
                content,
                tokens_used: Some(42),
            }),
            Script::Fail(error) => Err(error),
            Script::SleepThenSucceed(dur, content) => {
                tokio::time::sleep(dur).await;
                Ok(LlmResponse {
                    content,
                    tokens_used: Some(42),
                })
            }
        }
    }

    async fn generate_stream(
        &self,
        messages: &[ChatMessage],
        options: &GenerateOptions,
    ) -> Result<futures_util::stream::BoxStream<'static, Result<LlmChunk, LlmError>>, LlmError> {
        let response = self.generate(messages, options).await?;
        let chunk = LlmChunk {
            delta: response.content,
            done: true,
        };
        Ok(Box::pin(stream::iter(vec![Ok(chunk)])))
    }

    fn count_tokens(&self, text: &str) -> Option<u32> {
        Some((text.split_whitespace().count()) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn succeeding_returns_configured_content() {
        let p = MockProvider::succeeding("hello");
        let r = p
            .generate(&[ChatMessage::user("hi")], &GenerateOptions::default())
            .await
            .unwrap();
        assert_eq!(r.content, "hello");
    }
}
