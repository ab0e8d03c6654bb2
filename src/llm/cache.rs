//! Semantic cache: a read-through cache in front of [`LlmProvider::generate`]
//! keyed by a salted hash over `{prompt, redacted-context, mode, session_id,
//! cache_version}` (spec.md §4.5). Session-scoped salting prevents
//! cross-session cache poisoning (spec.md Glossary).
//!
//! Concurrency: safe under concurrent reads; a single writer per key. The
//! first caller for a key that misses performs the provider call; concurrent
//! callers for the same key arriving while the first is in flight wait on a
//! per-key single-flight latch sharing the same deadline, then read the
//! freshly cached value (or inherit the error). Never caches a partially
//! streamed body — only completed responses.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, Notify};

use crate::domain::SessionId;
use crate::types::SessionMode;

use super::{GenerateOptions, LlmError, LlmProvider, LlmResponse};

pub const CACHE_VERSION: u32 = 1;

/// Salted, session-scoped cache key. Opaque and non-guessable to anyone
/// without `cache_salt` (spec.md §6 `CACHE_SALT`).
#[must_use]
pub fn compute_key(
    cache_salt: &str,
    session_id: SessionId,
    mode: SessionMode,
    prompt: &str,
    redacted_context: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(cache_salt.as_bytes());
    hasher.update(b"|");
    hasher.update(session_id.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(mode.encode().as_bytes());
    hasher.update(b"|");
    hasher.update(prompt.as_bytes());
    hasher.update(b"|");
    hasher.update(redacted_context.as_bytes());
    hasher.update(b"|");
    hasher.update(CACHE_VERSION.to_le_bytes());
    format!("{:x}", hasher.finalize())
}

struct Entry {
    response: LlmResponse,
    inserted_at: Instant,
}

enum Slot {
    Filled(Entry),
    /// A single-flight latch: the first caller performs the provider call
    /// and notifies every waiter when it resolves, storing the outcome here.
    InFlight(Arc<Notify>, Arc<Mutex<Option<Result<LlmResponse, LlmError>>>>),
}

pub struct SemanticCache {
    ttl: Duration,
    max_entries: usize,
    inner: Mutex<CacheInner>,
}

struct CacheInner {
    slots: FxHashMap<String, Slot>,
    lru: VecDeque<String>,
}

impl SemanticCache {
    #[must_use]
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries,
            inner: Mutex::new(CacheInner {
                slots: FxHashMap::default(),
                lru: VecDeque::new(),
            }),
        }
    }

    /// Drop every entry for a session (explicit invalidation, spec.md §4.5).
    /// `key_prefix_matches` is a caller-supplied predicate since the cache
    /// itself stores only opaque hashed keys.
    pub async fn invalidate_matching(&self, predicate: impl Fn(&str) -> bool) {
        let mut inner = self.inner.lock().await;
        let to_remove: Vec<String> = inner
            .slots
            .keys()
            .filter(|k| predicate(k))
            .cloned()
            .collect();
        for key in to_remove {
            inner.slots.remove(&key);
            inner.lru.retain(|k| k != &key);
        }
    }

    async fn evict_if_over_capacity(&self, inner: &mut CacheInner) {
        while inner.slots.len() > self.max_entries {
            if let Some(oldest) = inner.lru.pop_front() {
                inner.slots.remove(&oldest);
            } else {
                break;
            }
        }
    }

    fn touch_lru(inner: &mut CacheInner, key: &str) {
        inner.lru.retain(|k| k != key);
        inner.lru.push_back(key.to_string());
    }

    /// Read-through `generate`: hit returns the cached body; miss performs
    /// the provider call under a per-key single-flight latch.
    pub async fn get_or_generate(
        &self,
        key: &str,
        provider: &dyn LlmProvider,
        messages: &[super::ChatMessage],
        options: &GenerateOptions,
    ) -> Result<LlmResponse, LlmError> {
        loop {
            let wait_on = {
                let mut inner = self.inner.lock().await;
                match inner.slots.get(key) {
                    Some(Slot::Filled(entry)) if entry.inserted_at.elapsed() < self.ttl => {
                        Self::touch_lru(&mut inner, key);
                        return Ok(entry.response.clone());
                    }
                    Some(Slot::Filled(_)) => {
                        // Expired; fall through to claim the single-flight slot.
                        None
                    }
                    Some(Slot::InFlight(notify, outcome)) => {
                        Some((notify.clone(), outcome.clone()))
                    }
                    None => None,
                }
            };

            if let Some((notify, outcome)) = wait_on {
                let notified = notify.notified();
                // Re-check in case the outcome landed between the lock
                // release above and registering for notification.
                if let Some(result) = outcome.lock().await.clone() {
                    return result;
                }
                tokio::select! {
                    () = notified => {}
                    () = tokio::time::sleep(options.deadline) => return Err(LlmError::Timeout),
                }
                if let Some(result) = outcome.lock().await.clone() {
                    return result;
                }
                continue;
            }

            // Claim the slot as the single-flight writer.
            let notify = Arc::new(Notify::new());
            let outcome: Arc<Mutex<Option<Result<LlmResponse, LlmError>>>> = Arc::new(Mutex::new(None));
            {
                let mut inner = self.inner.lock().await;
                inner
                    .slots
                    .insert(key.to_string(), Slot::InFlight(notify.clone(), outcome.clone()));
            }

            let result = provider.generate(messages, options).await;

            {
                let mut inner = self.inner.lock().await;
                if let Ok(response) = &result {
                    inner.slots.insert(
                        key.to_string(),
                        Slot::Filled(Entry {
                            response: response.clone(),
                            inserted_at: Instant::now(),
                        }),
                    );
                    Self::touch_lru(&mut inner, key);
                    self.evict_if_over_capacity(&mut inner).await;
                } else {
                    inner.slots.remove(key);
                }
            }

            *outcome.lock().await = Some(result.clone());
            notify.notify_waiters();
            return result;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::providers::mock::MockProvider;
    use crate::llm::ChatMessage;

    #[test]
    fn distinct_sessions_produce_distinct_keys() {
        let a = compute_key(
            "salt",
            SessionId::new(),
            SessionMode::Tutor,
            "same prompt",
            "",
        );
        let b = compute_key(
            "salt",
            SessionId::new(),
            SessionMode::Tutor,
            "same prompt",
            "",
        );
        assert_ne!(a, b);
    }

    #[test]
    fn same_session_and_prompt_is_stable() {
        let session_id = SessionId::new();
        let a = compute_key("salt", session_id, SessionMode::Tutor, "p", "");
        let b = compute_key("salt", session_id, SessionMode::Tutor, "p", "");
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn hit_avoids_a_second_provider_call() {
        let cache = SemanticCache::new(Duration::from_secs(60), 100);
        let provider = MockProvider::succeeding("cached reply");
        let messages = [ChatMessage::user("hi")];
        let options = GenerateOptions::default();
        let key = "k1";

        let first = cache
            .get_or_generate(key, &provider, &messages, &options)
            .await
            .unwrap();
        let second = cache
            .get_or_generate(key, &provider, &messages, &options)
            .await
            .unwrap();

        assert_eq!(first.content, second.content);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn single_flight_collapses_concurrent_identical_requests() {
        let cache = Arc::new(SemanticCache::new(Duration::from_secs(60), 100));
        let provider = Arc::new(MockProvider::succeeding("shared"));
        let options = GenerateOptions::default();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let cache = cache.clone();
            let provider = provider.clone();
            let options = options.clone();
            handles.push(tokio::spawn(async move {
                let messages = [ChatMessage::user("identical prompt")];
                cache
                    .get_or_generate("shared-key", provider.as_ref(), &messages, &options)
                    .await
            }));
        }

        let mut bodies = Vec::new();
        for handle in handles {
            bodies.push(handle.await.unwrap().unwrap().content);
        }

        assert!(bodies.iter().all(|b| b == "shared"));
        assert_eq!(provider.call_count(), 1);
    }
}
