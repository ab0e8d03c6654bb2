//! Generic bounded, TTL'd, LRU-evicted store (spec.md §4.8: "bounded
//! in-memory store with TTL + LRU eviction, default cap 1000, TTL 24h").
//!
//! Used by the training-mode collaborator's session state; parameterized
//! differently, the same eviction discipline backs the LLM semantic cache's
//! own entry table. Deliberately generic over `K`/`V` and kept out of the
//! core pipeline's call graph, mirroring the restriction in spec.md §4.8
//! ("accessed only by the training collaborator").

use std::collections::VecDeque;
use std::hash::Hash;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;
use tokio::sync::RwLock;

const DEFAULT_CAP: usize = 1000;
const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

pub struct BoundedStore<K, V> {
    ttl: Duration,
    cap: usize,
    inner: RwLock<Inner<K, V>>,
}

struct Inner<K, V> {
    entries: FxHashMap<K, Entry<V>>,
    lru: VecDeque<K>,
}

impl<K, V> BoundedStore<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    #[must_use]
    pub fn new(cap: usize, ttl: Duration) -> Self {
        Self {
            ttl,
            cap: cap.max(1),
            inner: RwLock::new(Inner {
                entries: FxHashMap::default(),
                lru: VecDeque::new(),
            }),
        }
    }

    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_CAP, DEFAULT_TTL)
    }

    /// `None` on a miss or an expired entry (expired entries are evicted lazily
    /// here rather than on a timer, matching the teacher's own lazy-expiry style
    /// in its cache-adjacent code).
    pub async fn get(&self, key: &K) -> Option<V> {
        let mut guard = self.inner.write().await;
        let expired = guard
            .entries
            .get(key)
            .is_some_and(|e| e.inserted_at.elapsed() > self.ttl);
        if expired {
            guard.entries.remove(key);
            guard.lru.retain(|k| k != key);
            return None;
        }
        let value = guard.entries.get(key).map(|e| e.value.clone());
        if value.is_some() {
            guard.lru.retain(|k| k != key);
            guard.lru.push_back(key.clone());
        }
        value
    }

    pub async fn put(&self, key: K, value: V) {
        let mut guard = self.inner.write().await;
        guard.lru.retain(|k| k != &key);
        guard.lru.push_back(key.clone());
        guard.entries.insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
        Self::evict_over_capacity(&mut guard, self.cap);
    }

    pub async fn remove(&self, key: &K) {
        let mut guard = self.inner.write().await;
        guard.entries.remove(key);
        guard.lru.retain(|k| k != key);
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn evict_over_capacity(inner: &mut Inner<K, V>, cap: usize) {
        while inner.entries.len() > cap {
            let Some(oldest) = inner.lru.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store: BoundedStore<String, i32> = BoundedStore::new(10, Duration::from_secs(60));
        store.put("a".to_string(), 1).await;
        assert_eq!(store.get(&"a".to_string()).await, Some(1));
    }

    #[tokio::test]
    async fn capacity_evicts_least_recently_used() {
        let store: BoundedStore<i32, i32> = BoundedStore::new(2, Duration::from_secs(60));
        store.put(1, 10).await;
        store.put(2, 20).await;
        store.put(3, 30).await;
        assert_eq!(store.len().await, 2);
        assert_eq!(store.get(&1).await, None);
        assert_eq!(store.get(&3).await, Some(30));
    }

    #[tokio::test]
    async fn expired_entry_is_treated_as_a_miss() {
        let store: BoundedStore<&str, i32> = BoundedStore::new(10, Duration::from_millis(1));
        store.put("k", 1).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(store.get(&"k").await, None);
    }

    #[tokio::test]
    async fn get_touches_lru_order() {
        let store: BoundedStore<i32, i32> = BoundedStore::new(2, Duration::from_secs(60));
        store.put(1, 10).await;
        store.put(2, 20).await;
        // touching 1 should save it from the next eviction
        assert_eq!(store.get(&1).await, Some(10));
        store.put(3, 30).await;
        assert_eq!(store.get(&2).await, None);
        assert_eq!(store.get(&1).await, Some(10));
    }
}
