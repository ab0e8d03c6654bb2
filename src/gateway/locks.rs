//! Per-session serialization (spec.md §5): concurrent `process_interaction`
//! calls on the same session run one at a time, while calls against distinct
//! sessions run fully in parallel. Grounded in the same pattern the teacher
//! uses to key its per-thread checkpoint locks, narrowed to a session id.

use std::sync::Arc;

use parking_lot::Mutex as SyncMutex;
use rustc_hash::FxHashMap;
use tokio::sync::Mutex;

use crate::domain::SessionId;

/// A table of lazily-created per-session mutexes. Stale entries (sessions no
/// longer in use) are never evicted; the table's steady-state size is bounded
/// by the number of distinct sessions ever seen by this process, which is
/// acceptable for the gateway's expected deployment scale (spec.md §9).
#[derive(Default)]
pub struct SessionLocks {
    table: SyncMutex<FxHashMap<SessionId, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    /// Returns the `Arc<Mutex<()>>` guarding `session_id`, creating it on
    /// first use. Callers then call `.lock_owned()` (or `.lock()`) on the
    /// returned handle to actually acquire it.
    pub async fn acquire(&self, session_id: SessionId) -> Arc<Mutex<()>> {
        self.table
            .lock()
            .entry(session_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_session_calls_serialize() {
        let locks = Arc::new(SessionLocks::default());
        let session_id = SessionId::new();
        let order = Arc::new(SyncMutex::new(Vec::new()));

        let l1 = locks.clone();
        let o1 = order.clone();
        let h1 = tokio::spawn(async move {
            let guard = l1.acquire(session_id).await;
            let _permit = guard.lock_owned().await;
            tokio::time::sleep(Duration::from_millis(30)).await;
            o1.lock().push(1);
        });

        tokio::time::sleep(Duration::from_millis(5)).await;

        let l2 = locks.clone();
        let o2 = order.clone();
        let h2 = tokio::spawn(async move {
            let guard = l2.acquire(session_id).await;
            let _permit = guard.lock_owned().await;
            o2.lock().push(2);
        });

        h1.await.unwrap();
        h2.await.unwrap();
        assert_eq!(*order.lock(), vec![1, 2]);
    }

    #[tokio::test]
    async fn distinct_sessions_do_not_block_each_other() {
        let locks = Arc::new(SessionLocks::default());
        let a = SessionId::new();
        let b = SessionId::new();

        let guard_a = locks.acquire(a).await;
        let _permit_a = guard_a.lock_owned().await;

        let guard_b = locks.acquire(b).await;
        let fut = guard_b.lock_owned();
        let result = tokio::time::timeout(Duration::from_millis(50), fut).await;
        assert!(result.is_ok(), "distinct sessions must not share a lock");
    }
}
