//! Request-throttling (spec.md §6 `RATE_LIMIT_PER_MINUTE`/`_PER_HOUR`).
//!
//! A fixed-window counter per caller, guarded by a single lock the same way
//! the gateway's per-session lock table is (spec.md §5 "lock-free atomic
//! increments" is reserved for metrics; this is bookkeeping state that does
//! need exclusion). Keyed by the bearer token when present, falling back to
//! "anonymous" — good enough for a single-process deployment; a
//! multi-process deployment would back this with a shared store instead.

use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::GatewayError;
use crate::http::AppState;

struct Window {
    started_at: Instant,
    count: u32,
}

struct CallerState {
    minute: Window,
    hour: Window,
}

pub struct RateLimiter {
    per_minute: u32,
    per_hour: u32,
    callers: Mutex<FxHashMap<String, CallerState>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(per_minute: u32, per_hour: u32) -> Self {
        Self {
            per_minute,
            per_hour,
            callers: Mutex::new(FxHashMap::default()),
        }
    }

    /// Records one call for `key`; returns `Err(retry_after_secs)` once
    /// either window is exhausted.
    fn record(&self, key: &str) -> Result<(), u64> {
        let now = Instant::now();
        let mut callers = self.callers.lock();
        let entry = callers.entry(key.to_string()).or_insert_with(|| CallerState {
            minute: Window { started_at: now, count: 0 },
            hour: Window { started_at: now, count: 0 },
        });

        if now.duration_since(entry.minute.started_at) >= Duration::from_secs(60) {
            entry.minute = Window { started_at: now, count: 0 };
        }
        if now.duration_since(entry.hour.started_at) >= Duration::from_secs(3600) {
            entry.hour = Window { started_at: now, count: 0 };
        }

        if entry.minute.count >= self.per_minute {
            let retry = 60 - now.duration_since(entry.minute.started_at).as_secs();
            return Err(retry.max(1));
        }
        if entry.hour.count >= self.per_hour {
            let retry = 3600 - now.duration_since(entry.hour.started_at).as_secs();
            return Err(retry.max(1));
        }

        entry.minute.count += 1;
        entry.hour.count += 1;
        Ok(())
    }
}

pub async fn enforce(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let key = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("anonymous")
        .to_string();

    state
        .rate_limiter
        .record(&key)
        .map_err(|retry_after_secs| GatewayError::RateLimited { retry_after_secs })?;

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_per_minute_cap() {
        let limiter = RateLimiter::new(3, 1000);
        assert!(limiter.record("caller-a").is_ok());
        assert!(limiter.record("caller-a").is_ok());
        assert!(limiter.record("caller-a").is_ok());
        assert!(limiter.record("caller-a").is_err());
    }

    #[test]
    fn callers_are_tracked_independently() {
        let limiter = RateLimiter::new(1, 1000);
        assert!(limiter.record("caller-a").is_ok());
        assert!(limiter.record("caller-b").is_ok());
        assert!(limiter.record("caller-a").is_err());
    }
}
