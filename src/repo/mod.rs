//! Persistence traits and their implementations (spec.md §4.8), grounded in
//! the same shape the teacher used for its checkpointer: one narrow async
//! trait per entity, an in-memory `RwLock`-backed implementation good enough
//! for tests and single-process deployments, and (behind the `sqlite`
//! feature) a durable `sqlx`-backed implementation with embedded migrations.
//!
//! The core pipeline requires only: transactional append-and-read per
//! session, query-by-session ordered by insertion, and indexed lookup by id
//! (spec.md §4.8). Nothing here does cross-entity joins; the gateway
//! composes entities at query time (spec.md §9 "id-based" design note).

pub mod bounded;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::collections::HashSet;

use async_trait::async_trait;

use crate::domain::policy::Policy;
use crate::domain::risk::Risk;
use crate::domain::session::Session;
use crate::domain::trace::Trace;
use crate::domain::{PolicyId, SessionId};
use crate::error::GatewayError;

#[async_trait]
pub trait SessionRepo: Send + Sync {
    async fn insert(&self, session: Session) -> Result<(), GatewayError>;
    async fn get(&self, id: SessionId) -> Result<Session, GatewayError>;
    /// Replaces the stored session wholesale; callers always read-modify-write
    /// under the gateway's per-session lock, so this never races itself.
    async fn update(&self, session: Session) -> Result<(), GatewayError>;
}

#[async_trait]
pub trait TraceRepo: Send + Sync {
    /// Appends a trace, already assigned its sequence number by the caller
    /// under the per-session lock. Traces are never mutated or deleted once
    /// appended (spec.md §3 Invariant, §6 "never delete in production").
    async fn append(&self, trace: Trace) -> Result<(), GatewayError>;

    /// Ordered by `sequence_number` ascending.
    async fn list_by_session(&self, session_id: SessionId) -> Result<Vec<Trace>, GatewayError>;

    /// The next sequence number to assign for this session (1 if none yet).
    async fn next_sequence_number(&self, session_id: SessionId) -> Result<u64, GatewayError>;
}

#[async_trait]
pub trait RiskRepo: Send + Sync {
    async fn insert(&self, risk: Risk) -> Result<(), GatewayError>;
    async fn list_by_session(&self, session_id: SessionId) -> Result<Vec<Risk>, GatewayError>;

    /// Fingerprints of risks already persisted for this session, used by the
    /// gateway to dedupe a fresh analyzer run (spec.md §4.7, §8 invariant 8).
    async fn fingerprints_for_session(&self, session_id: SessionId) -> Result<HashSet<String>, GatewayError>;
}

#[async_trait]
pub trait PolicyRepo: Send + Sync {
    async fn get(&self, id: PolicyId) -> Result<Policy, GatewayError>;

    /// Returns the activity's current policy, creating and persisting the
    /// institutional default on first use. The returned policy is the
    /// immutable snapshot a new session attaches to (spec.md §3).
    async fn get_or_create_default(&self, activity_id: &str) -> Result<Policy, GatewayError>;
}
