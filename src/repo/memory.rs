//! In-memory implementations, good enough for tests, single-process
//! deployments, and the default when no `DATABASE_URL` is configured
//! (spec.md §6 Open Question resolution, see DESIGN.md).

use std::collections::HashSet;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tokio::sync::RwLock;

use crate::domain::policy::Policy;
use crate::domain::risk::Risk;
use crate::domain::session::Session;
use crate::domain::trace::Trace;
use crate::domain::{PolicyId, SessionId};
use crate::error::GatewayError;
use crate::repo::{PolicyRepo, RiskRepo, SessionRepo, TraceRepo};

#[derive(Default)]
pub struct InMemorySessionRepo {
    sessions: RwLock<FxHashMap<SessionId, Session>>,
}

#[async_trait]
impl SessionRepo for InMemorySessionRepo {
    async fn insert(&self, session: Session) -> Result<(), GatewayError> {
        self.sessions.write().await.insert(session.id, session);
        Ok(())
    }

    async fn get(&self, id: SessionId) -> Result<Session, GatewayError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| GatewayError::SessionNotFound(id.to_string()))
    }

    async fn update(&self, session: Session) -> Result<(), GatewayError> {
        let mut guard = self.sessions.write().await;
        if !guard.contains_key(&session.id) {
            return Err(GatewayError::SessionNotFound(session.id.to_string()));
        }
        guard.insert(session.id, session);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryTraceRepo {
    traces: RwLock<FxHashMap<SessionId, Vec<Trace>>>,
}

#[async_trait]
impl TraceRepo for InMemoryTraceRepo {
    async fn append(&self, trace: Trace) -> Result<(), GatewayError> {
        self.traces
            .write()
            .await
            .entry(trace.session_id)
            .or_default()
            .push(trace);
        Ok(())
    }

    async fn list_by_session(&self, session_id: SessionId) -> Result<Vec<Trace>, GatewayError> {
        Ok(self
            .traces
            .read()
            .await
            .get(&session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn next_sequence_number(&self, session_id: SessionId) -> Result<u64, GatewayError> {
        Ok(self
            .traces
            .read()
            .await
            .get(&session_id)
            .map_or(1, |traces| traces.len() as u64 + 1))
    }
}

#[derive(Default)]
pub struct InMemoryRiskRepo {
    risks: RwLock<FxHashMap<SessionId, Vec<Risk>>>,
}

#[async_trait]
impl RiskRepo for InMemoryRiskRepo {
    async fn insert(&self, risk: Risk) -> Result<(), GatewayError> {
        self.risks
            .write()
            .await
            .entry(risk.session_id)
            .or_default()
            .push(risk);
        Ok(())
    }

    async fn list_by_session(&self, session_id: SessionId) -> Result<Vec<Risk>, GatewayError> {
        Ok(self
            .risks
            .read()
            .await
            .get(&session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn fingerprints_for_session(&self, session_id: SessionId) -> Result<HashSet<String>, GatewayError> {
        Ok(self
            .risks
            .read()
            .await
            .get(&session_id)
            .map(|risks| risks.iter().map(|r| r.fingerprint.clone()).collect())
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct InMemoryPolicyRepo {
    by_id: RwLock<FxHashMap<PolicyId, Policy>>,
    defaults_by_activity: RwLock<FxHashMap<String, PolicyId>>,
}

#[async_trait]
impl PolicyRepo for InMemoryPolicyRepo {
    async fn get(&self, id: PolicyId) -> Result<Policy, GatewayError> {
        self.by_id.read().await.get(&id).cloned().ok_or_else(|| {
            GatewayError::ResourceNotFound { kind: "policy", id: id.to_string() }
        })
    }

    async fn get_or_create_default(&self, activity_id: &str) -> Result<Policy, GatewayError> {
        if let Some(id) = self.defaults_by_activity.read().await.get(activity_id).copied() {
            return self.get(id).await;
        }
        let policy = Policy::default_for_activity(activity_id);
        let id = policy.id;
        self.by_id.write().await.insert(id, policy.clone());
        self.defaults_by_activity
            .write()
            .await
            .insert(activity_id.to_string(), id);
        Ok(policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SessionMode;

    #[tokio::test]
    async fn session_round_trips_through_insert_and_get() {
        let repo = InMemorySessionRepo::default();
        let policy_id = PolicyId::new();
        let session = Session::new("stu-1", "act-1", SessionMode::Tutor, None, policy_id);
        let id = session.id;
        repo.insert(session).await.unwrap();
        let fetched = repo.get(id).await.unwrap();
        assert_eq!(fetched.id, id);
    }

    #[tokio::test]
    async fn get_unknown_session_errors() {
        let repo = InMemorySessionRepo::default();
        assert!(repo.get(SessionId::new()).await.is_err());
    }

    #[tokio::test]
    async fn trace_sequence_numbers_increment_per_session() {
        use crate::types::{CognitiveState, InteractionType, TraceLevel};

        let repo = InMemoryTraceRepo::default();
        let session_id = SessionId::new();
        assert_eq!(repo.next_sequence_number(session_id).await.unwrap(), 1);

        let trace = Trace {
            id: crate::domain::TraceId::new(),
            session_id,
            sequence_number: 1,
            trace_level: TraceLevel::Interactional,
            interaction_type: InteractionType::StudentPrompt,
            content: "hi".to_string(),
            context: serde_json::Value::Null,
            cognitive_state: CognitiveState::Exploration,
            ai_involvement: 0.1,
            decision_justification: None,
            alternatives_considered: vec![],
            created_at: chrono::Utc::now(),
            semantic: None,
            algorithmic: None,
            cognitive_reasoning: None,
            interactional: None,
            ethical_risk: None,
            process: None,
            metadata: rustc_hash::FxHashMap::default(),
        };
        repo.append(trace).await.unwrap();
        assert_eq!(repo.next_sequence_number(session_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn policy_default_is_created_once_per_activity() {
        let repo = InMemoryPolicyRepo::default();
        let first = repo.get_or_create_default("act-1").await.unwrap();
        let second = repo.get_or_create_default("act-1").await.unwrap();
        assert_eq!(first.id, second.id);
    }
}
