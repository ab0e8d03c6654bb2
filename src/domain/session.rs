use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{PolicyId, SessionId};
use crate::types::{CognitiveState, SessionLifecycle, SessionMode};

/// A student's ongoing (or concluded) interaction with the gateway.
///
/// Created by the gateway when an external caller requests one; mutated
/// only through the gateway; terminated by an explicit `complete` or a
/// timeout. See spec.md §3 "Session".
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub student_id: String,
    pub activity_id: String,
    pub mode: SessionMode,
    pub simulator_type: Option<String>,
    pub lifecycle: SessionLifecycle,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub trace_count: u64,
    pub risk_count: u64,
    pub cognitive_status: CognitiveStatus,
    /// Reference to the immutable policy snapshot attached at creation.
    pub policy_snapshot_id: PolicyId,
}

impl Session {
    #[must_use]
    pub fn new(
        student_id: impl Into<String>,
        activity_id: impl Into<String>,
        mode: SessionMode,
        simulator_type: Option<String>,
        policy_snapshot_id: PolicyId,
    ) -> Self {
        Self {
            id: SessionId::new(),
            student_id: student_id.into(),
            activity_id: activity_id.into(),
            mode,
            simulator_type,
            lifecycle: SessionLifecycle::Active,
            started_at: Utc::now(),
            ended_at: None,
            trace_count: 0,
            risk_count: 0,
            cognitive_status: CognitiveStatus::default(),
            policy_snapshot_id,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.lifecycle == SessionLifecycle::Active
    }

    pub fn complete(&mut self) {
        self.lifecycle = SessionLifecycle::Completed;
        self.ended_at = Some(Utc::now());
    }

    pub fn record_trace(&mut self, cognitive_state: CognitiveState, autonomy_estimate: f64) {
        self.trace_count += 1;
        self.cognitive_status.current_phase = cognitive_state;
        self.cognitive_status.autonomy_estimate = autonomy_estimate;
        self.cognitive_status.cognitive_load_label = load_label_for(autonomy_estimate);
    }

    pub fn record_risk(&mut self) {
        self.risk_count += 1;
    }
}

fn load_label_for(autonomy_estimate: f64) -> String {
    // Inverse of autonomy: high AI involvement reads as lower cognitive load
    // carried by the student themselves.
    if autonomy_estimate >= 0.7 {
        "low".to_string()
    } else if autonomy_estimate >= 0.4 {
        "medium".to_string()
    } else {
        "high".to_string()
    }
}

/// Small open key-value map tracking the student's current phase, autonomy
/// estimate, and a cognitive-load label, updated after every interaction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CognitiveStatus {
    pub current_phase: CognitiveState,
    /// Estimate in `[0,1]` of how much of the recent work is the student's own
    /// (`1.0 - ai_dependency_score`, recomputed on every `process_interaction`).
    pub autonomy_estimate: f64,
    pub cognitive_load_label: String,
    /// Open extension map for collaborator-specific fields (training mode,
    /// simulators) that the core does not interpret.
    pub extra: FxHashMap<String, Value>,
}

impl Default for CognitiveStatus {
    fn default() -> Self {
        Self {
            current_phase: CognitiveState::Unknown,
            autonomy_estimate: 1.0,
            cognitive_load_label: "low".to_string(),
            extra: FxHashMap::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_active_with_zero_counters() {
        let s = Session::new("stu-1", "act-1", SessionMode::Tutor, None, PolicyId::new());
        assert!(s.is_active());
        assert_eq!(s.trace_count, 0);
        assert_eq!(s.risk_count, 0);
    }

    #[test]
    fn complete_sets_lifecycle_and_ended_at() {
        let mut s = Session::new("stu-1", "act-1", SessionMode::Tutor, None, PolicyId::new());
        s.complete();
        assert_eq!(s.lifecycle, SessionLifecycle::Completed);
        assert!(s.ended_at.is_some());
    }

    #[test]
    fn record_trace_updates_cognitive_status() {
        let mut s = Session::new("stu-1", "act-1", SessionMode::Tutor, None, PolicyId::new());
        s.record_trace(CognitiveState::Debugging, 0.2);
        assert_eq!(s.cognitive_status.current_phase, CognitiveState::Debugging);
        assert_eq!(s.cognitive_status.cognitive_load_label, "high");
    }
}
