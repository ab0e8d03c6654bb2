//! Request/response bodies for the primary HTTP API (spec.md §6), wire
//! types only — all domain logic lives behind `gateway::Gateway`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::risk::Risk;
use crate::domain::trace::Trace;
use crate::domain::{RiskId, SessionId, TraceId};
use crate::gateway::InteractionResult;
use crate::types::{CognitiveState, SessionLifecycle, SessionMode};

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub student_id: String,
    pub activity_id: String,
    pub mode: SessionMode,
    pub simulator_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: SessionId,
    pub student_id: String,
    pub activity_id: String,
    pub mode: SessionMode,
    pub lifecycle: SessionLifecycle,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub ended_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<crate::domain::Session> for SessionResponse {
    fn from(s: crate::domain::Session) -> Self {
        Self {
            session_id: s.id,
            student_id: s.student_id,
            activity_id: s.activity_id,
            mode: s.mode,
            lifecycle: s.lifecycle,
            started_at: s.started_at,
            ended_at: s.ended_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: SessionResponse,
    pub trace_count: u64,
    pub risk_count: u64,
    pub cognitive_phase: CognitiveState,
    pub autonomy_estimate: f64,
}

impl From<crate::domain::Session> for SessionDetail {
    fn from(s: crate::domain::Session) -> Self {
        Self {
            trace_count: s.trace_count,
            risk_count: s.risk_count,
            cognitive_phase: s.cognitive_status.current_phase,
            autonomy_estimate: s.cognitive_status.autonomy_estimate,
            session: s.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InteractionRequest {
    pub prompt: String,
    #[serde(default)]
    pub context: Option<Value>,
    #[serde(default)]
    pub cognitive_intent: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InteractionResponse {
    pub interaction_id: TraceId,
    pub message: String,
    pub agent_used: &'static str,
    pub cognitive_state_detected: CognitiveState,
    pub ai_involvement: f64,
    pub blocked: bool,
    pub block_reason: Option<String>,
    pub trace_id: TraceId,
    pub risks_detected: Vec<RiskId>,
    pub tokens_used: Option<u32>,
}

impl From<InteractionResult> for InteractionResponse {
    fn from(r: InteractionResult) -> Self {
        Self {
            interaction_id: r.interaction_id,
            message: r.message,
            agent_used: r.agent_used,
            cognitive_state_detected: r.cognitive_state_detected,
            ai_involvement: r.ai_involvement,
            blocked: r.blocked,
            block_reason: r.block_reason,
            trace_id: r.trace_id,
            risks_detected: r.risks_detected,
            tokens_used: r.tokens_used,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TraceList {
    pub traces: Vec<Trace>,
}

#[derive(Debug, Serialize)]
pub struct RiskList {
    pub risks: Vec<Risk>,
}
