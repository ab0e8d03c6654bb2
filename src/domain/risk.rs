use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::intervention::Intervention;
use crate::domain::{RiskId, SessionId, TraceId};
use crate::types::{RiskDimension, RiskLevel, RiskType};

/// A detected risk of over-reliance on AI, or of a governance violation,
/// linked to a session and (optionally) the traces that evidenced it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Risk {
    pub id: RiskId,
    pub session_id: SessionId,
    pub trace_ids: Vec<TraceId>,
    pub risk_type: RiskType,
    pub risk_level: RiskLevel,
    pub dimension: RiskDimension,
    pub description: String,
    pub impact: String,
    pub evidence: Vec<String>,
    pub recommendations: Vec<String>,
    pub pedagogical_intervention: Option<Intervention>,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Idempotency key: a stable hash over `(risk_type, dimension, evidence)`.
    /// Lets the gateway dedupe detections of the same risk within a window
    /// without re-inspecting trace content (spec.md §3 "Invariant").
    pub fingerprint: String,
}

impl Risk {
    #[must_use]
    pub fn new(
        session_id: SessionId,
        trace_ids: Vec<TraceId>,
        risk_type: RiskType,
        risk_level: RiskLevel,
        dimension: RiskDimension,
        description: impl Into<String>,
        impact: impl Into<String>,
        evidence: Vec<String>,
        recommendations: Vec<String>,
        pedagogical_intervention: Option<Intervention>,
    ) -> Self {
        let fingerprint = compute_fingerprint(risk_type, dimension, &evidence);
        Self {
            id: RiskId::new(),
            session_id,
            trace_ids,
            risk_type,
            risk_level,
            dimension,
            description: description.into(),
            impact: impact.into(),
            evidence,
            recommendations,
            pedagogical_intervention,
            resolved: false,
            resolved_at: None,
            created_at: Utc::now(),
            fingerprint,
        }
    }

    pub fn resolve(&mut self) {
        self.resolved = true;
        self.resolved_at = Some(Utc::now());
    }
}

/// FNV-1a over the idempotency key's textual form, stable across process
/// restarts and good enough for dedup (no security requirement here unlike
/// the cache's salted hash).
fn compute_fingerprint(risk_type: RiskType, dimension: RiskDimension, evidence: &[String]) -> String {
    let mut hash: u64 = 0xcbf29ce484222325;
    let mut feed = |bytes: &[u8]| {
        for &b in bytes {
            hash ^= u64::from(b);
            hash = hash.wrapping_mul(0x100000001b3);
        }
    };
    feed(risk_type.encode().as_bytes());
    feed(dimension.encode().as_bytes());
    for e in evidence {
        feed(e.as_bytes());
    }
    format!("{hash:016x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_for_same_inputs() {
        let evidence = vec!["give me the full code".to_string()];
        let a = compute_fingerprint(RiskType::CognitiveDelegation, RiskDimension::Cognitive, &evidence);
        let b = compute_fingerprint(RiskType::CognitiveDelegation, RiskDimension::Cognitive, &evidence);
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_differs_on_evidence() {
        let a = compute_fingerprint(
            RiskType::CognitiveDelegation,
            RiskDimension::Cognitive,
            &["a".to_string()],
        );
        let b = compute_fingerprint(
            RiskType::CognitiveDelegation,
            RiskDimension::Cognitive,
            &["b".to_string()],
        );
        assert_ne!(a, b);
    }
}
