use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{SessionId, TraceId};
use crate::types::{CognitiveState, InteractionType, TraceLevel};

/// A single, append-only entry in a session's N4 cognitive trace.
///
/// Traces are never mutated once persisted (spec.md §3 Invariant). Insertion
/// order within a session is total and monotonic via `sequence_number`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Trace {
    pub id: TraceId,
    pub session_id: SessionId,
    /// Dense, strictly increasing within a session, starting from 1.
    pub sequence_number: u64,
    pub trace_level: TraceLevel,
    pub interaction_type: InteractionType,
    /// Raw (or PII-redacted, for the copy sent to the LLM) text.
    pub content: String,
    pub context: Value,
    pub cognitive_state: CognitiveState,
    pub ai_involvement: f64,
    pub decision_justification: Option<String>,
    pub alternatives_considered: Vec<String>,
    pub created_at: DateTime<Utc>,

    // Six optional N4 dimension maps; structured blobs the recorder does
    // not interpret (spec.md §4.6).
    pub semantic: Option<Value>,
    pub algorithmic: Option<Value>,
    pub cognitive_reasoning: Option<Value>,
    pub interactional: Option<Value>,
    pub ethical_risk: Option<Value>,
    pub process: Option<Value>,

    /// Free-form metadata not part of the six N4 dimensions: whether PII was
    /// redacted, whether the response was LLM-generated or templated, etc.
    #[serde(default)]
    pub metadata: FxHashMap<String, Value>,
}

#[derive(Clone, Debug, Default)]
pub struct TraceDraft {
    pub trace_level: TraceLevel,
    pub interaction_type: InteractionType,
    pub content: String,
    pub context: Value,
    pub cognitive_state: CognitiveState,
    pub ai_involvement: f64,
    pub decision_justification: Option<String>,
    pub alternatives_considered: Vec<String>,
    pub semantic: Option<Value>,
    pub algorithmic: Option<Value>,
    pub cognitive_reasoning: Option<Value>,
    pub interactional: Option<Value>,
    pub ethical_risk: Option<Value>,
    pub process: Option<Value>,
    pub metadata: FxHashMap<String, Value>,
}

impl Default for TraceLevel {
    fn default() -> Self {
        TraceLevel::Cognitive
    }
}

impl Default for InteractionType {
    fn default() -> Self {
        InteractionType::StudentPrompt
    }
}

impl Default for CognitiveState {
    fn default() -> Self {
        CognitiveState::Unknown
    }
}

impl TraceDraft {
    /// Validated per spec.md §4.6: `ai_involvement` must land in `[0,1]`.
    pub fn validate(&self) -> Result<(), TraceValidationError> {
        if !(0.0..=1.0).contains(&self.ai_involvement) {
            return Err(TraceValidationError::AiInvolvementOutOfRange(
                self.ai_involvement,
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TraceValidationError {
    #[error("ai_involvement {0} is outside [0,1]")]
    AiInvolvementOutOfRange(f64),
}

/// Derived, on-demand view over a session's persisted traces.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TraceSequence {
    pub traces: Vec<Trace>,
    pub reasoning_path: Vec<CognitiveState>,
    pub strategy_changes: u64,
    pub ai_dependency_score: f64,
    pub cognitive_coherence: Option<f64>,
}

impl TraceSequence {
    /// Rebuild the derived view from an ordered slice of persisted traces.
    #[must_use]
    pub fn rebuild(traces: Vec<Trace>) -> Self {
        let reasoning_path: Vec<CognitiveState> =
            traces.iter().map(|t| t.cognitive_state).collect();

        let strategy_changes = reasoning_path
            .windows(2)
            .filter(|pair| pair[0] != pair[1])
            .count() as u64;

        let ai_dependency_score = if traces.is_empty() {
            0.0
        } else {
            traces.iter().map(|t| t.ai_involvement).sum::<f64>() / traces.len() as f64
        };

        let cognitive_coherence = coherence_estimate(&reasoning_path);

        Self {
            traces,
            reasoning_path,
            strategy_changes,
            ai_dependency_score,
            cognitive_coherence,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.traces.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// Last K traces, most-recent-last, for windowed risk detection (spec.md §4.7).
    #[must_use]
    pub fn window(&self, k: usize) -> &[Trace] {
        let start = self.traces.len().saturating_sub(k);
        &self.traces[start..]
    }
}

/// Stable estimate of how consistent the reasoning path looks: the fraction
/// of adjacent pairs that did *not* change cognitive state, biased down by
/// repeated `stuck`/`frustrated` runs. `None` when fewer than two traces
/// exist to compare.
fn coherence_estimate(path: &[CognitiveState]) -> Option<f64> {
    if path.len() < 2 {
        return None;
    }
    let stable = path.windows(2).filter(|p| p[0] == p[1]).count();
    let stuck_runs = path
        .windows(2)
        .filter(|p| {
            matches!(
                (p[0], p[1]),
                (CognitiveState::Stuck, CognitiveState::Stuck)
                    | (CognitiveState::Frustrated, CognitiveState::Frustrated)
            )
        })
        .count();
    let total = (path.len() - 1) as f64;
    let raw = stable as f64 / total;
    let penalty = stuck_runs as f64 / total;
    Some((raw - penalty).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace_with(state: CognitiveState, involvement: f64, seq: u64) -> Trace {
        Trace {
            id: TraceId::new(),
            session_id: SessionId::new(),
            sequence_number: seq,
            trace_level: TraceLevel::Cognitive,
            interaction_type: InteractionType::StudentPrompt,
            content: "x".into(),
            context: Value::Null,
            cognitive_state: state,
            ai_involvement: involvement,
            decision_justification: None,
            alternatives_considered: vec![],
            created_at: Utc::now(),
            semantic: None,
            algorithmic: None,
            cognitive_reasoning: None,
            interactional: None,
            ethical_risk: None,
            process: None,
            metadata: FxHashMap::default(),
        }
    }

    #[test]
    fn ai_dependency_score_is_mean_involvement() {
        let seq = TraceSequence::rebuild(vec![
            trace_with(CognitiveState::Exploration, 0.2, 1),
            trace_with(CognitiveState::Planning, 0.8, 2),
        ]);
        assert!((seq.ai_dependency_score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn strategy_changes_counts_adjacent_differences() {
        let seq = TraceSequence::rebuild(vec![
            trace_with(CognitiveState::Exploration, 0.1, 1),
            trace_with(CognitiveState::Exploration, 0.1, 2),
            trace_with(CognitiveState::Debugging, 0.1, 3),
        ]);
        assert_eq!(seq.strategy_changes, 1);
    }

    #[test]
    fn window_returns_last_k_traces() {
        let seq = TraceSequence::rebuild(vec![
            trace_with(CognitiveState::Exploration, 0.1, 1),
            trace_with(CognitiveState::Planning, 0.1, 2),
            trace_with(CognitiveState::Debugging, 0.1, 3),
        ]);
        let w = seq.window(2);
        assert_eq!(w.len(), 2);
        assert_eq!(w[0].sequence_number, 2);
        assert_eq!(w[1].sequence_number, 3);
    }

    #[test]
    fn ai_involvement_must_be_in_unit_interval() {
        let mut draft = TraceDraft {
            ai_involvement: 1.2,
            ..Default::default()
        };
        assert!(draft.validate().is_err());
        draft.ai_involvement = 0.5;
        assert!(draft.validate().is_ok());
    }
}
