//! Risk analyzer (AR, spec.md §4.7): rule-based over-reliance and
//! governance-violation detection over a session's trace window.
//!
//! Each rule is a small trait object, parallel to wg-bastion's
//! `GuardrailStage` trait (pack sibling to the chosen teacher), registered in
//! a [`RiskRuleRegistry`] so a sixth dimension is additive rather than
//! invasive. The registry itself does the idempotent dedup against
//! already-persisted fingerprints; individual rules stay stateless and pure.

pub mod rules;

use std::collections::HashSet;

use crate::domain::policy::Policy;
use crate::domain::risk::Risk;
use crate::domain::trace::{Trace, TraceSequence};
use crate::domain::SessionId;
use crate::types::RiskDimension;

/// Default window size for risk analysis (spec.md §4.7: "K default 30").
pub const DEFAULT_WINDOW: usize = 30;

/// One detection rule, addressing exactly one of the five risk dimensions.
///
/// `evaluate` is pure: given the same window and policy it must return the
/// same outcome, which is what makes the analyzer idempotent (spec.md §8,
/// invariant 8 "Risk idempotence").
pub trait RiskRule: Send + Sync {
    fn dimension(&self) -> RiskDimension;

    /// Inspect the window and optionally emit one risk. A rule never emits
    /// more than one risk per call (spec.md §4.7: "at most one Risk per
    /// detection window").
    fn evaluate(&self, session_id: SessionId, window: &[Trace], policy: &Policy) -> Option<Risk>;
}

/// Holds the full set of registered rules and runs them as a batch.
pub struct RiskRuleRegistry {
    rules: Vec<Box<dyn RiskRule>>,
}

impl Default for RiskRuleRegistry {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

impl RiskRuleRegistry {
    #[must_use]
    pub fn new(rules: Vec<Box<dyn RiskRule>>) -> Self {
        Self { rules }
    }

    /// The standard eight-rule set covering all five dimensions (spec.md §4.7).
    #[must_use]
    pub fn with_default_rules() -> Self {
        Self::new(vec![
            Box::new(rules::DelegationDensityRule),
            Box::new(rules::HighAiDependencyRule),
            Box::new(rules::MissingJustificationRule),
            Box::new(rules::UndisclosedAiUseRule),
            Box::new(rules::VerbatimCopyRule),
            Box::new(rules::StuckWithoutExplorationRule),
            Box::new(rules::VulnerablePatternRule),
            Box::new(rules::PolicyViolationRateRule),
        ])
    }

    /// Runs every rule over `sequence.window(k)`, skipping any risk whose
    /// fingerprint already appears in `known_fingerprints` (the session's
    /// already-persisted risks), so re-running never duplicates a detection.
    #[must_use]
    pub fn analyze(
        &self,
        session_id: SessionId,
        sequence: &TraceSequence,
        policy: &Policy,
        known_fingerprints: &HashSet<String>,
        window: usize,
    ) -> Vec<Risk> {
        let slice = sequence.window(window);
        self.rules
            .iter()
            .filter_map(|rule| rule.evaluate(session_id, slice, policy))
            .filter(|risk| !known_fingerprints.contains(&risk.fingerprint))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trace::TraceSequence;
    use crate::types::{CognitiveState, InteractionType, TraceLevel};
    use rustc_hash::FxHashMap;
    use serde_json::Value;

    fn trace(interaction_type: InteractionType, content: &str, ai_involvement: f64) -> Trace {
        Trace {
            id: crate::domain::TraceId::new(),
            session_id: SessionId::new(),
            sequence_number: 1,
            trace_level: TraceLevel::Cognitive,
            interaction_type,
            content: content.to_string(),
            context: Value::Null,
            cognitive_state: CognitiveState::Implementation,
            ai_involvement,
            decision_justification: None,
            alternatives_considered: vec![],
            created_at: chrono::Utc::now(),
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
    fn analyze_dedupes_against_known_fingerprints() {
        let registry = RiskRuleRegistry::with_default_rules();
        let policy = Policy::default_for_activity("act-1");
        let session_id = SessionId::new();
        let traces: Vec<Trace> = (0..5)
            .map(|_| trace(InteractionType::AiResponse, "full solution provided", 0.9))
            .collect();
        let sequence = TraceSequence::rebuild(traces);

        let first_pass = registry.analyze(session_id, &sequence, &policy, &HashSet::new(), DEFAULT_WINDOW);
        assert!(!first_pass.is_empty());

        let known: HashSet<String> = first_pass.iter().map(|r| r.fingerprint.clone()).collect();
        let second_pass = registry.analyze(session_id, &sequence, &policy, &known, DEFAULT_WINDOW);
        assert!(second_pass.is_empty(), "idempotent re-run must not duplicate risks");
    }

    #[test]
    fn empty_window_produces_no_risks() {
        let registry = RiskRuleRegistry::with_default_rules();
        let policy = Policy::default_for_activity("act-1");
        let sequence = TraceSequence::default();
        let risks = registry.analyze(SessionId::new(), &sequence, &policy, &HashSet::new(), DEFAULT_WINDOW);
        assert!(risks.is_empty());
    }
}
