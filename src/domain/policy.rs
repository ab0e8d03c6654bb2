use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::domain::PolicyId;
use crate::types::RiskDimension;

/// Institutional AI-use policy, scoped to an activity (or overridden at the
/// session level). Policies are immutable snapshots attached to a session
/// at creation time — mutating an activity's policy after the fact never
/// retroactively changes sessions already running under the old snapshot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Policy {
    pub id: PolicyId,
    pub scope: PolicyScope,
    pub max_ai_assistance_level: f64,
    pub block_complete_solutions: bool,
    pub require_justification: bool,
    pub allow_code_snippets: bool,
    pub require_traceability: bool,
    pub max_ai_dependency: f64,
    pub risk_thresholds: FxHashMap<RiskDimension, f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyScope {
    Activity { activity_id: String },
    SessionOverride { activity_id: String },
}

impl Policy {
    /// Institutional default, matching the original `GobernanzaAgent`'s
    /// bundled defaults (`max_ai_assistance_level=0.7`,
    /// `block_complete_solutions=true`, `require_traceability=true`).
    #[must_use]
    pub fn default_for_activity(activity_id: impl Into<String>) -> Self {
        let mut risk_thresholds = FxHashMap::default();
        risk_thresholds.insert(RiskDimension::Cognitive, 0.6);
        risk_thresholds.insert(RiskDimension::Ethical, 0.5);
        risk_thresholds.insert(RiskDimension::Epistemic, 0.5);
        risk_thresholds.insert(RiskDimension::Technical, 0.5);
        risk_thresholds.insert(RiskDimension::Governance, 0.3);

        Self {
            id: PolicyId::new(),
            scope: PolicyScope::Activity {
                activity_id: activity_id.into(),
            },
            max_ai_assistance_level: 0.7,
            block_complete_solutions: true,
            require_justification: false,
            allow_code_snippets: true,
            require_traceability: true,
            max_ai_dependency: 0.6,
            risk_thresholds,
        }
    }

    #[must_use]
    pub fn threshold_for(&self, dimension: RiskDimension) -> f64 {
        self.risk_thresholds.get(&dimension).copied().unwrap_or(0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_blocks_complete_solutions() {
        let p = Policy::default_for_activity("act-1");
        assert!(p.block_complete_solutions);
        assert!(p.require_traceability);
        assert_eq!(p.max_ai_dependency, 0.6);
    }

    #[test]
    fn threshold_for_falls_back_to_half_when_unset() {
        let mut p = Policy::default_for_activity("act-1");
        p.risk_thresholds.clear();
        assert_eq!(p.threshold_for(RiskDimension::Cognitive), 0.5);
    }
}
