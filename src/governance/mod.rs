//! Governance filter (spec.md §4.3): PII sanitation, delegation blocking,
//! and quantitative policy checks, run in sequence, failing fast.
//!
//! Grounded directly in
//! `original_source/activia1-main/backend/agents/governance.py`
//! (`GobernanzaAgent.sanitize_prompt`, `verify_compliance`): the PII regex
//! set and the delegation-block/traceability/dependency checks are carried
//! over in semantics, generalized from the Python agent's dict-shaped
//! results into a typed `FilterOutcome`.

pub mod pii;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::intervention::ClassifierOutput;
use crate::domain::policy::Policy;
use crate::domain::risk::Risk;
use crate::domain::trace::TraceSequence;
use crate::types::{RiskDimension, RiskLevel, RiskType};

/// One audit-log entry, append-only, mirroring the intent of
/// `generate_audit_report` without inventing the report-aggregation logic
/// itself (left to the out-of-scope reporting subsystem).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ComplianceEvent {
    pub session_id: String,
    pub status: ComplianceStatus,
    pub policy: &'static str,
    pub description: String,
    pub at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Compliant,
    Warning,
    Violation,
}

/// Canonical pedagogical-redirect message, issued whenever a complete
/// solution request is blocked. Never exposes LLM output on the block path.
pub const PEDAGOGICAL_REDIRECT_MESSAGE: &str = "I can't write the complete solution for you, but \
I can help you think it through. What have you tried so far, and where exactly does it break down?";

#[derive(Clone)]
pub enum FilterOutcome {
    Pass {
        sanitized_text: String,
        pii_detected: bool,
    },
    Warn {
        sanitized_text: String,
        pii_detected: bool,
        adjustments: Vec<String>,
    },
    Block {
        message: String,
        reason: &'static str,
        risk: Box<Risk>,
    },
}

pub trait GovernanceFilter: Send + Sync {
    /// Runs the three checks in sequence. `outbound_text` is what will be
    /// sent to the LLM (i.e. after PII sanitation, downstream of this
    /// call); `sequence` is the trace sequence including the just-persisted
    /// inbound trace; `prior_trace_count` is the number of traces persisted
    /// for this session *before* the inbound trace, used by the
    /// traceability check below.
    fn evaluate(
        &self,
        session_id: &str,
        outbound_text: &str,
        policy: &Policy,
        classifier: &ClassifierOutput,
        sequence: &TraceSequence,
        prior_trace_count: usize,
    ) -> (FilterOutcome, Vec<ComplianceEvent>);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultGovernanceFilter;

impl GovernanceFilter for DefaultGovernanceFilter {
    fn evaluate(
        &self,
        session_id: &str,
        outbound_text: &str,
        policy: &Policy,
        classifier: &ClassifierOutput,
        sequence: &TraceSequence,
        prior_trace_count: usize,
    ) -> (FilterOutcome, Vec<ComplianceEvent>) {
        let mut log = Vec::new();

        // 1. PII sanitation. Never blocks, only rewrites.
        let (sanitized_text, pii_detected) = pii::sanitize(outbound_text);
        if pii_detected {
            log.push(ComplianceEvent {
                session_id: session_id.to_string(),
                status: ComplianceStatus::Compliant,
                policy: "pii_sanitation",
                description: "PII detected and redacted before egress to the LLM".to_string(),
                at: Utc::now(),
            });
        }

        // 2. Delegation block.
        if policy.block_complete_solutions && classifier.is_total_delegation {
            log.push(ComplianceEvent {
                session_id: session_id.to_string(),
                status: ComplianceStatus::Violation,
                policy: "block_complete_solutions",
                description: "complete-solution request without mediation".to_string(),
                at: Utc::now(),
            });
            let risk = Risk::new(
                crate::domain::SessionId(
                    uuid::Uuid::parse_str(session_id).unwrap_or_else(|_| uuid::Uuid::nil()),
                ),
                Vec::new(),
                RiskType::CognitiveDelegation,
                RiskLevel::High,
                RiskDimension::Cognitive,
                "Student requested a complete solution with no prior attempt visible",
                "Unmediated delegation undermines the learning objective of the activity",
                vec![outbound_text.to_string()],
                vec!["Ask the student to share their own attempt or reasoning first".to_string()],
                None,
            );
            return (
                FilterOutcome::Block {
                    message: PEDAGOGICAL_REDIRECT_MESSAGE.to_string(),
                    reason: "block_and_redirect",
                    risk: Box::new(risk),
                },
                log,
            );
        }

        // 3. Quantitative policy checks.
        let mut adjustments = Vec::new();
        if sequence.ai_dependency_score > policy.max_ai_dependency {
            adjustments.push("reduce_ai_dependency".to_string());
            log.push(ComplianceEvent {
                session_id: session_id.to_string(),
                status: ComplianceStatus::Warning,
                policy: "max_ai_dependency",
                description: format!(
                    "ai_dependency_score {:.2} exceeds max {:.2}",
                    sequence.ai_dependency_score, policy.max_ai_dependency
                ),
                at: Utc::now(),
            });
        }

        if policy.require_traceability && prior_trace_count == 0 {
            log.push(ComplianceEvent {
                session_id: session_id.to_string(),
                status: ComplianceStatus::Violation,
                policy: "require_traceability",
                description: "full N4 traceability is required for this activity".to_string(),
                at: Utc::now(),
            });
            return (
                FilterOutcome::Block {
                    message: "This activity requires full traceability; please continue through \
                              the tutoring interface rather than submitting work out of band."
                        .to_string(),
                    reason: "ensure_traceability",
                    risk: Box::new(Risk::new(
                        crate::domain::SessionId(
                            uuid::Uuid::parse_str(session_id).unwrap_or_else(|_| uuid::Uuid::nil()),
                        ),
                        Vec::new(),
                        RiskType::PolicyViolationRate,
                        RiskLevel::Medium,
                        RiskDimension::Governance,
                        "Traceability requirement violated",
                        "Session history cannot be reconstructed for accreditation review",
                        vec!["empty trace sequence at traceability-required checkpoint".to_string()],
                        vec!["Ensure every interaction flows through process_interaction".to_string()],
                        None,
                    )),
                },
                log,
            );
        }

        if adjustments.is_empty() {
            (
                FilterOutcome::Pass {
                    sanitized_text,
                    pii_detected,
                },
                log,
            )
        } else {
            (
                FilterOutcome::Warn {
                    sanitized_text,
                    pii_detected,
                    adjustments,
                },
                log,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::intervention::SuggestedStrategy;
    use crate::types::{CognitiveState, HelpLevel, InterventionMode, PedagogicalIntent, RequestType};

    fn classifier_output(is_total_delegation: bool) -> ClassifierOutput {
        ClassifierOutput {
            cognitive_state: CognitiveState::Implementation,
            cognitive_intent: "test".to_string(),
            delegation_level: if is_total_delegation { 0.9 } else { 0.1 },
            is_total_delegation,
            request_type: RequestType::Implementation,
            suggested_strategy: SuggestedStrategy {
                mode: InterventionMode::Guided,
                help_level: HelpLevel::Medium,
                pedagogical_intent: PedagogicalIntent::Scaffolding,
            },
        }
    }

    #[test]
    fn blocks_total_delegation_when_policy_forbids_it() {
        let policy = Policy::default_for_activity("act-1");
        let out = classifier_output(true);
        let seq = TraceSequence::default();
        let (outcome, _log) = DefaultGovernanceFilter.evaluate(
            "00000000-0000-0000-0000-000000000001",
            "give me the full code",
            &policy,
            &out,
            &seq,
            0,
        );
        assert!(matches!(outcome, FilterOutcome::Block { .. }));
    }

    #[test]
    fn passes_conceptual_question_through() {
        let policy = Policy::default_for_activity("act-1");
        let out = classifier_output(false);
        let seq = TraceSequence::default();
        let (outcome, _log) = DefaultGovernanceFilter.evaluate(
            "00000000-0000-0000-0000-000000000001",
            "what is a circular queue?",
            &policy,
            &out,
            &seq,
            1,
        );
        assert!(matches!(outcome, FilterOutcome::Pass { .. }));
    }

    #[test]
    fn sanitizes_pii_without_blocking() {
        let policy = Policy::default_for_activity("act-1");
        let out = classifier_output(false);
        let seq = TraceSequence::default();
        let (outcome, log) = DefaultGovernanceFilter.evaluate(
            "00000000-0000-0000-0000-000000000001",
            "contact me at juan@example.com",
            &policy,
            &out,
            &seq,
            1,
        );
        match outcome {
            FilterOutcome::Pass {
                sanitized_text,
                pii_detected,
            } => {
                assert!(pii_detected);
                assert!(sanitized_text.contains("[EMAIL_REDACTED]"));
            }
            other => panic!("expected Pass, got {other:?}"),
        }
        assert!(log.iter().any(|e| e.policy == "pii_sanitation"));
    }

    #[test]
    fn blocks_when_traceability_required_and_no_prior_history() {
        let policy = Policy::default_for_activity("act-1");
        let out = classifier_output(false);
        let seq = TraceSequence::default();
        let (outcome, log) = DefaultGovernanceFilter.evaluate(
            "00000000-0000-0000-0000-000000000001",
            "what is a circular queue?",
            &policy,
            &out,
            &seq,
            0,
        );
        assert!(matches!(outcome, FilterOutcome::Block { reason: "ensure_traceability", .. }));
        assert!(log.iter().any(|e| e.policy == "require_traceability"));
    }

    #[test]
    fn traceability_check_passes_once_prior_history_exists() {
        let policy = Policy::default_for_activity("act-1");
        let out = classifier_output(false);
        let seq = TraceSequence::default();
        let (outcome, _log) = DefaultGovernanceFilter.evaluate(
            "00000000-0000-0000-0000-000000000001",
            "what is a circular queue?",
            &policy,
            &out,
            &seq,
            3,
        );
        assert!(matches!(outcome, FilterOutcome::Pass { .. }));
    }
}

impl std::fmt::Debug for FilterOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterOutcome::Pass { pii_detected, .. } => {
                write!(f, "Pass {{ pii_detected: {pii_detected} }}")
            }
            FilterOutcome::Warn {
                pii_detected,
                adjustments,
                ..
            } => write!(
                f,
                "Warn {{ pii_detected: {pii_detected}, adjustments: {adjustments:?} }}"
            ),
            FilterOutcome::Block { reason, .. } => write!(f, "Block {{ reason: {reason} }}"),
        }
    }
}
