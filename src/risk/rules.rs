//! The eight detection rules, two or one per dimension, matching spec.md
//! §4.7's bullet list. Each rule only inspects its window slice; none of
//! them touch the store directly, keeping them trivially testable in
//! isolation from the gateway and repositories.

use crate::classifier::patterns::{DELEGATION_PATTERNS, STUDENT_ATTEMPT_MARKERS};
use crate::domain::policy::Policy;
use crate::domain::risk::Risk;
use crate::domain::trace::Trace;
use crate::domain::SessionId;
use crate::risk::RiskRule;
use crate::types::{InteractionType, RiskDimension, RiskLevel, RiskType};

fn normalize(s: &str) -> String {
    s.to_lowercase()
}

fn inbound_prompts(window: &[Trace]) -> Vec<&Trace> {
    window
        .iter()
        .filter(|t| t.interaction_type == InteractionType::StudentPrompt)
        .collect()
}

/// Cognitive: delegation-token density above threshold.
pub struct DelegationDensityRule;

impl RiskRule for DelegationDensityRule {
    fn dimension(&self) -> RiskDimension {
        RiskDimension::Cognitive
    }

    fn evaluate(&self, session_id: SessionId, window: &[Trace], policy: &Policy) -> Option<Risk> {
        let prompts = inbound_prompts(window);
        if prompts.is_empty() {
            return None;
        }
        let matches: Vec<&Trace> = prompts
            .iter()
            .filter(|t| {
                let normalized = normalize(&t.content);
                DELEGATION_PATTERNS.iter().any(|p| normalized.contains(p.phrase))
            })
            .copied()
            .collect();
        let density = matches.len() as f64 / prompts.len() as f64;
        if density <= policy.threshold_for(self.dimension()) {
            return None;
        }

        Some(Risk::new(
            session_id,
            matches.iter().map(|t| t.id).collect(),
            RiskType::CognitiveDelegation,
            if density > 0.8 { RiskLevel::Critical } else { RiskLevel::High },
            self.dimension(),
            format!(
                "{:.0}% of recent prompts carry complete-solution delegation cues",
                density * 100.0
            ),
            "Repeated delegation requests indicate the student may be offloading the core \
             learning task instead of attempting it",
            matches.iter().map(|t| t.content.clone()).collect(),
            vec!["Escalate to Socratic mode for the remainder of the session".to_string()],
            None,
        ))
    }
}

/// Cognitive: mean ai-involvement above threshold.
pub struct HighAiDependencyRule;

impl RiskRule for HighAiDependencyRule {
    fn dimension(&self) -> RiskDimension {
        RiskDimension::Cognitive
    }

    fn evaluate(&self, session_id: SessionId, window: &[Trace], policy: &Policy) -> Option<Risk> {
        if window.is_empty() {
            return None;
        }
        let mean = window.iter().map(|t| t.ai_involvement).sum::<f64>() / window.len() as f64;
        if mean <= policy.max_ai_dependency {
            return None;
        }

        Some(Risk::new(
            session_id,
            window.iter().map(|t| t.id).collect(),
            RiskType::HighAiDependency,
            RiskLevel::High,
            self.dimension(),
            format!("mean ai_involvement {mean:.2} exceeds policy max {:.2}", policy.max_ai_dependency),
            "Sustained high AI involvement correlates with reduced autonomous problem-solving",
            vec![format!("mean_ai_involvement={mean:.4}")],
            vec!["Reduce graduated help level for subsequent interactions".to_string()],
            None,
        ))
    }
}

/// Cognitive: repeated pattern of inbound prompts with empty
/// `decision_justification` and no visible attempt marker.
pub struct MissingJustificationRule;

const MISSING_JUSTIFICATION_MIN_COUNT: usize = 3;

impl RiskRule for MissingJustificationRule {
    fn dimension(&self) -> RiskDimension {
        RiskDimension::Cognitive
    }

    fn evaluate(&self, session_id: SessionId, window: &[Trace], _policy: &Policy) -> Option<Risk> {
        let prompts = inbound_prompts(window);
        let unjustified: Vec<&Trace> = prompts
            .iter()
            .filter(|t| {
                t.decision_justification.is_none() && {
                    let normalized = normalize(&t.content);
                    !STUDENT_ATTEMPT_MARKERS.iter().any(|m| normalized.contains(m))
                }
            })
            .copied()
            .collect();

        if unjustified.len() < MISSING_JUSTIFICATION_MIN_COUNT {
            return None;
        }

        Some(Risk::new(
            session_id,
            unjustified.iter().map(|t| t.id).collect(),
            RiskType::MissingJustification,
            RiskLevel::Medium,
            self.dimension(),
            format!("{} consecutive prompts without a stated attempt or justification", unjustified.len()),
            "The student is not articulating their own reasoning before asking for help",
            unjustified.iter().map(|t| t.content.clone()).collect(),
            vec!["Require a one-line attempt summary before the next hint".to_string()],
            None,
        ))
    }
}

/// Ethical: patterns matching undisclosed AI use — the student claims sole
/// authorship in a session where AI involvement has in fact been high.
pub struct UndisclosedAiUseRule;

const NO_AI_CLAIM_MARKERS: &[&str] = &[
    "lo hice yo solo",
    "sin ayuda",
    "sin usar ia",
    "i did this myself",
    "without any help",
    "without ai",
    "no ai was used",
];

impl RiskRule for UndisclosedAiUseRule {
    fn dimension(&self) -> RiskDimension {
        RiskDimension::Ethical
    }

    fn evaluate(&self, session_id: SessionId, window: &[Trace], policy: &Policy) -> Option<Risk> {
        let prompts = inbound_prompts(window);
        let claims: Vec<&Trace> = prompts
            .iter()
            .filter(|t| {
                let normalized = normalize(&t.content);
                NO_AI_CLAIM_MARKERS.iter().any(|m| normalized.contains(m))
            })
            .copied()
            .collect();
        if claims.is_empty() {
            return None;
        }
        let mean = window.iter().map(|t| t.ai_involvement).sum::<f64>() / window.len().max(1) as f64;
        if mean <= policy.threshold_for(self.dimension()) {
            return None;
        }

        Some(Risk::new(
            session_id,
            claims.iter().map(|t| t.id).collect(),
            RiskType::UndisclosedAiUse,
            RiskLevel::High,
            self.dimension(),
            "Student claimed sole authorship in a session with high recorded AI involvement",
            "Undisclosed AI assistance undermines academic integrity assessments",
            claims.iter().map(|t| t.content.clone()).collect(),
            vec!["Flag for instructor review before grading".to_string()],
            None,
        ))
    }
}

/// Ethical: verbatim-copy markers — a student submission that reproduces an
/// earlier AI response near-verbatim rather than a reworked attempt.
pub struct VerbatimCopyRule;

const VERBATIM_MIN_SHARED_CHARS: usize = 80;

fn longest_common_substring_len(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut best = 0;
    for i in 1..=a.len() {
        let mut curr = vec![0usize; b.len() + 1];
        for j in 1..=b.len() {
            if a[i - 1] == b[j - 1] {
                curr[j] = prev[j - 1] + 1;
                best = best.max(curr[j]);
            }
        }
        prev = curr;
    }
    best
}

impl RiskRule for VerbatimCopyRule {
    fn dimension(&self) -> RiskDimension {
        RiskDimension::Ethical
    }

    fn evaluate(&self, session_id: SessionId, window: &[Trace], _policy: &Policy) -> Option<Risk> {
        let mut last_ai_response: Option<&Trace> = None;
        for t in window {
            match t.interaction_type {
                InteractionType::AiResponse => last_ai_response = Some(t),
                InteractionType::CodeCommit => {
                    if let Some(ai) = last_ai_response {
                        let shared = longest_common_substring_len(&ai.content, &t.content);
                        if shared >= VERBATIM_MIN_SHARED_CHARS {
                            return Some(Risk::new(
                                session_id,
                                vec![ai.id, t.id],
                                RiskType::VerbatimCopy,
                                RiskLevel::High,
                                self.dimension(),
                                "Submitted code shares a long verbatim run with the prior AI response",
                                "Near-verbatim reuse without adaptation suggests the work is not the \
                                 student's own",
                                vec![format!("shared_run_chars={shared}")],
                                vec!["Ask the student to explain the submitted code line by line".to_string()],
                                None,
                            ));
                        }
                    }
                }
                _ => {}
            }
        }
        None
    }
}

/// Epistemic: repeated `stuck` without interleaved exploration.
pub struct StuckWithoutExplorationRule;

const STUCK_RUN_THRESHOLD: usize = 3;

impl RiskRule for StuckWithoutExplorationRule {
    fn dimension(&self) -> RiskDimension {
        RiskDimension::Epistemic
    }

    fn evaluate(&self, session_id: SessionId, window: &[Trace], _policy: &Policy) -> Option<Risk> {
        use crate::types::CognitiveState::{Exploration, Frustrated, Stuck};

        let mut run: Vec<&Trace> = Vec::new();
        let mut best_run: Vec<&Trace> = Vec::new();
        for t in window {
            match t.cognitive_state {
                Stuck | Frustrated => run.push(t),
                Exploration => run.clear(),
                _ => { /* other states don't reset or extend a stuck run */ }
            }
            if run.len() > best_run.len() {
                best_run = run.clone();
            }
        }

        if best_run.len() < STUCK_RUN_THRESHOLD {
            return None;
        }

        Some(Risk::new(
            session_id,
            best_run.iter().map(|t| t.id).collect(),
            RiskType::StuckWithoutExploration,
            RiskLevel::Medium,
            self.dimension(),
            format!("{} consecutive stuck/frustrated traces with no interleaved exploration", best_run.len()),
            "The student is not exploring alternative approaches while blocked, risking premature \
             reliance on being told the answer",
            best_run.iter().map(|t| t.content.clone()).collect(),
            vec!["Route to the metacognitive strategy to prompt a change of approach".to_string()],
            None,
        ))
    }
}

/// Technical: detected vulnerability markers in submitted code.
pub struct VulnerablePatternRule;

const VULNERABILITY_MARKERS: &[&str] = &[
    "eval(",
    "exec(",
    "os.system(",
    "subprocess.call(",
    "shell=true",
    "select * from",
    "drop table",
    "pickle.loads(",
    "verify=false",
    "md5(",
];

impl RiskRule for VulnerablePatternRule {
    fn dimension(&self) -> RiskDimension {
        RiskDimension::Technical
    }

    fn evaluate(&self, session_id: SessionId, window: &[Trace], _policy: &Policy) -> Option<Risk> {
        let flagged: Vec<&Trace> = window
            .iter()
            .filter(|t| t.interaction_type == InteractionType::CodeCommit)
            .filter(|t| {
                let normalized = normalize(&t.content);
                VULNERABILITY_MARKERS.iter().any(|m| normalized.contains(m))
            })
            .collect();
        if flagged.is_empty() {
            return None;
        }

        Some(Risk::new(
            session_id,
            flagged.iter().map(|t| t.id).collect(),
            RiskType::VulnerablePattern,
            RiskLevel::Medium,
            self.dimension(),
            "Submitted code contains a known unsafe construct",
            "Unsafe constructs introduced without review can carry into the student's later work",
            flagged.iter().map(|t| t.content.clone()).collect(),
            vec!["Surface a targeted security note alongside the next intervention".to_string()],
            None,
        ))
    }
}

/// Governance: policy-violation count above threshold within the window.
/// Relies on the gateway tagging a trace's metadata with
/// `policy_violation: true` whenever the governance filter logs a
/// [`ComplianceStatus::Violation`](crate::governance::ComplianceStatus::Violation)
/// event for that interaction.
pub struct PolicyViolationRateRule;

impl RiskRule for PolicyViolationRateRule {
    fn dimension(&self) -> RiskDimension {
        RiskDimension::Governance
    }

    fn evaluate(&self, session_id: SessionId, window: &[Trace], policy: &Policy) -> Option<Risk> {
        if window.is_empty() {
            return None;
        }
        let violations: Vec<&Trace> = window
            .iter()
            .filter(|t| {
                t.metadata
                    .get("policy_violation")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false)
            })
            .collect();
        let rate = violations.len() as f64 / window.len() as f64;
        if rate <= policy.threshold_for(self.dimension()) {
            return None;
        }

        Some(Risk::new(
            session_id,
            violations.iter().map(|t| t.id).collect(),
            RiskType::PolicyViolationRate,
            RiskLevel::High,
            self.dimension(),
            format!("{:.0}% of interactions in this window violated policy", rate * 100.0),
            "A high rate of policy violations suggests the current policy or strategy mix isn't \
             fitting this student's behavior",
            vec![format!("violation_rate={rate:.4}")],
            vec!["Review this session's policy snapshot with the activity owner".to_string()],
            None,
        ))
    }
}
