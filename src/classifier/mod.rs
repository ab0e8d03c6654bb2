//! The Cognitive-Pedagogical Reasoning Engine (CRPE): a pure function over
//! `(prompt, context, recent_session_history)` producing a `ClassifierOutput`
//! in bounded time, with no LLM call and no randomness (spec.md §4.2).

pub mod patterns;

use patterns::{Pattern, all_pattern_tables};

use crate::domain::intervention::{ClassifierOutput, SuggestedStrategy};
use crate::domain::trace::Trace;
use crate::domain::policy::Policy;
use crate::types::{CognitiveState, HelpLevel, InterventionMode, PedagogicalIntent, RequestType};

/// Everything the classifier needs besides the raw prompt text. Carried
/// separately from `Trace` so the classifier stays decoupled from
/// persistence: it only ever reads, never writes.
#[derive(Clone, Debug, Default)]
pub struct ClassifierContext {
    /// Up to the last N traces for this session (N default 20, matching the
    /// dispatcher's own window — spec.md §4.4), most-recent-last.
    pub recent_history: Vec<Trace>,
    /// Number of `Guided` hints already delivered in this session.
    pub previous_hints_count: u32,
}

pub trait Classifier: Send + Sync {
    fn classify(&self, prompt: &str, ctx: &ClassifierContext, policy: &Policy) -> ClassifierOutput;
}

/// Minimum trimmed length below which a prompt is too ambiguous to
/// classify at all (spec.md §4.4 "Clarification strategy").
pub const AMBIGUOUS_LENGTH_THRESHOLD: usize = 12;

#[derive(Clone, Copy, Debug, Default)]
pub struct CrpeClassifier;

impl Classifier for CrpeClassifier {
    fn classify(&self, prompt: &str, ctx: &ClassifierContext, policy: &Policy) -> ClassifierOutput {
        let normalized = normalize(prompt);
        let trimmed_len = normalized.trim().len();

        let delegation_level = score_delegation(&normalized);
        let is_total_delegation = delegation_level >= 0.7;

        let cognitive_state = if trimmed_len < AMBIGUOUS_LENGTH_THRESHOLD {
            CognitiveState::Unknown
        } else {
            pick_cognitive_state(&normalized)
        };

        let (request_type, cognitive_intent) = pick_request_type(&normalized, cognitive_state);

        let suggested_strategy = suggest_strategy(
            cognitive_state,
            request_type,
            is_total_delegation,
            policy,
            ctx,
        );

        ClassifierOutput {
            cognitive_state,
            cognitive_intent,
            delegation_level,
            is_total_delegation,
            request_type,
            suggested_strategy,
        }
    }
}

fn normalize(prompt: &str) -> String {
    prompt.to_lowercase()
}

/// `delegation_level = min(1, Σ pattern_weights)` over the documented
/// delegation pattern table, with a small additive bump when the prompt
/// looks like a pasted problem statement with no attempt markers at all
/// (spec.md §4.2 "pasted problem statement without attempt").
fn score_delegation(normalized: &str) -> f64 {
    let mut score: f64 = patterns::DELEGATION_PATTERNS
        .iter()
        .filter(|p| normalized.contains(p.phrase))
        .map(|p| p.weight)
        .sum();

    let looks_like_bare_problem_statement = normalized.trim().ends_with('.')
        && normalized.len() > 200
        && !patterns::STUDENT_ATTEMPT_MARKERS
            .iter()
            .any(|m| normalized.contains(m));
    if looks_like_bare_problem_statement {
        score += 0.2;
    }

    score.min(1.0)
}

fn matches_any(normalized: &str, table: &[Pattern]) -> bool {
    table.iter().any(|p| normalized.contains(p.phrase))
}

fn weight_sum(normalized: &str, table: &[Pattern]) -> f64 {
    table
        .iter()
        .filter(|p| normalized.contains(p.phrase))
        .map(|p| p.weight)
        .sum()
}

/// Ordered rule evaluation; ties broken in declaration order
/// (spec.md §4.2). Debugging/stuck/frustrated signals take priority over
/// generic exploration/planning framing since they name an urgent state.
fn pick_cognitive_state(normalized: &str) -> CognitiveState {
    if matches_any(normalized, patterns::DEBUGGING_PATTERNS) {
        return CognitiveState::Debugging;
    }
    if matches_any(normalized, patterns::FRUSTRATED_PATTERNS) {
        return CognitiveState::Frustrated;
    }
    if matches_any(normalized, patterns::STUCK_PATTERNS) {
        return CognitiveState::Stuck;
    }
    if matches_any(normalized, patterns::REFLECTION_PATTERNS) {
        return CognitiveState::Reflection;
    }
    if matches_any(normalized, patterns::VALIDATION_PATTERNS) {
        return CognitiveState::Validation;
    }
    if matches_any(normalized, patterns::PLANNING_PATTERNS) {
        return CognitiveState::Planning;
    }
    if contains_code_fragment(normalized) {
        return CognitiveState::Implementation;
    }
    if matches_any(normalized, patterns::EXPLANATION_PATTERNS) || normalized.trim_end().ends_with('?')
    {
        return CognitiveState::Exploration;
    }
    CognitiveState::Exploration
}

fn contains_code_fragment(normalized: &str) -> bool {
    normalized.contains("```")
        || normalized.contains("def ")
        || normalized.contains("function ")
        || normalized.contains('{')
        || normalized.contains(';')
}

/// `request_type` picked from the dominant cue family: whichever pattern
/// table contributed the most weight. Ties favor the `cognitive_state`
/// already chosen, keeping the two outputs consistent.
fn pick_request_type(normalized: &str, cognitive_state: CognitiveState) -> (RequestType, String) {
    let families: [(RequestType, &[Pattern], &str); 5] = [
        (RequestType::Conceptual, patterns::EXPLANATION_PATTERNS, "seeks_explanation"),
        (RequestType::Implementation, patterns::PLANNING_PATTERNS, "seeks_implementation_plan"),
        (RequestType::Debugging, patterns::DEBUGGING_PATTERNS, "reports_error"),
        (RequestType::Validation, patterns::VALIDATION_PATTERNS, "seeks_confirmation"),
        (RequestType::Reflection, patterns::REFLECTION_PATTERNS, "reflects_on_process"),
    ];

    let best = families
        .iter()
        .map(|(rt, table, label)| (*rt, weight_sum(normalized, table), *label))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap());

    match best {
        Some((rt, weight, label)) if weight > 0.0 => (rt, label.to_string()),
        _ => match cognitive_state {
            CognitiveState::Debugging => (RequestType::Debugging, "reports_error".to_string()),
            CognitiveState::Reflection => (RequestType::Reflection, "reflects_on_process".to_string()),
            CognitiveState::Validation => (RequestType::Validation, "seeks_confirmation".to_string()),
            CognitiveState::Implementation => {
                (RequestType::Implementation, "seeks_implementation_plan".to_string())
            }
            _ => (RequestType::Conceptual, "open_ended_question".to_string()),
        },
    }
}

fn suggest_strategy(
    cognitive_state: CognitiveState,
    request_type: RequestType,
    is_total_delegation: bool,
    policy: &Policy,
    ctx: &ClassifierContext,
) -> SuggestedStrategy {
    let (mode, pedagogical_intent) = if matches!(
        cognitive_state,
        CognitiveState::Stuck | CognitiveState::Frustrated
    ) {
        (InterventionMode::Metacognitive, PedagogicalIntent::PromoteSelfReflection)
    } else if is_total_delegation {
        (InterventionMode::Socratic, PedagogicalIntent::PromoteDecompositionAndPlanning)
    } else {
        match request_type {
            RequestType::Conceptual => {
                (InterventionMode::Explicative, PedagogicalIntent::ConceptualUnderstanding)
            }
            RequestType::Reflection => {
                (InterventionMode::Metacognitive, PedagogicalIntent::PromoteSelfReflection)
            }
            RequestType::Implementation | RequestType::Debugging | RequestType::Validation => {
                (InterventionMode::Guided, PedagogicalIntent::Scaffolding)
            }
        }
    };

    let help_level = graduated_help_level(policy, ctx);

    SuggestedStrategy {
        mode,
        help_level,
        pedagogical_intent,
    }
}

/// `help_level` monotonically decreased from the policy's max by one step
/// per five previous hints, and one more step if mean `ai_involvement` over
/// recent traces exceeds 0.6 (spec.md §4.2).
fn graduated_help_level(policy: &Policy, ctx: &ClassifierContext) -> HelpLevel {
    let starting = help_level_from_ratio(policy.max_ai_assistance_level);

    let steps_from_hints = (ctx.previous_hints_count / 5) as u8;

    let mean_ai_involvement = if ctx.recent_history.is_empty() {
        0.0
    } else {
        ctx.recent_history.iter().map(|t| t.ai_involvement).sum::<f64>()
            / ctx.recent_history.len() as f64
    };
    let steps_from_dependency: u8 = if mean_ai_involvement > 0.6 { 1 } else { 0 };

    starting.decreased_by(steps_from_hints + steps_from_dependency)
}

fn help_level_from_ratio(ratio: f64) -> HelpLevel {
    if ratio < 0.25 {
        HelpLevel::Minimal
    } else if ratio < 0.5 {
        HelpLevel::Low
    } else if ratio < 0.75 {
        HelpLevel::Medium
    } else {
        HelpLevel::High
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ClassifierContext {
        ClassifierContext::default()
    }

    fn policy() -> Policy {
        Policy::default_for_activity("act-1")
    }

    #[test]
    fn total_delegation_request_is_flagged() {
        let out = CrpeClassifier.classify(
            "Dame el código completo de una cola circular con arreglos",
            &ctx(),
            &policy(),
        );
        assert!(out.is_total_delegation);
        assert!(out.delegation_level >= 0.7);
    }

    #[test]
    fn conceptual_question_is_not_delegation() {
        let out = CrpeClassifier.classify(
            "¿Qué es una cola circular y en qué se diferencia de una cola simple?",
            &ctx(),
            &policy(),
        );
        assert!(!out.is_total_delegation);
        assert!(out.delegation_level < 0.5);
        assert_eq!(out.cognitive_state, CognitiveState::Exploration);
        assert_eq!(out.request_type, RequestType::Conceptual);
    }

    #[test]
    fn debugging_markers_select_debugging_state() {
        let out = CrpeClassifier.classify(
            "Tengo este traceback y no sé qué es, Error: index out of range",
            &ctx(),
            &policy(),
        );
        assert_eq!(out.cognitive_state, CognitiveState::Debugging);
        assert_eq!(out.request_type, RequestType::Debugging);
    }

    #[test]
    fn very_short_prompt_is_unknown() {
        let out = CrpeClassifier.classify("ayuda", &ctx(), &policy());
        assert_eq!(out.cognitive_state, CognitiveState::Unknown);
    }

    #[test]
    fn stuck_and_frustrated_route_to_metacognitive() {
        let out = CrpeClassifier.classify("Ya no puedo más con este ejercicio", &ctx(), &policy());
        assert_eq!(out.cognitive_state, CognitiveState::Frustrated);
        assert_eq!(out.suggested_strategy.mode, InterventionMode::Metacognitive);
    }

    #[test]
    fn help_level_steps_down_after_five_hints() {
        let mut c = ctx();
        c.previous_hints_count = 5;
        let out = CrpeClassifier.classify(
            "¿Cómo debería estructurar mi solución?",
            &c,
            &policy(),
        );
        let without_hints = CrpeClassifier
            .classify("¿Cómo debería estructurar mi solución?", &ctx(), &policy())
            .suggested_strategy
            .help_level;
        assert!(out.suggested_strategy.help_level.ordinal() <= without_hints.ordinal());
    }

    #[test]
    fn classification_is_deterministic() {
        let prompt = "No funciona mi código, me tira un error raro";
        let a = CrpeClassifier.classify(prompt, &ctx(), &policy());
        let b = CrpeClassifier.classify(prompt, &ctx(), &policy());
        assert_eq!(a.cognitive_state, b.cognitive_state);
        assert_eq!(a.delegation_level, b.delegation_level);
    }
}
