//! Small shared helpers for template-path message composition. Kept
//! separate from each strategy module so the deterministic fallback text
//! stays easy to audit independent of the LLM-path prompt composition.

use crate::domain::trace::Trace;

/// True when the recent history shows at least one student-authored
/// justification, used by strategies that vary their tone based on whether
/// the student has been explaining their reasoning.
#[must_use]
pub fn has_recent_justification(recent_traces: &[Trace]) -> bool {
    recent_traces
        .iter()
        .any(|t| t.decision_justification.is_some())
}

/// Truncates a prompt for embedding into a system prompt preamble, matching
/// the teacher-adjacent convention of logging/quoting only a prefix of
/// student input.
#[must_use]
pub fn truncated(prompt: &str, max_chars: usize) -> String {
    if prompt.chars().count() <= max_chars {
        prompt.to_string()
    } else {
        let mut s: String = prompt.chars().take(max_chars).collect();
        s.push('…');
        s
    }
}
