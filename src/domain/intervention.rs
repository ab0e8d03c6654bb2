use serde::{Deserialize, Serialize};

use crate::types::{
    CognitiveState, HelpLevel, HintType, InterventionMode, PedagogicalIntent, RequestType,
};

/// Output of the cognitive-pedagogical classifier (CRPE) for one prompt.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClassifierOutput {
    pub cognitive_state: CognitiveState,
    /// Free-form label naming the dominant cue family that drove the
    /// classification (e.g. "seeks_explanation", "reports_error"), distinct
    /// from the closed-set `request_type`.
    pub cognitive_intent: String,
    pub delegation_level: f64,
    pub is_total_delegation: bool,
    pub request_type: RequestType,
    pub suggested_strategy: SuggestedStrategy,
}

/// The classifier's Intervention-shaped hint, consumed by the dispatcher to
/// pick which strategy to run and at what help level.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SuggestedStrategy {
    pub mode: InterventionMode,
    pub help_level: HelpLevel,
    pub pedagogical_intent: PedagogicalIntent,
}

/// A single graduated hint within a `Guided` intervention.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Hint {
    pub level: u8,
    pub hint_type: HintType,
    pub content: String,
}

/// The tutor's single response to a student prompt.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Intervention {
    pub mode: InterventionMode,
    pub help_level: HelpLevel,
    pub pedagogical_intent: PedagogicalIntent,
    pub message: String,
    pub requires_student_response: bool,
    pub questions: Option<Vec<String>>,
    pub hints_provided: Option<Vec<Hint>>,
    pub requires_justification: bool,
    pub metadata: InterventionMetadata,
}

impl Intervention {
    /// `provides_code` is a hard invariant: never true for any strategy
    /// output (spec.md §4.4). Strategies construct interventions through
    /// this constructor so the invariant can't be forgotten at a call site.
    #[must_use]
    pub fn new(
        mode: InterventionMode,
        help_level: HelpLevel,
        pedagogical_intent: PedagogicalIntent,
        message: impl Into<String>,
        cognitive_state: CognitiveState,
        generated_with_llm: bool,
    ) -> Self {
        Self {
            mode,
            help_level,
            pedagogical_intent,
            message: message.into(),
            requires_student_response: true,
            questions: None,
            hints_provided: None,
            requires_justification: false,
            metadata: InterventionMetadata {
                cognitive_state,
                provides_code: false,
                generated_with_llm,
            },
        }
    }

    #[must_use]
    pub fn with_questions(mut self, questions: Vec<String>) -> Self {
        self.questions = Some(questions);
        self
    }

    #[must_use]
    pub fn with_hints(mut self, hints: Vec<Hint>) -> Self {
        self.hints_provided = Some(hints);
        self
    }

    #[must_use]
    pub fn with_requires_justification(mut self, requires: bool) -> Self {
        self.requires_justification = requires;
        self
    }

    #[must_use]
    pub fn without_requiring_response(mut self) -> Self {
        self.requires_student_response = false;
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InterventionMetadata {
    pub cognitive_state: CognitiveState,
    /// Invariant, always `false`: no strategy emits executable code that
    /// would solve the task (pseudocode only, at `help_level` medium/high).
    pub provides_code: bool,
    pub generated_with_llm: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_intervention_never_provides_code() {
        let i = Intervention::new(
            InterventionMode::Socratic,
            HelpLevel::Low,
            PedagogicalIntent::PromoteDecompositionAndPlanning,
            "What have you tried so far?",
            CognitiveState::Exploration,
            false,
        );
        assert!(!i.metadata.provides_code);
    }
}
