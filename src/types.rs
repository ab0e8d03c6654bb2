//! Closed-set wire vocabulary for the pedagogical gateway.
//!
//! Every enum here is a single lowercase `snake_case` vocabulary shared by
//! the wire (HTTP JSON) and the store (text columns), each with its own
//! `encode`/`decode` round-trip so the same closed set can't drift between
//! the two representations.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            #[must_use]
            pub fn encode(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }

            #[must_use]
            pub fn decode(s: &str) -> Option<Self> {
                match s {
                    $($wire => Some(Self::$variant)),+,
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.encode())
            }
        }
    };
}

wire_enum! {
    /// How a session is being used.
    pub enum SessionMode {
        Tutor => "tutor",
        Evaluator => "evaluator",
        Simulator => "simulator",
        Training => "training",
    }
}

wire_enum! {
    pub enum SessionLifecycle {
        Active => "active",
        Completed => "completed",
        Aborted => "aborted",
        Paused => "paused",
    }
}

wire_enum! {
    /// N1..N4 trace levels: Surface, Technical, Interactional, Cognitive.
    pub enum TraceLevel {
        Surface => "n1_surface",
        Technical => "n2_technical",
        Interactional => "n3_interactional",
        Cognitive => "n4_cognitive",
    }
}

wire_enum! {
    pub enum InteractionType {
        StudentPrompt => "student_prompt",
        AiResponse => "ai_response",
        CodeCommit => "code_commit",
        TutorIntervention => "tutor_intervention",
        TeacherFeedback => "teacher_feedback",
        StrategyChange => "strategy_change",
        HypothesisFormulation => "hypothesis_formulation",
        SelfCorrection => "self_correction",
        AiCritique => "ai_critique",
    }
}

wire_enum! {
    /// A closed-set label describing the student's momentary activity.
    pub enum CognitiveState {
        Exploration => "exploration",
        Planning => "planning",
        Implementation => "implementation",
        Debugging => "debugging",
        Validation => "validation",
        Reflection => "reflection",
        Stuck => "stuck",
        Frustrated => "frustrated",
        Unknown => "unknown",
    }
}

wire_enum! {
    pub enum RequestType {
        Conceptual => "conceptual",
        Implementation => "implementation",
        Debugging => "debugging",
        Validation => "validation",
        Reflection => "reflection",
    }
}

wire_enum! {
    /// Closed set of risk types the analyzer can emit.
    pub enum RiskType {
        CognitiveDelegation => "cognitive_delegation",
        HighAiDependency => "high_ai_dependency",
        MissingJustification => "missing_justification",
        UndisclosedAiUse => "undisclosed_ai_use",
        VerbatimCopy => "verbatim_copy",
        StuckWithoutExploration => "stuck_without_exploration",
        VulnerablePattern => "vulnerable_pattern",
        PolicyViolationRate => "policy_violation_rate",
    }
}

wire_enum! {
    pub enum RiskLevel {
        Info => "info",
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

wire_enum! {
    /// The five-axis schema for AI-use risk in education.
    pub enum RiskDimension {
        Cognitive => "cognitive",
        Ethical => "ethical",
        Epistemic => "epistemic",
        Technical => "technical",
        Governance => "governance",
    }
}

wire_enum! {
    pub enum InterventionMode {
        Socratic => "socratic",
        Explicative => "explicative",
        Guided => "guided",
        Metacognitive => "metacognitive",
        Clarification => "clarification",
    }
}

wire_enum! {
    pub enum HelpLevel {
        Minimal => "minimal",
        Low => "low",
        Medium => "medium",
        High => "high",
    }
}

impl HelpLevel {
    /// Monotonic ordinal used for "decrease help by one step" adjustments.
    #[must_use]
    pub fn ordinal(self) -> u8 {
        match self {
            HelpLevel::Minimal => 0,
            HelpLevel::Low => 1,
            HelpLevel::Medium => 2,
            HelpLevel::High => 3,
        }
    }

    #[must_use]
    pub fn from_ordinal(ord: u8) -> Self {
        match ord {
            0 => HelpLevel::Minimal,
            1 => HelpLevel::Low,
            2 => HelpLevel::Medium,
            _ => HelpLevel::High,
        }
    }

    /// Step the help level down (less autonomy-preserving) by `steps`, floored at `minimal`.
    #[must_use]
    pub fn decreased_by(self, steps: u8) -> Self {
        Self::from_ordinal(self.ordinal().saturating_sub(steps))
    }

    /// Outbound `ai_involvement` fixed mapping (spec Open Question resolution).
    #[must_use]
    pub fn ai_involvement(self) -> f64 {
        match self {
            HelpLevel::Minimal => 0.1,
            HelpLevel::Low => 0.25,
            HelpLevel::Medium => 0.5,
            HelpLevel::High => 0.75,
        }
    }
}

wire_enum! {
    /// Hint content category within a `Guided` intervention.
    pub enum HintType {
        Question => "question",
        Conceptual => "conceptual",
        Decomposition => "decomposition",
        Strategy => "strategy",
        Pseudocode => "pseudocode",
        Pattern => "pattern",
        Fragment => "fragment",
    }
}

wire_enum! {
    /// Closed-set pedagogical-intent label attached to every intervention.
    pub enum PedagogicalIntent {
        PromoteDecompositionAndPlanning => "promote_decomposition_and_planning",
        ConceptualUnderstanding => "conceptual_understanding",
        Scaffolding => "scaffolding",
        PromoteSelfReflection => "promote_self_reflection",
        PromoteSpecificity => "promote_specificity",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_variant() {
        for v in [
            SessionMode::Tutor,
            SessionMode::Evaluator,
            SessionMode::Simulator,
            SessionMode::Training,
        ] {
            assert_eq!(SessionMode::decode(v.encode()), Some(v));
        }
        for v in [CognitiveState::Exploration, CognitiveState::Unknown] {
            assert_eq!(CognitiveState::decode(v.encode()), Some(v));
        }
    }

    #[test]
    fn unknown_wire_value_decodes_to_none() {
        assert_eq!(CognitiveState::decode("bogus"), None);
    }

    #[test]
    fn help_level_steps_down_and_floors() {
        assert_eq!(HelpLevel::High.decreased_by(1), HelpLevel::Medium);
        assert_eq!(HelpLevel::Minimal.decreased_by(3), HelpLevel::Minimal);
    }

    #[test]
    fn help_level_ai_involvement_matches_spec_mapping() {
        assert_eq!(HelpLevel::Minimal.ai_involvement(), 0.1);
        assert_eq!(HelpLevel::High.ai_involvement(), 0.75);
    }
}
