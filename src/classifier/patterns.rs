//! Phrase-pattern table driving cue extraction and the delegation score.
//!
//! Each entry is `{phrase, weight, category}`, matched as a case-insensitive
//! substring against the normalized (lowercased, accent-folded) prompt. The
//! table is deliberately a flat, inspectable data structure — in the style
//! of a guardrail pattern registry — rather than a hand-rolled parser, so
//! every weight is auditable and unit-testable phrase-by-phrase
//! (spec.md §4.2 "exact, documented list of phrase patterns").

#[derive(Clone, Copy, Debug)]
pub struct Pattern {
    pub phrase: &'static str,
    pub weight: f64,
    pub category: CueCategory,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CueCategory {
    Delegation,
    Debugging,
    Stuck,
    Frustrated,
    Reflection,
    Validation,
    Planning,
    Explanation,
    Exploration,
}

/// Cognitive-offloading phrases and their weight toward `delegation_level`.
/// Bilingual (es/en) because the source institution's student population
/// is bilingual; see `original_source/.../agents/governance.py`'s own
/// `"código completo"` / `"hacé todo"` literals for the Spanish half.
pub const DELEGATION_PATTERNS: &[Pattern] = &[
    Pattern { phrase: "dame el código completo", weight: 0.5, category: CueCategory::Delegation },
    Pattern { phrase: "dame todo el código", weight: 0.5, category: CueCategory::Delegation },
    Pattern { phrase: "hacelo por mi", weight: 0.45, category: CueCategory::Delegation },
    Pattern { phrase: "hacé todo", weight: 0.45, category: CueCategory::Delegation },
    Pattern { phrase: "resolvelo vos", weight: 0.4, category: CueCategory::Delegation },
    Pattern { phrase: "escribime el programa entero", weight: 0.5, category: CueCategory::Delegation },
    Pattern { phrase: "sin que yo haga nada", weight: 0.35, category: CueCategory::Delegation },
    Pattern { phrase: "dame la solución completa", weight: 0.5, category: CueCategory::Delegation },
    Pattern { phrase: "give me the full code", weight: 0.5, category: CueCategory::Delegation },
    Pattern { phrase: "give me the complete code", weight: 0.5, category: CueCategory::Delegation },
    Pattern { phrase: "do it for me", weight: 0.45, category: CueCategory::Delegation },
    Pattern { phrase: "solve this for me", weight: 0.45, category: CueCategory::Delegation },
    Pattern { phrase: "write the whole program", weight: 0.5, category: CueCategory::Delegation },
    Pattern { phrase: "write the entire solution", weight: 0.5, category: CueCategory::Delegation },
    Pattern { phrase: "just give me the answer", weight: 0.4, category: CueCategory::Delegation },
    Pattern { phrase: "complete solution", weight: 0.3, category: CueCategory::Delegation },
    Pattern { phrase: "solución completa", weight: 0.3, category: CueCategory::Delegation },
    Pattern { phrase: "todo el código", weight: 0.3, category: CueCategory::Delegation },
];

pub const DEBUGGING_PATTERNS: &[Pattern] = &[
    Pattern { phrase: "no funciona", weight: 0.4, category: CueCategory::Debugging },
    Pattern { phrase: "no anda", weight: 0.35, category: CueCategory::Debugging },
    Pattern { phrase: "por qué no funciona", weight: 0.45, category: CueCategory::Debugging },
    Pattern { phrase: "why doesn't it work", weight: 0.45, category: CueCategory::Debugging },
    Pattern { phrase: "why isn't this working", weight: 0.45, category: CueCategory::Debugging },
    Pattern { phrase: "traceback", weight: 0.35, category: CueCategory::Debugging },
    Pattern { phrase: "stack trace", weight: 0.35, category: CueCategory::Debugging },
    Pattern { phrase: "error:", weight: 0.3, category: CueCategory::Debugging },
    Pattern { phrase: "exception", weight: 0.25, category: CueCategory::Debugging },
    Pattern { phrase: "me tira error", weight: 0.4, category: CueCategory::Debugging },
    Pattern { phrase: "undefined is not a function", weight: 0.3, category: CueCategory::Debugging },
    Pattern { phrase: "segmentation fault", weight: 0.3, category: CueCategory::Debugging },
];

pub const STUCK_PATTERNS: &[Pattern] = &[
    Pattern { phrase: "no sé qué hacer", weight: 0.45, category: CueCategory::Stuck },
    Pattern { phrase: "estoy atascado", weight: 0.45, category: CueCategory::Stuck },
    Pattern { phrase: "no avanzo", weight: 0.4, category: CueCategory::Stuck },
    Pattern { phrase: "me trabé", weight: 0.4, category: CueCategory::Stuck },
    Pattern { phrase: "i'm stuck", weight: 0.45, category: CueCategory::Stuck },
    Pattern { phrase: "i don't know what to do", weight: 0.4, category: CueCategory::Stuck },
    Pattern { phrase: "no tengo idea", weight: 0.35, category: CueCategory::Stuck },
];

pub const FRUSTRATED_PATTERNS: &[Pattern] = &[
    Pattern { phrase: "ya no puedo más", weight: 0.5, category: CueCategory::Frustrated },
    Pattern { phrase: "estoy cansado de esto", weight: 0.45, category: CueCategory::Frustrated },
    Pattern { phrase: "esto es imposible", weight: 0.4, category: CueCategory::Frustrated },
    Pattern { phrase: "odio esto", weight: 0.45, category: CueCategory::Frustrated },
    Pattern { phrase: "i give up", weight: 0.5, category: CueCategory::Frustrated },
    Pattern { phrase: "this is impossible", weight: 0.4, category: CueCategory::Frustrated },
    Pattern { phrase: "i hate this", weight: 0.45, category: CueCategory::Frustrated },
    Pattern { phrase: "i'm so frustrated", weight: 0.5, category: CueCategory::Frustrated },
];

pub const REFLECTION_PATTERNS: &[Pattern] = &[
    Pattern { phrase: "por qué hice", weight: 0.4, category: CueCategory::Reflection },
    Pattern { phrase: "qué aprendí", weight: 0.4, category: CueCategory::Reflection },
    Pattern { phrase: "en retrospectiva", weight: 0.4, category: CueCategory::Reflection },
    Pattern { phrase: "reflexionando", weight: 0.4, category: CueCategory::Reflection },
    Pattern { phrase: "what did i learn", weight: 0.4, category: CueCategory::Reflection },
    Pattern { phrase: "in retrospect", weight: 0.4, category: CueCategory::Reflection },
    Pattern { phrase: "looking back", weight: 0.35, category: CueCategory::Reflection },
    Pattern { phrase: "mi razonamiento fue", weight: 0.4, category: CueCategory::Reflection },
];

pub const VALIDATION_PATTERNS: &[Pattern] = &[
    Pattern { phrase: "¿está bien esto?", weight: 0.35, category: CueCategory::Validation },
    Pattern { phrase: "esto está bien?", weight: 0.35, category: CueCategory::Validation },
    Pattern { phrase: "is this correct", weight: 0.35, category: CueCategory::Validation },
    Pattern { phrase: "is this right", weight: 0.35, category: CueCategory::Validation },
    Pattern { phrase: "does this look okay", weight: 0.3, category: CueCategory::Validation },
    Pattern { phrase: "funciona bien así", weight: 0.3, category: CueCategory::Validation },
];

pub const PLANNING_PATTERNS: &[Pattern] = &[
    Pattern { phrase: "cómo debería estructurar", weight: 0.4, category: CueCategory::Planning },
    Pattern { phrase: "qué pasos sigo", weight: 0.4, category: CueCategory::Planning },
    Pattern { phrase: "cuál es la estrategia", weight: 0.4, category: CueCategory::Planning },
    Pattern { phrase: "how should i structure", weight: 0.4, category: CueCategory::Planning },
    Pattern { phrase: "what steps should i take", weight: 0.4, category: CueCategory::Planning },
    Pattern { phrase: "what's the best approach", weight: 0.35, category: CueCategory::Planning },
    Pattern { phrase: "plan de implementación", weight: 0.35, category: CueCategory::Planning },
];

pub const EXPLANATION_PATTERNS: &[Pattern] = &[
    Pattern { phrase: "qué es", weight: 0.3, category: CueCategory::Explanation },
    Pattern { phrase: "en qué se diferencia", weight: 0.3, category: CueCategory::Explanation },
    Pattern { phrase: "cómo funciona", weight: 0.3, category: CueCategory::Explanation },
    Pattern { phrase: "what is", weight: 0.3, category: CueCategory::Explanation },
    Pattern { phrase: "how does", weight: 0.3, category: CueCategory::Explanation },
    Pattern { phrase: "explain", weight: 0.3, category: CueCategory::Explanation },
    Pattern { phrase: "what's the difference between", weight: 0.3, category: CueCategory::Explanation },
    Pattern { phrase: "puedes explicar", weight: 0.3, category: CueCategory::Explanation },
];

/// Absence of student-authored reasoning: phrases that mark an attempt was
/// actually made, inverted to detect its *absence* at the call site.
pub const STUDENT_ATTEMPT_MARKERS: &[&str] = &[
    "probé",
    "intenté",
    "mi intento",
    "lo que hice fue",
    "creo que",
    "pienso que",
    "i tried",
    "my attempt",
    "i think",
    "here's what i did",
    "here is what i have so far",
];

pub fn all_pattern_tables() -> [&'static [Pattern]; 8] {
    [
        DELEGATION_PATTERNS,
        DEBUGGING_PATTERNS,
        STUCK_PATTERNS,
        FRUSTRATED_PATTERNS,
        REFLECTION_PATTERNS,
        VALIDATION_PATTERNS,
        PLANNING_PATTERNS,
        EXPLANATION_PATTERNS,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_pattern_phrase_is_lowercase() {
        for table in all_pattern_tables() {
            for p in table {
                assert_eq!(p.phrase, p.phrase.to_lowercase(), "{}", p.phrase);
            }
        }
    }

    #[test]
    fn every_pattern_weight_is_in_unit_interval() {
        for table in all_pattern_tables() {
            for p in table {
                assert!(p.weight > 0.0 && p.weight <= 1.0, "{}", p.phrase);
            }
        }
    }
}
