//! Guided strategy: graduated hints with cognitive scaffolding, never
//! revealing a complete solution (spec.md §4.4). Grounded in
//! `original_source/.../agents/tutor_modes/guided.py`'s four-level scheme:
//! level 1 orienting questions, level 2 conceptual hints, level 3 detailed
//! hints plus high-level pseudocode, level 4 conceptual fragments plus
//! detailed strategy.

use async_trait::async_trait;

use crate::dispatcher::templates::truncated;
use crate::dispatcher::{try_llm_call, DispatchContext, Strategy};
use crate::domain::intervention::{Hint, Intervention};
use crate::llm::LlmProvider;
use crate::types::{HelpLevel, HintType, InterventionMode, PedagogicalIntent};

#[derive(Clone, Copy, Debug, Default)]
pub struct GuidedStrategy;

const SYSTEM_PROMPT: &str = "You are a guided-hints tutor using scaffolding. Give the student a \
single hint at the requested level. Levels 1-2 are questions and conceptual hints only, never \
code. Levels 3-4 may include high-level pseudocode or a short conceptual fragment, but never a \
complete, directly runnable solution.";

fn hint_level(help_level: HelpLevel) -> u8 {
    match help_level {
        HelpLevel::Minimal => 1,
        HelpLevel::Low => 2,
        HelpLevel::Medium => 3,
        HelpLevel::High => 4,
    }
}

fn hint_type_for_level(level: u8) -> HintType {
    match level {
        1 => HintType::Question,
        2 => HintType::Conceptual,
        3 => HintType::Pseudocode,
        _ => HintType::Fragment,
    }
}

fn template_hint_content(level: u8, prompt: &str) -> String {
    match level {
        1 => format!(
            "What's the very first thing your solution needs to figure out, given: \"{}\"?",
            truncated(prompt, 200)
        ),
        2 => "Think about which data structure or control-flow pattern naturally models this \
              problem. What invariant must hold at every step?"
            .to_string(),
        3 => "Here's a high-level shape, not working code:\n\
              1. initialize your state\n\
              2. loop while the termination condition doesn't hold\n\
              3. update state and check the invariant\n\
              4. return the accumulated result\n\
              Map each of your problem's specifics onto these four steps."
            .to_string(),
        _ => "Consider this fragment of reasoning: the tricky part is usually the boundary \
              condition — what happens at the very first or very last element? Work out that \
              case on paper before writing anything."
            .to_string(),
    }
}

#[async_trait]
impl Strategy for GuidedStrategy {
    fn mode(&self) -> InterventionMode {
        InterventionMode::Guided
    }

    fn pedagogical_intent(&self) -> PedagogicalIntent {
        PedagogicalIntent::Scaffolding
    }

    async fn generate_with_llm(
        &self,
        ctx: &DispatchContext,
        provider: &dyn LlmProvider,
    ) -> Option<Intervention> {
        let level = hint_level(ctx.classifier.suggested_strategy.help_level);
        let user_prompt = format!(
            "Student prompt: \"{}\"\nHint level requested: {}\nPrevious hints already given this \
             session: {}",
            truncated(&ctx.prompt, 500),
            level,
            ctx.student_profile.hints_received
        );
        let content = try_llm_call(provider, SYSTEM_PROMPT, &user_prompt, ctx, 400).await?;
        let hint = Hint {
            level,
            hint_type: hint_type_for_level(level),
            content: content.clone(),
        };
        Some(
            Intervention::new(
                self.mode(),
                ctx.classifier.suggested_strategy.help_level,
                self.pedagogical_intent(),
                content,
                ctx.classifier.cognitive_state,
                true,
            )
            .with_hints(vec![hint]),
        )
    }

    fn generate_template(&self, ctx: &DispatchContext) -> Intervention {
        let level = hint_level(ctx.classifier.suggested_strategy.help_level);
        let content = template_hint_content(level, &ctx.prompt);
        let hint = Hint {
            level,
            hint_type: hint_type_for_level(level),
            content: content.clone(),
        };
        Intervention::new(
            self.mode(),
            ctx.classifier.suggested_strategy.help_level,
            self.pedagogical_intent(),
            content,
            ctx.classifier.cognitive_state,
            false,
        )
        .with_hints(vec![hint])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::StudentProfile;
    use crate::domain::intervention::{ClassifierOutput, SuggestedStrategy};
    use crate::types::{CognitiveState, RequestType};

    fn ctx_at_level(help_level: HelpLevel) -> DispatchContext {
        DispatchContext {
            prompt: "how do I implement this loop?".to_string(),
            classifier: ClassifierOutput {
                cognitive_state: CognitiveState::Implementation,
                cognitive_intent: "seeks_implementation_plan".to_string(),
                delegation_level: 0.2,
                is_total_delegation: false,
                request_type: RequestType::Implementation,
                suggested_strategy: SuggestedStrategy {
                    mode: InterventionMode::Guided,
                    help_level,
                    pedagogical_intent: PedagogicalIntent::Scaffolding,
                },
            },
            recent_traces: Vec::new(),
            student_profile: StudentProfile::default(),
            deadline: std::time::Duration::from_secs(5),
        }
    }

    #[test]
    fn minimal_help_level_never_shows_pseudocode() {
        let intervention = GuidedStrategy.generate_template(&ctx_at_level(HelpLevel::Minimal));
        let hints = intervention.hints_provided.unwrap();
        assert_eq!(hints[0].level, 1);
        assert_eq!(hints[0].hint_type, HintType::Question);
        assert!(!intervention.metadata.provides_code);
    }

    #[test]
    fn medium_help_level_may_show_pseudocode_but_not_code() {
        let intervention = GuidedStrategy.generate_template(&ctx_at_level(HelpLevel::Medium));
        let hints = intervention.hints_provided.unwrap();
        assert_eq!(hints[0].hint_type, HintType::Pseudocode);
        assert!(!intervention.metadata.provides_code);
    }
}
