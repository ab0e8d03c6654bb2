//! Clarification strategy: the prompt is too ambiguous to classify with
//! confidence, so the tutor asks for specifics instead of guessing at
//! intent (spec.md §4.4). Grounded in
//! `original_source/.../agents/tutor_modes/metacognitive.py`'s
//! `ClarificationStrategy`, which fires independently of the LLM path —
//! the request for context is always the same fixed message.

use async_trait::async_trait;

use crate::dispatcher::{DispatchContext, Strategy};
use crate::domain::intervention::Intervention;
use crate::llm::LlmProvider;
use crate::types::{InterventionMode, PedagogicalIntent};

#[derive(Clone, Copy, Debug, Default)]
pub struct ClarificationStrategy;

const MESSAGE: &str = "I need a bit more information to help you effectively. Could you tell me: \
what exact part is giving you trouble? What do you understand the task is asking you to do? What \
have you already tried, and what happened when you ran it versus what you expected? What do you \
think might be causing the issue? Please rephrase your question with these details.";

#[async_trait]
impl Strategy for ClarificationStrategy {
    fn mode(&self) -> InterventionMode {
        InterventionMode::Clarification
    }

    fn pedagogical_intent(&self) -> PedagogicalIntent {
        PedagogicalIntent::PromoteSpecificity
    }

    async fn generate_with_llm(
        &self,
        _ctx: &DispatchContext,
        _provider: &dyn LlmProvider,
    ) -> Option<Intervention> {
        None
    }

    fn generate_template(&self, ctx: &DispatchContext) -> Intervention {
        Intervention::new(
            self.mode(),
            ctx.classifier.suggested_strategy.help_level,
            self.pedagogical_intent(),
            MESSAGE,
            ctx.classifier.cognitive_state,
            false,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::StudentProfile;
    use crate::domain::intervention::{ClassifierOutput, SuggestedStrategy};
    use crate::llm::providers::mock::MockProvider;
    use crate::types::{CognitiveState, HelpLevel, RequestType};

    fn ctx() -> DispatchContext {
        DispatchContext {
            prompt: "help".to_string(),
            classifier: ClassifierOutput {
                cognitive_state: CognitiveState::Unknown,
                cognitive_intent: "ambiguous".to_string(),
                delegation_level: 0.0,
                is_total_delegation: false,
                request_type: RequestType::Conceptual,
                suggested_strategy: SuggestedStrategy {
                    mode: InterventionMode::Clarification,
                    help_level: HelpLevel::Minimal,
                    pedagogical_intent: PedagogicalIntent::PromoteSpecificity,
                },
            },
            recent_traces: Vec::new(),
            student_profile: StudentProfile::default(),
            deadline: std::time::Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn never_consults_the_llm_even_when_a_provider_is_available() {
        let provider = MockProvider::succeeding("this should never be used");
        let intervention = ClarificationStrategy
            .generate(&ctx(), Some(&provider))
            .await;
        assert_eq!(provider.call_count(), 0);
        assert!(!intervention.metadata.generated_with_llm);
    }

    #[test]
    fn asks_for_context_without_providing_content() {
        let intervention = ClarificationStrategy.generate_template(&ctx());
        assert!(!intervention.metadata.provides_code);
        assert_eq!(intervention.mode, InterventionMode::Clarification);
    }
}
