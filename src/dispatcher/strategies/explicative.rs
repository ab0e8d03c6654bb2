//! Explicative strategy: conceptual explanations without revealing a
//! solution to the student's own task (spec.md §4.4). Grounded in
//! `original_source/.../agents/tutor_modes/explicative.py`.

use async_trait::async_trait;

use crate::dispatcher::templates::truncated;
use crate::dispatcher::{try_llm_call, DispatchContext, Strategy};
use crate::domain::intervention::Intervention;
use crate::llm::LlmProvider;
use crate::types::{InterventionMode, PedagogicalIntent};

#[derive(Clone, Copy, Debug, Default)]
pub struct ExplicativeStrategy;

const SYSTEM_PROMPT: &str = "You are a patient computer-science tutor. Explain the underlying \
concept the student is asking about in plain terms with a small generic illustrative example \
unrelated to their specific assignment. Never provide code that solves their assignment.";

#[async_trait]
impl Strategy for ExplicativeStrategy {
    fn mode(&self) -> InterventionMode {
        InterventionMode::Explicative
    }

    fn pedagogical_intent(&self) -> PedagogicalIntent {
        PedagogicalIntent::ConceptualUnderstanding
    }

    async fn generate_with_llm(
        &self,
        ctx: &DispatchContext,
        provider: &dyn LlmProvider,
    ) -> Option<Intervention> {
        let user_prompt = format!(
            "The student asked: \"{}\"\nExplain the concept clearly, without solving their \
             assignment.",
            truncated(&ctx.prompt, 500)
        );
        let content = try_llm_call(provider, SYSTEM_PROMPT, &user_prompt, ctx, 500).await?;
        Some(Intervention::new(
            self.mode(),
            ctx.classifier.suggested_strategy.help_level,
            self.pedagogical_intent(),
            content,
            ctx.classifier.cognitive_state,
            true,
        ))
    }

    fn generate_template(&self, ctx: &DispatchContext) -> Intervention {
        let message = "Good question. Rather than give you a ready-made answer, let's build the \
             concept up: think about what the core idea is trying to solve, then consider a \
             small, unrelated example of it before applying it to your own work. What part of \
             the concept feels least clear to you right now?"
            .to_string();
        Intervention::new(
            self.mode(),
            ctx.classifier.suggested_strategy.help_level,
            self.pedagogical_intent(),
            message,
            ctx.classifier.cognitive_state,
            false,
        )
    }
}
