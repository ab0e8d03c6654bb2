//! Socratic strategy: questioning to promote reasoning and problem
//! decomposition, fired when the classifier flags total delegation
//! (spec.md §4.4). Grounded in
//! `original_source/.../agents/tutor_modes/socratic.py`.

use async_trait::async_trait;

use crate::dispatcher::{try_llm_call, DispatchContext, Strategy};
use crate::dispatcher::templates::truncated;
use crate::domain::intervention::Intervention;
use crate::llm::LlmProvider;
use crate::types::{InterventionMode, PedagogicalIntent};

#[derive(Clone, Copy, Debug, Default)]
pub struct SocraticStrategy;

const SYSTEM_PROMPT: &str = "You are a Socratic tutor. Never write code that solves the \
student's task. Respond only with 2-4 guiding questions that help the student decompose the \
problem themselves. Do not answer the question directly.";

#[async_trait]
impl Strategy for SocraticStrategy {
    fn mode(&self) -> InterventionMode {
        InterventionMode::Socratic
    }

    fn pedagogical_intent(&self) -> PedagogicalIntent {
        PedagogicalIntent::PromoteDecompositionAndPlanning
    }

    async fn generate_with_llm(
        &self,
        ctx: &DispatchContext,
        provider: &dyn LlmProvider,
    ) -> Option<Intervention> {
        let user_prompt = format!(
            "The student asked: \"{}\"\nRespond with guiding questions only, no code.",
            truncated(&ctx.prompt, 500)
        );
        let content = try_llm_call(provider, SYSTEM_PROMPT, &user_prompt, ctx, 300).await?;
        let questions: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        Some(
            Intervention::new(
                self.mode(),
                ctx.classifier.suggested_strategy.help_level,
                self.pedagogical_intent(),
                content,
                ctx.classifier.cognitive_state,
                true,
            )
            .with_questions(questions),
        )
    }

    fn generate_template(&self, ctx: &DispatchContext) -> Intervention {
        let questions = vec![
            "What have you tried so far, and what happened when you ran it?".to_string(),
            "If you had to break this problem into smaller steps, what would the first step be?"
                .to_string(),
            "What part of the problem are you least sure how to approach?".to_string(),
        ];
        let message = format!(
            "Before I can help effectively, let's think this through together. {}",
            questions.join(" ")
        );
        Intervention::new(
            self.mode(),
            ctx.classifier.suggested_strategy.help_level,
            self.pedagogical_intent(),
            message,
            ctx.classifier.cognitive_state,
            false,
        )
        .with_questions(questions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::StudentProfile;
    use crate::domain::intervention::{ClassifierOutput, SuggestedStrategy};
    use crate::types::{CognitiveState, HelpLevel, RequestType};

    fn ctx() -> DispatchContext {
        DispatchContext {
            prompt: "give me the full code".to_string(),
            classifier: ClassifierOutput {
                cognitive_state: CognitiveState::Implementation,
                cognitive_intent: "delegation".to_string(),
                delegation_level: 0.9,
                is_total_delegation: true,
                request_type: RequestType::Implementation,
                suggested_strategy: SuggestedStrategy {
                    mode: InterventionMode::Socratic,
                    help_level: HelpLevel::Low,
                    pedagogical_intent: PedagogicalIntent::PromoteDecompositionAndPlanning,
                },
            },
            recent_traces: Vec::new(),
            student_profile: StudentProfile::default(),
            deadline: std::time::Duration::from_secs(5),
        }
    }

    #[test]
    fn template_never_provides_code() {
        let intervention = SocraticStrategy.generate_template(&ctx());
        assert!(!intervention.metadata.provides_code);
        assert!(intervention.questions.is_some());
    }
}
