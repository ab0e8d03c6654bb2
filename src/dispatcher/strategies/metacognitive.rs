//! Metacognitive strategy: reflection on the student's own learning process
//! rather than the task content (spec.md §4.4). Grounded in
//! `original_source/.../agents/tutor_modes/metacognitive.py`'s per-state
//! template selection (frustrated/blocked/successful/generic) and its base
//! plus state-specific reflection questions.

use async_trait::async_trait;

use crate::dispatcher::templates::truncated;
use crate::dispatcher::{try_llm_call, DispatchContext, Strategy};
use crate::domain::intervention::Intervention;
use crate::llm::LlmProvider;
use crate::types::{CognitiveState, InterventionMode, PedagogicalIntent};

#[derive(Clone, Copy, Debug, Default)]
pub struct MetacognitiveStrategy;

const SYSTEM_PROMPT: &str = "You are a tutor guiding metacognitive reflection. Help the student \
think about their own thinking and learning process rather than the task's content. Ask them to \
name their current strategy, what they understand well, and what feels unclear. Do not solve the \
task or provide code.";

fn template_message(cognitive_state: CognitiveState) -> &'static str {
    match cognitive_state {
        CognitiveState::Frustrated => {
            "It's normal to feel frustrated when a problem won't budge — that's part of \
             learning. Before going further: what have you managed to get working so far, even \
             something small? Where exactly does it stop making sense? Sometimes simplifying the \
             problem, stepping away for a few minutes, or explaining it out loud step by step \
             brings back clarity. Tell me the specific point where you feel stuck."
        }
        CognitiveState::Stuck => {
            "Being stuck usually means your mind is still processing, it just hasn't found the \
             path yet. Is the block conceptual (you don't follow the idea) or technical (you \
             don't know how to implement it)? What was the last step you were confident about? \
             What did you expect to happen that didn't? Try identifying the smallest sub-problem \
             you could solve on its own, or work backward from the result you expect."
        }
        CognitiveState::Validation => {
            "Nicely done, you made real progress. Now is a good moment to consolidate it. What \
             was the key insight that unlocked the solution? What steps did you take that you \
             could reuse on a similar problem? What would you do differently if you faced this \
             again? Try explaining, in your own words, the core concept you just learned."
        }
        _ => {
            "Before we continue, let's pause and reflect on how you're approaching this problem. \
             What's your current strategy, and why did you choose it? Which parts do you feel \
             you understand well, and which generate the most doubt? What prior knowledge are \
             you drawing on, and what do you think you still need to learn? Based on this, which \
             aspect would you like to work on first?"
        }
    }
}

fn reflection_questions(cognitive_state: CognitiveState) -> Vec<String> {
    let mut questions = vec![
        "What are you thinking about the problem right now?".to_string(),
        "What strategy are you using, and why did you choose it?".to_string(),
        "If you could start over, what would you do differently?".to_string(),
    ];
    let extra: &[&str] = match cognitive_state {
        CognitiveState::Frustrated => &[
            "What specifically is generating the frustration?",
            "What would help you feel less stuck?",
        ],
        CognitiveState::Stuck => &[
            "What was the last point where you felt confident?",
            "What information do you feel is missing to move forward?",
        ],
        CognitiveState::Validation => &[
            "What allowed you to solve the problem?",
            "How could you apply this in other contexts?",
        ],
        CognitiveState::Exploration => &[
            "Which aspects of the problem do you find most interesting?",
            "What hypotheses are you considering?",
        ],
        CognitiveState::Debugging => &[
            "What methodology are you using to find the error?",
            "What hypotheses have you ruled out, and why?",
        ],
        _ => &[],
    };
    questions.extend(extra.iter().map(|s| s.to_string()));
    questions
}

#[async_trait]
impl Strategy for MetacognitiveStrategy {
    fn mode(&self) -> InterventionMode {
        InterventionMode::Metacognitive
    }

    fn pedagogical_intent(&self) -> PedagogicalIntent {
        PedagogicalIntent::PromoteSelfReflection
    }

    async fn generate_with_llm(
        &self,
        ctx: &DispatchContext,
        provider: &dyn LlmProvider,
    ) -> Option<Intervention> {
        let user_prompt = format!(
            "The student's cognitive state is \"{:?}\". Their prompt: \"{}\"\nGuide a brief \
             metacognitive reflection, no code.",
            ctx.classifier.cognitive_state,
            truncated(&ctx.prompt, 500)
        );
        let content = try_llm_call(provider, SYSTEM_PROMPT, &user_prompt, ctx, 400).await?;
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
        let message = template_message(ctx.classifier.cognitive_state).to_string();
        let questions = reflection_questions(ctx.classifier.cognitive_state);
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
    use crate::types::{HelpLevel, RequestType};

    fn ctx(cognitive_state: CognitiveState) -> DispatchContext {
        DispatchContext {
            prompt: "I don't know why this keeps failing".to_string(),
            classifier: ClassifierOutput {
                cognitive_state,
                cognitive_intent: "reflection".to_string(),
                delegation_level: 0.1,
                is_total_delegation: false,
                request_type: RequestType::Conceptual,
                suggested_strategy: SuggestedStrategy {
                    mode: InterventionMode::Metacognitive,
                    help_level: HelpLevel::Medium,
                    pedagogical_intent: PedagogicalIntent::PromoteSelfReflection,
                },
            },
            recent_traces: Vec::new(),
            student_profile: StudentProfile::default(),
            deadline: std::time::Duration::from_secs(5),
        }
    }

    #[test]
    fn frustrated_state_gets_frustration_questions() {
        let intervention =
            MetacognitiveStrategy.generate_template(&ctx(CognitiveState::Frustrated));
        let questions = intervention.questions.unwrap();
        assert!(questions.iter().any(|q| q.contains("frustration")));
        assert!(!intervention.metadata.provides_code);
    }

    #[test]
    fn resolved_state_gets_consolidation_message() {
        let intervention = MetacognitiveStrategy.generate_template(&ctx(CognitiveState::Validation));
        assert!(intervention.message.contains("progress"));
    }
}
