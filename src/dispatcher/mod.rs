//! Agent dispatcher and Tutor (spec.md §4.4). Picks a strategy from the
//! classifier's `suggested_strategy.mode`, composes a prompt, calls the LLM
//! port, and falls back to a deterministic template on any LLM failure.
//!
//! Grounded in
//! `original_source/.../agents/tutor_modes/{base,socratic,explicative,guided,metacognitive}.py`
//! for the LLM-path/template-path duality: each strategy there tries
//! `generate_with_llm` first and falls back to `_generate_template_response`
//! on any exception, timeout, or empty body — carried over verbatim here as
//! the `Strategy` trait's two methods.

pub mod strategies;
pub mod templates;

use std::sync::Arc;

use crate::domain::intervention::{ClassifierOutput, Intervention};
use crate::domain::trace::Trace;
use crate::llm::{generate_with_retry, ChatMessage, GenerateOptions, LlmError, LlmProvider};
use crate::types::{HelpLevel, InterventionMode, PedagogicalIntent};

/// Everything a strategy needs to compose its response, besides the provider
/// itself. `recent_traces` is capped at N (default 20, spec.md §4.4).
#[derive(Clone, Debug)]
pub struct DispatchContext {
    pub prompt: String,
    pub classifier: ClassifierOutput,
    pub recent_traces: Vec<Trace>,
    pub student_profile: StudentProfile,
    pub deadline: std::time::Duration,
}

/// Computed per-session profile the dispatcher keeps handy for strategies
/// that scale their response to how much help the student has already had
/// (spec.md §4.4 "the student's computed profile").
#[derive(Clone, Debug, Default)]
pub struct StudentProfile {
    pub hints_received: u32,
    pub ai_involvement_average: f64,
    pub autonomous_solution_count: u32,
}

#[async_trait::async_trait]
pub trait Strategy: Send + Sync {
    fn mode(&self) -> InterventionMode;
    fn pedagogical_intent(&self) -> PedagogicalIntent;

    /// Try the LLM path; returns `None` on any condition spec.md §4.4 says
    /// should fall back to templates (unavailable, timeout, empty body,
    /// over token limits) rather than propagating the error to the caller.
    async fn generate_with_llm(
        &self,
        ctx: &DispatchContext,
        provider: &dyn LlmProvider,
    ) -> Option<Intervention>;

    fn generate_template(&self, ctx: &DispatchContext) -> Intervention;

    async fn generate(&self, ctx: &DispatchContext, provider: Option<&dyn LlmProvider>) -> Intervention {
        if let Some(provider) = provider {
            if let Some(intervention) = self.generate_with_llm(ctx, provider).await {
                return intervention;
            }
        }
        self.generate_template(ctx)
    }
}

/// Shared plumbing for `generate_with_llm` implementations: call the
/// provider with retry, and map every failure mode to `None` so the trait's
/// default `generate` falls through to the template path.
pub async fn try_llm_call(
    provider: &dyn LlmProvider,
    system_prompt: &str,
    user_prompt: &str,
    ctx: &DispatchContext,
    max_tokens: u32,
) -> Option<String> {
    let messages = [
        ChatMessage::system(system_prompt),
        ChatMessage::user(user_prompt),
    ];
    let options = GenerateOptions {
        temperature: 0.7,
        max_tokens,
        stop: Vec::new(),
        deadline: ctx.deadline,
    };
    match generate_with_retry(provider, &messages, &options).await {
        Ok(response) if !response.content.trim().is_empty() => Some(response.content),
        Ok(_) => None,
        Err(LlmError::Unavailable | LlmError::Timeout | LlmError::RateLimited | LlmError::InvalidResponse | LlmError::Cancelled) => {
            None
        }
    }
}

pub struct Dispatcher {
    socratic: strategies::socratic::SocraticStrategy,
    explicative: strategies::explicative::ExplicativeStrategy,
    guided: strategies::guided::GuidedStrategy,
    metacognitive: strategies::metacognitive::MetacognitiveStrategy,
    clarification: strategies::clarification::ClarificationStrategy,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self {
            socratic: strategies::socratic::SocraticStrategy,
            explicative: strategies::explicative::ExplicativeStrategy,
            guided: strategies::guided::GuidedStrategy,
            metacognitive: strategies::metacognitive::MetacognitiveStrategy,
            clarification: strategies::clarification::ClarificationStrategy,
        }
    }
}

impl Dispatcher {
    /// Selects a strategy by `suggested_strategy.mode`, with the
    /// Clarification override when the classifier couldn't make sense of
    /// the prompt at all (spec.md §4.4).
    fn select(&self, ctx: &DispatchContext) -> &dyn Strategy {
        use crate::types::CognitiveState;

        if ctx.classifier.cognitive_state == CognitiveState::Unknown {
            return &self.clarification;
        }

        match ctx.classifier.suggested_strategy.mode {
            InterventionMode::Socratic => &self.socratic,
            InterventionMode::Explicative => &self.explicative,
            InterventionMode::Guided => &self.guided,
            InterventionMode::Metacognitive => &self.metacognitive,
            InterventionMode::Clarification => &self.clarification,
        }
    }

    pub async fn dispatch(
        &self,
        ctx: &DispatchContext,
        provider: Option<Arc<dyn LlmProvider>>,
    ) -> Intervention {
        let strategy = self.select(ctx);
        strategy.generate(ctx, provider.as_deref()).await
    }
}

/// Fixed outbound `ai_involvement` mapping from help level (spec.md §9 Open
/// Questions resolution).
#[must_use]
pub fn ai_involvement_for(help_level: HelpLevel) -> f64 {
    help_level.ai_involvement()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::intervention::SuggestedStrategy;
    use crate::types::{CognitiveState, RequestType};

    fn ctx_with(mode: InterventionMode, cognitive_state: CognitiveState) -> DispatchContext {
        DispatchContext {
            prompt: "test prompt".to_string(),
            classifier: ClassifierOutput {
                cognitive_state,
                cognitive_intent: "test".to_string(),
                delegation_level: 0.1,
                is_total_delegation: false,
                request_type: RequestType::Conceptual,
                suggested_strategy: SuggestedStrategy {
                    mode,
                    help_level: HelpLevel::Medium,
                    pedagogical_intent: PedagogicalIntent::ConceptualUnderstanding,
                },
            },
            recent_traces: Vec::new(),
            student_profile: StudentProfile::default(),
            deadline: std::time::Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn falls_back_to_template_when_no_provider_given() {
        let dispatcher = Dispatcher::default();
        let ctx = ctx_with(InterventionMode::Explicative, CognitiveState::Exploration);
        let intervention = dispatcher.dispatch(&ctx, None).await;
        assert!(!intervention.metadata.generated_with_llm);
        assert!(!intervention.metadata.provides_code);
    }

    #[tokio::test]
    async fn unknown_cognitive_state_routes_to_clarification() {
        let dispatcher = Dispatcher::default();
        let ctx = ctx_with(InterventionMode::Guided, CognitiveState::Unknown);
        let intervention = dispatcher.dispatch(&ctx, None).await;
        assert_eq!(intervention.mode, InterventionMode::Clarification);
    }
}
