//! Gateway orchestrator (spec.md §4.1): the sole transaction boundary for
//! `process_interaction`. Composes the classifier, governance filter,
//! dispatcher, risk analyzer, and repositories behind trait objects,
//! separating runtime environment from the composed strategies the same
//! way a fixed execution engine stays decoupled from the pluggable
//! topology it runs — here `Gateway` is the runtime environment and the
//! strategies are the topology.
//!
//! Persistence for a single `process_interaction` call happens once, at the
//! very end of [`Gateway::process_interaction`], after classification,
//! governance, dispatch, and risk analysis have all produced their outputs
//! in memory. That is what makes spec.md §8 invariant 7 ("deadline elapsed
//! mid-pipeline → no trace persisted") hold for free: the whole call is
//! wrapped in one `tokio::time::timeout`, and nothing touches a repository
//! until the wrapped future is about to return `Ok`.

pub mod locks;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::classifier::{Classifier, ClassifierContext};
use crate::dispatcher::{DispatchContext, Dispatcher, StudentProfile};
use crate::domain::trace::{Trace, TraceDraft, TraceSequence};
use crate::domain::{RiskId, SessionId, TraceId};
use crate::domain::{Risk, Session};
use crate::error::GatewayError;
use crate::event_bus::EventBus;
use crate::governance::{FilterOutcome, GovernanceFilter};
use crate::llm::cached_provider::CachedProvider;
use crate::llm::cache::SemanticCache;
use crate::llm::LlmProvider;
use crate::repo::{PolicyRepo, RiskRepo, SessionRepo, TraceRepo};
use crate::risk::RiskRuleRegistry;
use crate::types::{CognitiveState, InteractionType, SessionMode, TraceLevel};

use locks::SessionLocks;

/// Everything the gateway needs to compose the pipeline. Constructed once
/// at startup and shared behind an `Arc` across the whole process (spec.md
/// §9 "Global singletons ↦ explicit composition": an explicit service
/// handle, not a process-wide singleton).
pub struct GatewayDeps {
    pub session_repo: Arc<dyn SessionRepo>,
    pub trace_repo: Arc<dyn TraceRepo>,
    pub risk_repo: Arc<dyn RiskRepo>,
    pub policy_repo: Arc<dyn PolicyRepo>,
    pub classifier: Arc<dyn Classifier>,
    pub governance: Arc<dyn GovernanceFilter>,
    pub dispatcher: Dispatcher,
    pub risk_rules: RiskRuleRegistry,
    pub llm_provider: Option<Arc<dyn LlmProvider>>,
    pub cache: Option<Arc<SemanticCache>>,
    pub cache_salt: Option<String>,
    pub events: Arc<EventBus>,
    pub recent_history_window: usize,
    pub risk_window: usize,
    pub default_deadline: Duration,
}

/// Output of [`Gateway::process_interaction`] (spec.md §4.1 step 9).
#[derive(Clone, Debug, serde::Serialize)]
pub struct InteractionResult {
    pub interaction_id: TraceId,
    pub message: String,
    pub agent_used: &'static str,
    pub cognitive_state_detected: CognitiveState,
    pub ai_involvement: f64,
    pub blocked: bool,
    pub block_reason: Option<String>,
    pub trace_id: TraceId,
    pub risks_detected: Vec<RiskId>,
    pub tokens_used: Option<u32>,
}

pub struct Gateway {
    session_repo: Arc<dyn SessionRepo>,
    trace_repo: Arc<dyn TraceRepo>,
    risk_repo: Arc<dyn RiskRepo>,
    policy_repo: Arc<dyn PolicyRepo>,
    classifier: Arc<dyn Classifier>,
    governance: Arc<dyn GovernanceFilter>,
    dispatcher: Dispatcher,
    risk_rules: RiskRuleRegistry,
    llm_provider: Option<Arc<dyn LlmProvider>>,
    cache: Option<Arc<SemanticCache>>,
    cache_salt: Option<String>,
    events: Arc<EventBus>,
    locks: SessionLocks,
    recent_history_window: usize,
    risk_window: usize,
    default_deadline: Duration,
}

impl Gateway {
    #[must_use]
    pub fn new(deps: GatewayDeps) -> Self {
        Self {
            session_repo: deps.session_repo,
            trace_repo: deps.trace_repo,
            risk_repo: deps.risk_repo,
            policy_repo: deps.policy_repo,
            classifier: deps.classifier,
            governance: deps.governance,
            dispatcher: deps.dispatcher,
            risk_rules: deps.risk_rules,
            llm_provider: deps.llm_provider,
            cache: deps.cache,
            cache_salt: deps.cache_salt,
            events: deps.events,
            locks: SessionLocks::default(),
            recent_history_window: deps.recent_history_window,
            risk_window: deps.risk_window,
            default_deadline: deps.default_deadline,
        }
    }

    /// Creates a session with the activity's default policy snapshot
    /// attached (spec.md §3 "Policies are immutable snapshots attached to
    /// a session at creation").
    pub async fn create_session(
        &self,
        student_id: impl Into<String>,
        activity_id: impl Into<String>,
        mode: SessionMode,
        simulator_type: Option<String>,
    ) -> Result<Session, GatewayError> {
        let activity_id = activity_id.into();
        let policy = self.policy_repo.get_or_create_default(&activity_id).await?;
        let session = Session::new(student_id, activity_id, mode, simulator_type, policy.id);
        self.session_repo.insert(session.clone()).await?;
        self.emit(format!("session {} created", session.id));
        Ok(session)
    }

    pub async fn get_session(&self, id: SessionId) -> Result<Session, GatewayError> {
        self.session_repo.get(id).await
    }

    pub async fn list_traces(&self, id: SessionId) -> Result<Vec<Trace>, GatewayError> {
        self.session_repo.get(id).await?;
        self.trace_repo.list_by_session(id).await
    }

    pub async fn list_risks(&self, id: SessionId) -> Result<Vec<Risk>, GatewayError> {
        self.session_repo.get(id).await?;
        self.risk_repo.list_by_session(id).await
    }

    /// Terminal transition (spec.md §6 `POST /sessions/{id}/complete`).
    pub async fn complete_session(&self, id: SessionId) -> Result<Session, GatewayError> {
        let mut session = self.session_repo.get(id).await?;
        if !session.is_active() {
            return Err(GatewayError::Conflict(format!(
                "session {id} is not active"
            )));
        }
        session.complete();
        self.session_repo.update(session.clone()).await?;
        Ok(session)
    }

    fn emit(&self, message: impl Into<String>) {
        let _ = self
            .events
            .get_emitter()
            .emit(crate::event_bus::Event::stage_message("gateway", message));
    }

    /// The core entry point (spec.md §4.1). `deadline` defaults to 30s.
    pub async fn process_interaction(
        &self,
        session_id: SessionId,
        prompt: &str,
        context: Option<Value>,
        deadline: Option<Duration>,
    ) -> Result<InteractionResult, GatewayError> {
        let deadline = deadline.unwrap_or(self.default_deadline);
        let prompt = prompt.to_string();

        let fut = async {
            let guard = self.locks.acquire(session_id).await;
            let _guard = guard.lock_owned().await;
            self.process_locked(session_id, &prompt, context, deadline)
                .await
        };

        match tokio::time::timeout(deadline, fut).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(format!(
                "interaction pipeline exceeded {deadline:?}"
            ))),
        }
    }

    async fn process_locked(
        &self,
        session_id: SessionId,
        prompt: &str,
        context: Option<Value>,
        deadline: Duration,
    ) -> Result<InteractionResult, GatewayError> {
        // 1. Load session.
        let mut session = self.session_repo.get(session_id).await?;
        if !session.is_active() {
            return Err(GatewayError::SessionNotFound(session_id.to_string()));
        }
        let policy = self.policy_repo.get(session.policy_snapshot_id).await?;

        let persisted = self.trace_repo.list_by_session(session_id).await?;
        let recent_history: Vec<Trace> = persisted
            .iter()
            .rev()
            .take(self.recent_history_window)
            .rev()
            .cloned()
            .collect();
        let previous_hints_count = persisted
            .iter()
            .filter(|t| {
                t.interaction_type == InteractionType::AiResponse
                    && t.metadata.get("mode").and_then(|v| v.as_str()) == Some("guided")
            })
            .count() as u32;

        // 2. Classify.
        let classifier_ctx = ClassifierContext {
            recent_history: recent_history.clone(),
            previous_hints_count,
        };
        let classifier_output = self.classifier.classify(prompt, &classifier_ctx, &policy);

        // 3. Build the inbound trace (persisted at the end of the call, not here).
        let inbound_seq = self.trace_repo.next_sequence_number(session_id).await?;
        let inbound_trace = build_trace(
            TraceId::new(),
            session_id,
            inbound_seq,
            TraceLevel::Cognitive,
            InteractionType::StudentPrompt,
            prompt.to_string(),
            context.clone().unwrap_or(Value::Null),
            classifier_output.cognitive_state,
            classifier_output.delegation_level,
            Default::default(),
        );

        let mut sequence_for_governance = persisted.clone();
        sequence_for_governance.push(inbound_trace.clone());
        let sequence_for_governance = TraceSequence::rebuild(sequence_for_governance);

        // 4. Governance. `sequence_for_governance` already includes the
        // just-built inbound trace (spec.md §4.1 steps 3→4), so its length
        // is always >=1 here; the traceability check below only trips as
        // the dead safety net it's meant to be, not on every session's
        // first interaction.
        let (outcome, compliance_log) = self.governance.evaluate(
            &session_id.to_string(),
            prompt,
            &policy,
            &classifier_output,
            &sequence_for_governance,
            sequence_for_governance.len(),
        );

        // Surfaces the governance audit log onto the trace that the risk
        // analyzer's `PolicyViolationRateRule` actually scans (spec.md
        // §4.7 governance dimension): a `Violation`-status compliance event
        // tags its outbound trace with `policy_violation: true`. `Block`
        // outcomes always carry one (the check that produced the block);
        // `Pass`/`Warn` outcomes never do, since `evaluate` returns early on
        // any violation, but the flag is still derived from the log rather
        // than hardcoded so a future check added to the filter is covered
        // for free.
        let policy_violation = compliance_log
            .iter()
            .any(|event| event.status == crate::governance::ComplianceStatus::Violation);

        let (sanitized_text, pii_detected, adjustments) = match outcome {
            FilterOutcome::Block { message, reason, risk } => {
                let outbound_seq = inbound_seq + 1;
                let outbound_ai_involvement = classifier_output.delegation_level;
                let mut outbound_metadata = rustc_hash::FxHashMap::default();
                outbound_metadata.insert("generated_with_llm".to_string(), Value::Bool(false));
                outbound_metadata.insert("blocked".to_string(), Value::Bool(true));
                outbound_metadata
                    .insert("block_reason".to_string(), Value::String(reason.to_string()));
                outbound_metadata
                    .insert("policy_violation".to_string(), Value::Bool(policy_violation));

                let outbound_trace = build_trace(
                    TraceId::new(),
                    session_id,
                    outbound_seq,
                    TraceLevel::Cognitive,
                    InteractionType::AiResponse,
                    message.clone(),
                    Value::Null,
                    classifier_output.cognitive_state,
                    outbound_ai_involvement,
                    outbound_metadata,
                );

                self.trace_repo.append(inbound_trace.clone()).await?;
                self.trace_repo.append(outbound_trace.clone()).await?;

                let known_fingerprints =
                    self.risk_repo.fingerprints_for_session(session_id).await?;
                let mut risks_detected = Vec::new();
                if !known_fingerprints.contains(&risk.fingerprint) {
                    self.risk_repo.insert((*risk).clone()).await?;
                    risks_detected.push(risk.id);
                }

                session.record_trace(classifier_output.cognitive_state, 1.0 - outbound_ai_involvement);
                session.record_trace(classifier_output.cognitive_state, 1.0 - outbound_ai_involvement);
                for _ in &risks_detected {
                    session.record_risk();
                }
                self.session_repo.update(session).await?;

                self.emit(format!("session {session_id} interaction blocked: {reason}"));

                return Ok(InteractionResult {
                    interaction_id: outbound_trace.id,
                    message,
                    agent_used: "Governance",
                    cognitive_state_detected: classifier_output.cognitive_state,
                    ai_involvement: outbound_ai_involvement,
                    blocked: true,
                    block_reason: Some(reason.to_string()),
                    trace_id: inbound_trace.id,
                    risks_detected,
                    tokens_used: None,
                });
            }
            FilterOutcome::Pass { sanitized_text, pii_detected } => (sanitized_text, pii_detected, Vec::new()),
            FilterOutcome::Warn { sanitized_text, pii_detected, adjustments } => {
                (sanitized_text, pii_detected, adjustments)
            }
        };

        // 5. Dispatch.
        let student_profile = StudentProfile {
            hints_received: previous_hints_count,
            ai_involvement_average: sequence_for_governance.ai_dependency_score,
            autonomous_solution_count: recent_history
                .iter()
                .filter(|t| t.interaction_type == InteractionType::SelfCorrection)
                .count() as u32,
        };

        // The LLM call gets a fraction of the overall deadline, leaving
        // headroom for classification/governance already spent plus the
        // trace-building and persistence work still ahead of us — otherwise
        // a provider that hangs until the wrapper timeout fires would eat
        // the whole budget and the outer `tokio::time::timeout` around the
        // pipeline would cancel us before the template fallback could even
        // run (spec.md §5).
        let llm_deadline = (deadline / 4).max(Duration::from_millis(50));
        let dispatch_ctx = DispatchContext {
            prompt: sanitized_text,
            classifier: classifier_output.clone(),
            recent_traces: recent_history,
            student_profile,
            deadline: llm_deadline,
        };

        let provider = self.effective_provider(session_id, session.mode);
        let intervention = self
            .dispatcher
            .dispatch(&dispatch_ctx, provider.clone())
            .await;

        // 6. Persist outbound trace.
        let outbound_ai_involvement = intervention
            .help_level
            .ai_involvement()
            .max(classifier_output.delegation_level);
        let tokens_used = if intervention.metadata.generated_with_llm {
            provider.as_ref().and_then(|p| p.count_tokens(&intervention.message))
        } else {
            None
        };

        let mut outbound_metadata = rustc_hash::FxHashMap::default();
        outbound_metadata.insert(
            "generated_with_llm".to_string(),
            Value::Bool(intervention.metadata.generated_with_llm),
        );
        outbound_metadata.insert("mode".to_string(), Value::String(intervention.mode.encode().to_string()));
        outbound_metadata.insert("pii_detected".to_string(), Value::Bool(pii_detected));
        outbound_metadata.insert("policy_violation".to_string(), Value::Bool(policy_violation));
        if !adjustments.is_empty() {
            outbound_metadata.insert(
                "policy_adjustments".to_string(),
                Value::Array(adjustments.into_iter().map(Value::String).collect()),
            );
        }

        let outbound_seq = inbound_seq + 1;
        let outbound_trace = build_trace(
            TraceId::new(),
            session_id,
            outbound_seq,
            TraceLevel::Cognitive,
            InteractionType::AiResponse,
            intervention.message.clone(),
            Value::Null,
            classifier_output.cognitive_state,
            outbound_ai_involvement,
            outbound_metadata,
        );

        self.trace_repo.append(inbound_trace.clone()).await?;
        self.trace_repo.append(outbound_trace.clone()).await?;

        // 7. Risk analysis over the freshly extended sequence.
        let mut full_traces = persisted;
        full_traces.push(inbound_trace.clone());
        full_traces.push(outbound_trace.clone());
        let full_sequence = TraceSequence::rebuild(full_traces);

        let known_fingerprints = self.risk_repo.fingerprints_for_session(session_id).await?;
        let new_risks = self.risk_rules.analyze(
            session_id,
            &full_sequence,
            &policy,
            &known_fingerprints,
            self.risk_window,
        );
        for risk in &new_risks {
            self.risk_repo.insert(risk.clone()).await?;
        }

        // 8. Update session counters and cognitive status.
        session.record_trace(classifier_output.cognitive_state, 1.0 - full_sequence.ai_dependency_score);
        session.record_trace(classifier_output.cognitive_state, 1.0 - full_sequence.ai_dependency_score);
        for _ in &new_risks {
            session.record_risk();
        }
        self.session_repo.update(session).await?;

        self.emit(format!(
            "session {session_id} interaction handled by {}",
            intervention.mode.encode()
        ));

        Ok(InteractionResult {
            interaction_id: outbound_trace.id,
            message: intervention.message,
            agent_used: "Tutor",
            cognitive_state_detected: classifier_output.cognitive_state,
            ai_involvement: outbound_ai_involvement,
            blocked: false,
            block_reason: None,
            trace_id: inbound_trace.id,
            risks_detected: new_risks.iter().map(|r| r.id).collect(),
            tokens_used,
        })
    }

    /// Wraps the configured provider with the semantic cache when both a
    /// provider and a cache are configured (spec.md §4.5). Returns `None`
    /// when no LLM provider is configured at all, which routes every
    /// strategy straight to its template path.
    fn effective_provider(
        &self,
        session_id: SessionId,
        mode: SessionMode,
    ) -> Option<Arc<dyn LlmProvider>> {
        let provider = self.llm_provider.clone()?;
        match (&self.cache, &self.cache_salt) {
            (Some(cache), Some(salt)) => Some(Arc::new(CachedProvider::new(
                provider,
                cache.clone(),
                salt.clone(),
                session_id,
                mode,
            )) as Arc<dyn LlmProvider>),
            _ => Some(provider),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn build_trace(
    id: TraceId,
    session_id: SessionId,
    sequence_number: u64,
    trace_level: TraceLevel,
    interaction_type: InteractionType,
    content: String,
    context: Value,
    cognitive_state: CognitiveState,
    ai_involvement: f64,
    metadata: rustc_hash::FxHashMap<String, Value>,
) -> Trace {
    let draft = TraceDraft {
        trace_level,
        interaction_type,
        content: content.clone(),
        context: context.clone(),
        cognitive_state,
        ai_involvement,
        decision_justification: None,
        alternatives_considered: Vec::new(),
        semantic: None,
        algorithmic: None,
        cognitive_reasoning: None,
        interactional: None,
        ethical_risk: None,
        process: None,
        metadata: metadata.clone(),
    };
    debug_assert!(draft.validate().is_ok(), "ai_involvement must be in [0,1]");

    Trace {
        id,
        session_id,
        sequence_number,
        trace_level,
        interaction_type,
        content,
        context,
        cognitive_state,
        ai_involvement: ai_involvement.clamp(0.0, 1.0),
        decision_justification: None,
        alternatives_considered: Vec::new(),
        created_at: chrono::Utc::now(),
        semantic: None,
        algorithmic: None,
        cognitive_reasoning: None,
        interactional: None,
        ethical_risk: None,
        process: None,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::CrpeClassifier;
    use crate::dispatcher::Dispatcher;
    use crate::governance::DefaultGovernanceFilter;
    use crate::llm::providers::mock::MockProvider;
    use crate::repo::memory::{InMemoryPolicyRepo, InMemoryRiskRepo, InMemorySessionRepo, InMemoryTraceRepo};
    use crate::risk::RiskRuleRegistry;

    fn test_gateway(provider: Option<Arc<dyn LlmProvider>>) -> Gateway {
        Gateway::new(GatewayDeps {
            session_repo: Arc::new(InMemorySessionRepo::default()),
            trace_repo: Arc::new(InMemoryTraceRepo::default()),
            risk_repo: Arc::new(InMemoryRiskRepo::default()),
            policy_repo: Arc::new(InMemoryPolicyRepo::default()),
            classifier: Arc::new(CrpeClassifier),
            governance: Arc::new(DefaultGovernanceFilter),
            dispatcher: Dispatcher::default(),
            risk_rules: RiskRuleRegistry::with_default_rules(),
            llm_provider: provider,
            cache: None,
            cache_salt: None,
            events: Arc::new(EventBus::default()),
            recent_history_window: 20,
            risk_window: 30,
            default_deadline: Duration::from_secs(30),
        })
    }

    #[tokio::test]
    async fn happy_conceptual_path_produces_two_traces_and_no_critical_risk() {
        let gateway = test_gateway(None);
        let session = gateway
            .create_session("stu-1", "act-1", SessionMode::Tutor, None)
            .await
            .unwrap();

        // A single fresh prompt on a brand-new session (spec.md §8 literal
        // "Happy conceptual path" scenario): the traceability check passes
        // on the just-built inbound trace itself, so no warm-up interaction
        // is needed.
        let result = gateway
            .process_interaction(
                session.id,
                "¿Qué es una cola circular y en qué se diferencia de una cola simple?",
                None,
                None,
            )
            .await
            .unwrap();

        assert!(!result.blocked);
        assert_eq!(result.agent_used, "Tutor");
        assert!(matches!(
            result.cognitive_state_detected,
            CognitiveState::Exploration | CognitiveState::Planning
        ));
        assert!(result.ai_involvement < 0.5);

        let traces = gateway.list_traces(session.id).await.unwrap();
        assert_eq!(traces.len(), 2);
        assert_eq!(traces[0].interaction_type, InteractionType::StudentPrompt);
        assert_eq!(traces[1].interaction_type, InteractionType::AiResponse);

        let risks = gateway.list_risks(session.id).await.unwrap();
        assert!(risks.iter().all(|r| r.risk_level != crate::types::RiskLevel::Critical));
    }

    #[tokio::test]
    async fn delegation_request_is_blocked_without_calling_the_llm() {
        let provider = Arc::new(MockProvider::succeeding("should never be used"));
        let gateway = test_gateway(Some(provider.clone()));
        let session = gateway
            .create_session("stu-1", "act-1", SessionMode::Tutor, None)
            .await
            .unwrap();

        let result = gateway
            .process_interaction(
                session.id,
                "Dame el código completo de una cola circular con arreglos",
                None,
                None,
            )
            .await
            .unwrap();

        assert!(result.blocked);
        assert_eq!(provider.call_count(), 0, "no LLM call issued on a block path");
        assert_eq!(result.risks_detected.len(), 1);

        let traces = gateway.list_traces(session.id).await.unwrap();
        assert_eq!(traces.len(), 2);
        assert_eq!(
            traces[1].metadata.get("policy_violation"),
            Some(&Value::Bool(true)),
            "a blocked interaction's outbound trace must be tagged for PolicyViolationRateRule"
        );
    }

    #[tokio::test]
    async fn repeated_blocks_trip_the_policy_violation_rate_risk() {
        // The risk analyzer only runs on the non-blocked path (spec.md
        // §4.1 step 7), so a run of blocks only shows up once a later
        // interaction's risk pass scans the trace window they left behind.
        // Two distinct delegation prompts avoid the first block's risk
        // fingerprint silently deduping the second.
        let gateway = test_gateway(None);
        let session = gateway
            .create_session("stu-1", "act-1", SessionMode::Tutor, None)
            .await
            .unwrap();

        gateway
            .process_interaction(
                session.id,
                "Dame el código completo de una cola circular con arreglos",
                None,
                None,
            )
            .await
            .unwrap();
        gateway
            .process_interaction(
                session.id,
                "Dame el código completo de una pila con arreglos",
                None,
                None,
            )
            .await
            .unwrap();

        let result = gateway
            .process_interaction(
                session.id,
                "¿Qué es una cola circular y en qué se diferencia de una cola simple?",
                None,
                None,
            )
            .await
            .unwrap();
        assert!(!result.blocked);

        let risks = gateway.list_risks(session.id).await.unwrap();
        assert!(
            risks
                .iter()
                .any(|r| r.risk_type == crate::types::RiskType::PolicyViolationRate
                    && r.dimension == crate::types::RiskDimension::Governance),
            "a sustained run of policy-violating interactions must surface a governance-dimension risk"
        );
    }

    #[tokio::test]
    async fn llm_timeout_falls_back_to_template_and_persists_traces() {
        let provider = Arc::new(MockProvider::sleeping_forever());
        let gateway = test_gateway(Some(provider));
        let session = gateway
            .create_session("stu-1", "act-1", SessionMode::Tutor, None)
            .await
            .unwrap();

        let result = gateway
            .process_interaction(
                session.id,
                "¿Cómo debería estructurar mi solución a este problema?",
                None,
                Some(Duration::from_millis(200)),
            )
            .await
            .unwrap();

        assert!(!result.blocked);
        let traces = gateway.list_traces(session.id).await.unwrap();
        assert_eq!(traces.len(), 2);
    }

    #[tokio::test]
    async fn unknown_session_is_rejected() {
        let gateway = test_gateway(None);
        let err = gateway
            .process_interaction(SessionId::new(), "hello there, a question", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn concurrent_same_session_calls_assign_non_interleaved_sequence_numbers() {
        let gateway = Arc::new(test_gateway(None));
        let session = gateway
            .create_session("stu-1", "act-1", SessionMode::Tutor, None)
            .await
            .unwrap();

        let g1 = gateway.clone();
        let g2 = gateway.clone();
        let id = session.id;
        let h1 = tokio::spawn(async move {
            g1.process_interaction(id, "¿Qué es una pila y cómo funciona?", None, None)
                .await
        });
        let h2 = tokio::spawn(async move {
            g2.process_interaction(id, "¿Qué es una cola y cómo funciona?", None, None)
                .await
        });
        h1.await.unwrap().unwrap();
        h2.await.unwrap().unwrap();

        let traces = gateway.list_traces(session.id).await.unwrap();
        assert_eq!(traces.len(), 4);
        let sequences: Vec<u64> = traces.iter().map(|t| t.sequence_number).collect();
        let mut sorted = sequences.clone();
        sorted.sort_unstable();
        assert_eq!(sequences, sorted, "sequence numbers must be in commit order");
        assert_eq!(sorted, vec![1, 2, 3, 4]);

        let first_pair_same_type = traces[0].interaction_type == traces[1].interaction_type;
        assert!(
            !first_pair_same_type,
            "the two student_prompt traces must not be adjacent"
        );
    }
}
