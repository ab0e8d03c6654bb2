//! End-to-end check that PII never reaches the LLM provider in its raw form
//! (spec.md §4.3, §8 "PII is sanitized before it reaches the LLM or is
//! persisted in traces"). The governance filter rewrites matches in place;
//! this exercises the whole pipeline down to the exact message the
//! dispatcher hands the provider, not just `governance::pii::sanitize` in
//! isolation.

use std::sync::Arc;
use std::time::Duration;

use tutor_gateway::classifier::CrpeClassifier;
use tutor_gateway::dispatcher::Dispatcher;
use tutor_gateway::event_bus::EventBus;
use tutor_gateway::gateway::{Gateway, GatewayDeps};
use tutor_gateway::governance::DefaultGovernanceFilter;
use tutor_gateway::llm::providers::mock::MockProvider;
use tutor_gateway::llm::LlmProvider;
use tutor_gateway::repo::memory::{
    InMemoryPolicyRepo, InMemoryRiskRepo, InMemorySessionRepo, InMemoryTraceRepo,
};
use tutor_gateway::risk::RiskRuleRegistry;
use tutor_gateway::types::SessionMode;

fn gateway_with(provider: Arc<MockProvider>) -> Gateway {
    Gateway::new(GatewayDeps {
        session_repo: Arc::new(InMemorySessionRepo::default()),
        trace_repo: Arc::new(InMemoryTraceRepo::default()),
        risk_repo: Arc::new(InMemoryRiskRepo::default()),
        policy_repo: Arc::new(InMemoryPolicyRepo::default()),
        classifier: Arc::new(CrpeClassifier),
        governance: Arc::new(DefaultGovernanceFilter),
        dispatcher: Dispatcher::default(),
        risk_rules: RiskRuleRegistry::with_default_rules(),
        llm_provider: Some(provider as Arc<dyn LlmProvider>),
        cache: None,
        cache_salt: None,
        events: Arc::new(EventBus::default()),
        recent_history_window: 20,
        risk_window: 30,
        default_deadline: Duration::from_secs(30),
    })
}

#[tokio::test]
async fn email_dni_and_card_are_redacted_before_reaching_the_provider() {
    let provider = Arc::new(MockProvider::succeeding("here's an explanation"));
    let gateway = gateway_with(provider.clone());

    let session = gateway
        .create_session("stu-1", "act-1", SessionMode::Tutor, None)
        .await
        .unwrap();

    let prompt = "Reach me at juan@example.com or DNI 12345678 or card 4111 1111 1111 1111, \
         but first: what is a circular queue and how does it differ from a simple queue?";

    let result = gateway
        .process_interaction(session.id, prompt, None, None)
        .await
        .unwrap();

    assert!(!result.blocked, "a conceptual question must not be blocked");

    let captured = provider.captured_messages();
    assert_eq!(captured.len(), 1, "the LLM must be called exactly once");

    let combined: String = captured[0]
        .iter()
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    assert!(combined.contains("[EMAIL_REDACTED]"), "{combined}");
    assert!(combined.contains("[DNI_REDACTED]"), "{combined}");
    assert!(combined.contains("[CARD_REDACTED]"), "{combined}");
    assert!(!combined.contains("juan@example.com"));
    assert!(!combined.contains("12345678"));
    assert!(!combined.contains("4111 1111 1111 1111"));

    // The persisted inbound trace carries the raw prompt (spec.md §4.1 step
    // 3 builds the inbound trace before governance runs) but the outbound
    // trace's content is the tutor's reply, never the student's PII.
    let traces = gateway.list_traces(session.id).await.unwrap();
    assert_eq!(traces.len(), 2);
    assert!(!traces[1].content.contains("juan@example.com"));
}
