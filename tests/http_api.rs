//! End-to-end exercise of the primary HTTP API (spec.md §6) against the
//! real axum `Router` built by [`tutor_gateway::http::build_router`], driven
//! with `tower::ServiceExt::oneshot` rather than a bound TCP listener —
//! same style as the teacher's `tests/app.rs` hitting `App`/`AppRunner`
//! without a real process boundary.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;

use tutor_gateway::classifier::CrpeClassifier;
use tutor_gateway::config::GatewayConfig;
use tutor_gateway::dispatcher::Dispatcher;
use tutor_gateway::event_bus::EventBus;
use tutor_gateway::gateway::{Gateway, GatewayDeps};
use tutor_gateway::governance::DefaultGovernanceFilter;
use tutor_gateway::http::auth::Claims;
use tutor_gateway::http::build_router;
use tutor_gateway::llm::providers::mock::MockProvider;
use tutor_gateway::llm::LlmProvider;
use tutor_gateway::repo::memory::{
    InMemoryPolicyRepo, InMemoryRiskRepo, InMemorySessionRepo, InMemoryTraceRepo,
};
use tutor_gateway::risk::RiskRuleRegistry;

const JWT_SECRET: &str = "test-secret-at-least-32-bytes-long!!";

fn test_config() -> GatewayConfig {
    GatewayConfig {
        environment: tutor_gateway::config::Environment::Development,
        debug: true,
        llm_provider: "mock".to_string(),
        llm_cache_enabled: false,
        llm_cache_ttl: Duration::from_secs(60),
        llm_cache_max_entries: 100,
        cache_salt: None,
        database_url: None,
        rate_limit_per_minute: 1000,
        rate_limit_per_hour: 100_000,
        jwt_secret_key: Some(JWT_SECRET.to_string()),
        jwt_access_token_expire_minutes: 30,
        jwt_refresh_token_expire_days: 7,
        allowed_origins: Vec::new(),
    }
}

fn test_router() -> axum::Router {
    let provider: Arc<dyn LlmProvider> = Arc::new(MockProvider::succeeding("a guiding question"));
    let gateway = Arc::new(Gateway::new(GatewayDeps {
        session_repo: Arc::new(InMemorySessionRepo::default()),
        trace_repo: Arc::new(InMemoryTraceRepo::default()),
        risk_repo: Arc::new(InMemoryRiskRepo::default()),
        policy_repo: Arc::new(InMemoryPolicyRepo::default()),
        classifier: Arc::new(CrpeClassifier),
        governance: Arc::new(DefaultGovernanceFilter),
        dispatcher: Dispatcher::default(),
        risk_rules: RiskRuleRegistry::with_default_rules(),
        llm_provider: Some(provider),
        cache: None,
        cache_salt: None,
        events: Arc::new(EventBus::default()),
        recent_history_window: 20,
        risk_window: 30,
        default_deadline: Duration::from_secs(30),
    }));
    build_router(gateway, &test_config())
}

fn bearer_token() -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: "student-42".to_string(),
        iat: now,
        exp: now + 3600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn requests_without_a_bearer_token_are_rejected() {
    let router = test_router();
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/sessions")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "student_id": "stu-1",
                        "activity_id": "act-1",
                        "mode": "tutor",
                        "simulator_type": null,
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn full_session_lifecycle_over_http() {
    let router = test_router();
    let token = bearer_token();

    // 1. Create a session.
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/sessions")
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::from(
                    json!({
                        "student_id": "stu-1",
                        "activity_id": "act-1",
                        "mode": "tutor",
                        "simulator_type": null,
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let created = body_json(response).await;
    let session_id = created["session_id"].as_str().unwrap().to_string();
    assert_eq!(created["lifecycle"], "active");

    // 2. Post a conceptual interaction; expect an unblocked tutor reply. The
    // default policy's `require_traceability` passes on the just-built
    // inbound trace itself (spec.md §4.3), so a session's very first
    // interaction is never blocked by that check.
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/sessions/{session_id}/interactions"))
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::from(
                    json!({
                        "prompt": "What is a circular queue and how does it differ from a simple queue?",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let interaction = body_json(response).await;
    assert_eq!(interaction["blocked"], false);
    assert_eq!(interaction["agent_used"], "Tutor");

    // 3. A delegation request on the same session is blocked as HTTP 200.
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/sessions/{session_id}/interactions"))
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::from(
                    json!({
                        "prompt": "Dame el código completo de una cola circular con arreglos",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let blocked = body_json(response).await;
    assert_eq!(blocked["blocked"], true);
    assert!(blocked["message"].as_str().unwrap().len() > 0);

    // 4. Traces: two per interaction, four total (conceptual + delegation).
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/sessions/{session_id}/traces"))
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let traces = body_json(response).await;
    assert_eq!(traces["traces"].as_array().unwrap().len(), 4);

    // 5. Risks: at least the delegation risk from step 3.
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/sessions/{session_id}/risks"))
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let risks = body_json(response).await;
    assert!(!risks["risks"].as_array().unwrap().is_empty());

    // 6. Complete the session.
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/sessions/{session_id}/complete"))
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let completed = body_json(response).await;
    assert_eq!(completed["lifecycle"], "completed");

    // 7. Completing twice is a conflict.
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/sessions/{session_id}/complete"))
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_session_id_returns_not_found() {
    let router = test_router();
    let token = bearer_token();
    let response = router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/sessions/{}", uuid::Uuid::new_v4()))
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
