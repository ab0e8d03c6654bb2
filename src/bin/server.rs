//! The gateway's HTTP entry point. Two lifecycle phases only (spec.md §9):
//! `start` validates configuration, opens the store, and binds the
//! listener; `stop` happens implicitly when the process receives a
//! shutdown signal. Exit codes per spec.md §6: `0` on clean shutdown,
//! non-zero on startup-validation failure or unrecoverable init error.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use tutor_gateway::classifier::CrpeClassifier;
use tutor_gateway::config::GatewayConfig;
use tutor_gateway::dispatcher::Dispatcher;
use tutor_gateway::event_bus::EventBus;
use tutor_gateway::gateway::{Gateway, GatewayDeps};
use tutor_gateway::governance::DefaultGovernanceFilter;
use tutor_gateway::http;
use tutor_gateway::llm::cache::SemanticCache;
use tutor_gateway::llm::providers::http_json::HttpJsonProvider;
use tutor_gateway::llm::providers::mock::MockProvider;
use tutor_gateway::llm::LlmProvider;
use tutor_gateway::repo::memory::{
    InMemoryPolicyRepo, InMemoryRiskRepo, InMemorySessionRepo, InMemoryTraceRepo,
};
#[cfg(feature = "sqlite")]
use tutor_gateway::repo::sqlite::{
    self, SqlitePolicyRepo, SqliteRiskRepo, SqliteSessionRepo, SqliteTraceRepo,
};
use tutor_gateway::repo::{PolicyRepo, RiskRepo, SessionRepo, TraceRepo};
use tutor_gateway::risk::RiskRuleRegistry;

#[tokio::main]
async fn main() {
    std::process::exit(run().await);
}

async fn run() -> i32 {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = GatewayConfig::from_env();
    if let Err(err) = config.validate_for_startup() {
        tracing::error!(issues = err.issues.len(), "refusing to start: invalid configuration");
        return 1;
    }

    let (session_repo, trace_repo, risk_repo, policy_repo): (
        Arc<dyn SessionRepo>,
        Arc<dyn TraceRepo>,
        Arc<dyn RiskRepo>,
        Arc<dyn PolicyRepo>,
    ) = match &config.database_url {
        #[cfg(feature = "sqlite")]
        Some(url) => match sqlite::connect(url).await {
            Ok(pool) => (
                Arc::new(SqliteSessionRepo::new(pool.clone())),
                Arc::new(SqliteTraceRepo::new(pool.clone())),
                Arc::new(SqliteRiskRepo::new(pool.clone())),
                Arc::new(SqlitePolicyRepo::new(pool)),
            ),
            Err(err) => {
                tracing::error!(%err, "failed to open database");
                return 1;
            }
        },
        #[cfg(not(feature = "sqlite"))]
        Some(_) => {
            tracing::warn!("DATABASE_URL set but the sqlite feature is disabled; using in-memory repositories");
            in_memory_repos()
        }
        None => in_memory_repos(),
    };

    let llm_provider: Option<Arc<dyn LlmProvider>> = match config.llm_provider.as_str() {
        "mock" => Some(Arc::new(MockProvider::succeeding(
            "This is a templated mock response used when no real provider is configured.",
        ))),
        "http_json" => Some(Arc::new(HttpJsonProvider::new(
            std::env::var("LLM_BASE_URL").unwrap_or_else(|_| "http://localhost:11434".to_string()),
            std::env::var("LLM_MODEL").unwrap_or_else(|_| "llama3".to_string()),
            std::env::var("LLM_API_KEY").ok(),
        ))),
        "none" => None,
        other => {
            tracing::warn!(provider = other, "unknown LLM_PROVIDER, falling back to template-only mode");
            None
        }
    };

    let cache = if config.llm_cache_enabled {
        Some(Arc::new(SemanticCache::new(
            config.llm_cache_ttl,
            config.llm_cache_max_entries,
        )))
    } else {
        None
    };

    let gateway = Arc::new(Gateway::new(GatewayDeps {
        session_repo,
        trace_repo,
        risk_repo,
        policy_repo,
        classifier: Arc::new(CrpeClassifier),
        governance: Arc::new(DefaultGovernanceFilter),
        dispatcher: Dispatcher::default(),
        risk_rules: RiskRuleRegistry::with_default_rules(),
        llm_provider,
        cache,
        cache_salt: config.cache_salt.clone(),
        events: Arc::new(EventBus::default()),
        recent_history_window: 20,
        risk_window: 30,
        default_deadline: Duration::from_secs(30),
    }));

    let router = http::build_router(gateway, &config);

    let addr: SocketAddr = std::env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        .parse()
        .unwrap_or_else(|_| ([0, 0, 0, 0], 8080).into());

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%err, %addr, "failed to bind listener");
            return 1;
        }
    };

    tracing::info!(%addr, "tutor-gateway listening");

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received");
    };

    if let Err(err) = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
    {
        tracing::error!(%err, "server error");
        return 1;
    }

    0
}

#[allow(clippy::type_complexity)]
fn in_memory_repos() -> (
    Arc<dyn SessionRepo>,
    Arc<dyn TraceRepo>,
    Arc<dyn RiskRepo>,
    Arc<dyn PolicyRepo>,
) {
    (
        Arc::new(InMemorySessionRepo::default()),
        Arc::new(InMemoryTraceRepo::default()),
        Arc::new(InMemoryRiskRepo::default()),
        Arc::new(InMemoryPolicyRepo::default()),
    )
}
