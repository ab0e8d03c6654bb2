//! The primary HTTP API (spec.md §6): six JSON routes over the gateway,
//! auth as an external collaborator, CORS from `ALLOWED_ORIGINS`, and a
//! per-process rate limiter driven by `RATE_LIMIT_PER_MINUTE`/`_PER_HOUR`.

pub mod auth;
pub mod dto;
pub mod handlers;
pub mod rate_limit;
pub mod validation;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::gateway::Gateway;
use rate_limit::RateLimiter;

/// Shared state accessible by all handlers (spec.md §9 "explicit
/// composition": a handle passed through the router builder, not a
/// process-wide singleton).
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub jwt_secret_key: Option<String>,
    pub rate_limiter: Arc<RateLimiter>,
}

#[must_use]
pub fn build_router(gateway: Arc<Gateway>, config: &GatewayConfig) -> Router {
    let state = AppState {
        gateway,
        jwt_secret_key: config.jwt_secret_key.clone(),
        rate_limiter: Arc::new(RateLimiter::new(
            config.rate_limit_per_minute,
            config.rate_limit_per_hour,
        )),
    };

    let cors = if config.allowed_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .route("/sessions", post(handlers::create_session))
        .route("/sessions/:id", get(handlers::get_session))
        .route(
            "/sessions/:id/interactions",
            post(handlers::post_interaction),
        )
        .route("/sessions/:id/traces", get(handlers::list_traces))
        .route("/sessions/:id/risks", get(handlers::list_risks))
        .route(
            "/sessions/:id/complete",
            post(handlers::complete_session),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit::enforce,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(35)))
        .with_state(state)
}
