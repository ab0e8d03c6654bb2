//! The closed error taxonomy of spec.md §7, each variant mapped to a
//! stable HTTP status. `thiserror` for the enum itself; `miette::Diagnostic`
//! on `Internal` only, mirroring the teacher's practice of reserving
//! diagnostic codes for the error class an operator actually needs to
//! triage (`CheckpointerError::Backend`/`Other`).

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("session {0} not found")]
    SessionNotFound(String),

    #[error("{kind} {id} not found")]
    ResourceNotFound { kind: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("deadline exceeded: {0}")]
    Timeout(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("internal error")]
    Internal(#[from] InternalError),
}

/// Unanticipated bugs. Kept distinct from `GatewayError::Internal`'s
/// display text (spec.md §7: "opaque" to the caller) so the real cause is
/// only ever logged server-side, never echoed in the response body.
#[derive(Debug, Error, miette::Diagnostic)]
#[error("{message}")]
#[diagnostic(code(tutor_gateway::internal))]
pub struct InternalError {
    pub message: String,
}

impl InternalError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl GatewayError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::Auth(_) => StatusCode::UNAUTHORIZED,
            GatewayError::SessionNotFound(_) | GatewayError::ResourceNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            GatewayError::Conflict(_) => StatusCode::CONFLICT,
            GatewayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Validation(_) => "validation_error",
            GatewayError::Auth(_) => "auth_error",
            GatewayError::SessionNotFound(_) => "session_not_found",
            GatewayError::ResourceNotFound { .. } => "resource_not_found",
            GatewayError::Conflict(_) => "conflict",
            GatewayError::RateLimited { .. } => "rate_limited",
            GatewayError::Timeout(_) => "timeout",
            GatewayError::Unavailable(_) => "unavailable",
            GatewayError::Internal(_) => "internal",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        // Internal's message is deliberately never surfaced to the caller.
        let message = match &self {
            GatewayError::Internal(_) => "an unexpected error occurred".to_string(),
            other => other.to_string(),
        };
        if let GatewayError::Internal(inner) = &self {
            tracing::error!(error = %inner.message, "internal error");
        }

        let status = self.status();
        let mut response = (
            status,
            Json(ErrorBody {
                error: self.kind(),
                message,
            }),
        )
            .into_response();

        if let GatewayError::RateLimited { retry_after_secs } = &self {
            response
                .headers_mut()
                .insert("Retry-After", retry_after_secs.to_string().parse().unwrap());
        }

        response
    }
}

/// The user-visible blocked response is always an HTTP 200 carrying
/// `{blocked: true, ...}` so the pedagogical message is delivered rather
/// than surfaced as an error (spec.md §7).
#[must_use]
pub fn blocked_response(block_reason: &str, message: &str) -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "blocked": true,
            "block_reason": block_reason,
            "message": message,
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(
            GatewayError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::SessionNotFound("s1".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::RateLimited { retry_after_secs: 5 }.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            GatewayError::Timeout("deadline".into()).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            GatewayError::Internal(InternalError::new("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
