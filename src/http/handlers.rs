//! The six routes of the primary HTTP API (spec.md §6). Bodies are read as
//! raw bytes first so the 150 KB total-request cap can be enforced before
//! JSON parsing, then validated per spec.md §6 before anything reaches the
//! gateway.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};

use crate::domain::SessionId;
use crate::error::{GatewayError, blocked_response};
use crate::http::auth::AuthenticatedUser;
use crate::http::dto::{
    CreateSessionRequest, InteractionRequest, InteractionResponse, RiskList, SessionDetail,
    SessionResponse, TraceList,
};
use crate::http::validation::{self, PromptValidationError};
use crate::http::AppState;

fn parse_body<T: serde::de::DeserializeOwned>(bytes: &Bytes) -> Result<T, GatewayError> {
    validation::validate_request_size(bytes.len())
        .map_err(|e| GatewayError::Validation(e.to_string()))?;
    serde_json::from_slice(bytes)
        .map_err(|e| GatewayError::Validation(format!("malformed request body: {e}")))
}

fn session_id_from_path(raw: &str) -> Result<SessionId, GatewayError> {
    uuid::Uuid::parse_str(raw)
        .map(SessionId)
        .map_err(|_| GatewayError::Validation(format!("invalid session id: {raw}")))
}

pub async fn create_session(
    State(state): State<AppState>,
    _auth: AuthenticatedUser,
    body: Bytes,
) -> Result<Json<SessionResponse>, GatewayError> {
    let req: CreateSessionRequest = parse_body(&body)?;
    let session = state
        .gateway
        .create_session(req.student_id, req.activity_id, req.mode, req.simulator_type)
        .await?;
    Ok(Json(session.into()))
}

pub async fn get_session(
    State(state): State<AppState>,
    _auth: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<SessionDetail>, GatewayError> {
    let id = session_id_from_path(&id)?;
    let session = state.gateway.get_session(id).await?;
    Ok(Json(session.into()))
}

pub async fn post_interaction(
    State(state): State<AppState>,
    _auth: AuthenticatedUser,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let id = session_id_from_path(&id)?;
    let req: InteractionRequest = parse_body(&body)?;

    validation::validate_prompt(&req.prompt).map_err(|e| match e {
        PromptValidationError::RequestTooLarge | PromptValidationError::ContextTooLarge => {
            GatewayError::Validation(e.to_string())
        }
        other => GatewayError::Validation(other.to_string()),
    })?;
    if let Some(ctx) = &req.context {
        validation::validate_context_size(ctx).map_err(|e| GatewayError::Validation(e.to_string()))?;
    }

    let result = state
        .gateway
        .process_interaction(id, &req.prompt, req.context, None)
        .await?;

    // spec.md §7: the user-visible blocked response is an HTTP 200 carrying
    // `{blocked: true, ...}`, not an error — the pedagogical message must
    // reach the student rather than be swallowed by an error handler.
    if result.blocked {
        return Ok(blocked_response(
            result.block_reason.as_deref().unwrap_or("blocked"),
            &result.message,
        ));
    }

    let response: InteractionResponse = result.into();
    Ok(Json(response).into_response())
}

pub async fn list_traces(
    State(state): State<AppState>,
    _auth: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<TraceList>, GatewayError> {
    let id = session_id_from_path(&id)?;
    let traces = state.gateway.list_traces(id).await?;
    Ok(Json(TraceList { traces }))
}

pub async fn list_risks(
    State(state): State<AppState>,
    _auth: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<RiskList>, GatewayError> {
    let id = session_id_from_path(&id)?;
    let risks = state.gateway.list_risks(id).await?;
    Ok(Json(RiskList { risks }))
}

pub async fn complete_session(
    State(state): State<AppState>,
    _auth: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, GatewayError> {
    let id = session_id_from_path(&id)?;
    let session = state.gateway.complete_session(id).await?;
    Ok(Json(session.into()))
}
