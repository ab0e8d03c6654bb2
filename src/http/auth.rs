//! Minimal auth boundary (spec.md §6): the core treats authentication as an
//! external collaborator and only needs `(authenticated_user_id)` handed to
//! it. This extracts and verifies a bearer JWT (`sub`, `iat`, `exp`) with
//! `jsonwebtoken`, the natural `serde`-ecosystem crate for the job — the
//! teacher crate carries no JWT handling of its own, so this is the one
//! genuinely new ambient dependency (noted in DESIGN.md).

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::http::AppState;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// The authenticated caller, extracted once per request. Unauthenticated
/// calls are refused before reaching the gateway (spec.md §6).
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = GatewayError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| GatewayError::Auth("missing bearer token".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| GatewayError::Auth("authorization header must be a bearer token".to_string()))?;

        let secret = state
            .jwt_secret_key
            .as_deref()
            .ok_or_else(|| GatewayError::Auth("auth is not configured".to_string()))?;

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| GatewayError::Auth(format!("invalid token: {e}")))?;

        Ok(AuthenticatedUser {
            user_id: data.claims.sub,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn make_token(secret: &str, sub: &str, exp_offset_secs: i64) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: sub.to_string(),
            iat: now,
            exp: now + exp_offset_secs,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn token_round_trips_through_decode() {
        let secret = "x".repeat(32);
        let token = make_token(&secret, "student-42", 3600);
        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(data.claims.sub, "student-42");
    }

    #[test]
    fn expired_token_is_rejected() {
        let secret = "x".repeat(32);
        let token = make_token(&secret, "student-42", -3600);
        let result = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        );
        assert!(result.is_err());
    }
}
