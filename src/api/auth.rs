// =============================================================================
// Bearer Token Authentication — Axum Extractor
// =============================================================================
//
// Extracts the Bearer token from the `Authorization` header and verifies it
// with the service's `TokenIssuer` (MAC compared in constant time, expiry
// enforced).
//
// Usage:
//
//   async fn handler(AuthBearer(user): AuthBearer, ...) { ... }
//
// A missing, malformed, forged or expired token short-circuits the request
// with 401 `invalid_token` before the handler body executes.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use super::error::ApiError;
use crate::app_state::AppState;
use crate::auth::{AuthError, TokenError, UserView};

/// Yields the authenticated user.
pub struct AuthBearer(pub UserView);

/// Pull the token out of an `Authorization: Bearer <token>` value.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AuthBearer {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token);

        let Some(token) = token else {
            warn!("missing or malformed Authorization header");
            return Err(AuthError::InvalidToken(TokenError::Malformed).into());
        };

        let user = state.auth.verify(token)?;
        Ok(AuthBearer(user))
    }
}
