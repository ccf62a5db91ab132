// =============================================================================
// API Errors — domain errors → status + `{"error", "detail"}`
// =============================================================================
//
// Clients get a stable code and a generic message. Upstream text (exchange
// error strings, row contents) is logged here and never echoed back.
// =============================================================================

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::auth::AuthError;
use crate::market_data::MarketError;

#[derive(Debug)]
pub enum ApiError {
    Market(MarketError),
    Auth(AuthError),
    /// Query string or body the extractor could not decode. `reason` is
    /// the decoder's message and is only logged.
    BadInput { what: &'static str, reason: String },
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        Self::BadInput {
            what: "query string",
            reason: e.body_text(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::BadInput {
            what: "JSON body",
            reason: e.body_text(),
        }
    }
}

impl From<MarketError> for ApiError {
    fn from(e: MarketError) -> Self {
        Self::Market(e)
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        Self::Auth(e)
    }
}

impl ApiError {
    /// Status, error code and client-facing detail.
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            Self::Market(e) => match e {
                MarketError::MalformedRow { .. } | MarketError::UpstreamData(_) => (
                    StatusCode::BAD_GATEWAY,
                    "upstream_data",
                    "the exchange returned data that could not be used".into(),
                ),
                MarketError::Gateway(_) => (
                    StatusCode::BAD_GATEWAY,
                    "upstream_unavailable",
                    "the exchange request failed".into(),
                ),
                MarketError::UpstreamTimeout(_) => (
                    StatusCode::GATEWAY_TIMEOUT,
                    "upstream_timeout",
                    "the exchange did not respond in time".into(),
                ),
                MarketError::InvalidRequest(msg) => {
                    (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
                }
            },
            Self::Auth(e) => match e {
                AuthError::UserExists => (
                    StatusCode::BAD_REQUEST,
                    "user_exists",
                    "an account with this email already exists".into(),
                ),
                AuthError::UserNotFound => (
                    StatusCode::NOT_FOUND,
                    "user_not_found",
                    "no account for this email".into(),
                ),
                AuthError::InvalidPassword => (
                    StatusCode::UNAUTHORIZED,
                    "invalid_password",
                    "incorrect password".into(),
                ),
                AuthError::InvalidToken(_) => (
                    StatusCode::UNAUTHORIZED,
                    "invalid_token",
                    "invalid or expired token".into(),
                ),
                AuthError::InvalidRequest(msg) => {
                    (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
                }
            },
            Self::BadInput { what, .. } => (
                StatusCode::BAD_REQUEST,
                "invalid_request",
                format!("malformed {what}"),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, detail) = self.parts();

        match &self {
            Self::Market(e) if status.is_server_error() => {
                error!(code, error = %e, "market request failed")
            }
            Self::Market(e) => warn!(code, error = %e, "market request rejected"),
            Self::Auth(e) => warn!(code, error = %e, "auth request rejected"),
            Self::BadInput { what, reason } => {
                warn!(code, what, reason = %reason, "request could not be decoded")
            }
        }

        (status, Json(json!({ "error": code, "detail": detail }))).into_response()
    }
}
