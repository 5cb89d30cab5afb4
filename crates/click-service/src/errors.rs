//! Click service error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl. Messages
//! returned to clients are generic; internal details are logged server-side.
//!
//! Losing a winner claim is not an error: it is a definitive
//! `accepted: false` outcome (see [`crate::winner::ClaimOutcome`]).

use crate::store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::error::IdentityError;
use serde::Serialize;
use thiserror::Error;

/// Click service error type.
///
/// Maps to HTTP status codes:
/// - `Store`: 503 (operation not confirmed, state unchanged)
/// - `InvalidIdentity`: 400
/// - `InvariantViolation`, `Internal`: 500
#[derive(Debug, Error)]
pub enum ClickError {
    /// Storage backend failed or was unreachable.
    #[error("Store error: {0}")]
    Store(String),

    /// Claim identity failed validation.
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    /// Stored state breaks the bound or singleton invariant.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClickError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ClickError::Store(_) => 503,
            ClickError::InvalidIdentity(_) => 400,
            ClickError::InvariantViolation(_) | ClickError::Internal(_) => 500,
        }
    }

    /// Whether the caller may safely repeat the same logical operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClickError::Store(_))
    }
}

impl From<StoreError> for ClickError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => ClickError::Store(msg),
            StoreError::Corrupt(msg) => ClickError::InvariantViolation(msg),
        }
    }
}

impl From<IdentityError> for ClickError {
    fn from(err: IdentityError) -> Self {
        ClickError::InvalidIdentity(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for ClickError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ClickError::Store(err) => {
                tracing::warn!(target: "click.http", error = %err, "Store operation failed");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "NOT_CONFIRMED",
                    "Operation not confirmed, state unchanged. Please retry.".to_string(),
                )
            }
            ClickError::InvalidIdentity(reason) => (
                StatusCode::BAD_REQUEST,
                "INVALID_IDENTITY",
                reason.clone(),
            ),
            ClickError::InvariantViolation(detail) => {
                tracing::error!(target: "click.http", detail = %detail, "Invariant violation");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
            ClickError::Internal(detail) => {
                tracing::error!(target: "click.http", detail = %detail, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(error_response)).into_response()
    }
}
