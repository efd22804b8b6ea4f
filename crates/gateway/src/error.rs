//! HTTP error mapping.
//!
//! Every handler returns `Result<_, ApiError>`; the conversions below are
//! the single place domain errors become status codes, so the taxonomy
//! (400 / 401 / 404 / 429 / 500) cannot drift per route.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use case_engine::CaseError;
use casetrack_auth::AuthError;
use record_store::StoreError;
use serde_json::json;
use tracing::error;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("too many attempts")]
    TooManyAttempts { retry_after_secs: u64 },
    #[error("internal error")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            Self::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response()
            }
            Self::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            Self::TooManyAttempts { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_after_secs.to_string())],
                Json(json!({
                    "error": "Too many login attempts, please try again later.",
                    "retryAfter": retry_after_secs,
                })),
            )
                .into_response(),
            Self::Internal(message) => {
                // The detail goes to the log, not the wire.
                error!(detail = %message, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<CaseError> for ApiError {
    fn from(err: CaseError) -> Self {
        match err {
            CaseError::NotFound => Self::NotFound("Case not found".to_string()),
            CaseError::InvalidSubmission { reasons } => Self::BadRequest(reasons.join(", ")),
            CaseError::FileRejected { reason } => Self::BadRequest(reason),
            CaseError::FileStorage { message } => Self::Internal(message),
            CaseError::Store(err) => err.into(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => {
                Self::Unauthorized("Invalid credentials".to_string())
            }
            AuthError::LockedOut { retry_after_secs } => {
                Self::TooManyAttempts { retry_after_secs }
            }
            AuthError::UnknownIdentity => {
                Self::NotFound("No cases found for this email".to_string())
            }
            AuthError::InvalidCode => {
                Self::Unauthorized("Invalid code. Please check the code and try again.".to_string())
            }
            AuthError::ExpiredCode => {
                Self::Unauthorized("Code has expired. Please request a new code.".to_string())
            }
            AuthError::InvalidToken => Self::Unauthorized("Invalid token".to_string()),
            AuthError::ExpiredToken => {
                Self::Unauthorized("Session expired. Please login again.".to_string())
            }
            AuthError::Store(err) => err.into(),
        }
    }
}
