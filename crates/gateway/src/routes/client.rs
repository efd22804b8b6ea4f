//! Client-portal routes: code-based login and the authenticated case view.

use crate::error::ApiError;
use crate::state::{AppState, ClientAuth};
use axum::extract::{Path, State};
use axum::Json;
use case_engine::CaseError;
use serde::Deserialize;
use serde_json::{json, Value};
use shared_types::EmailAddress;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct RequestLoginBody {
    #[serde(default)]
    pub email: String,
}

/// `POST /api/client/request-login`. The code travels by Notifier only; the
/// response body never carries it.
pub async fn request_login(
    State(state): State<AppState>,
    Json(body): Json<RequestLoginBody>,
) -> Result<Json<Value>, ApiError> {
    let email = EmailAddress::parse(&body.email)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    state.otp.issue(&email).await?;
    Ok(Json(json!({
        "success": true,
        "message": "A login code has been sent to your email",
    })))
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpBody {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub otp: String,
}

/// `POST /api/client/verify-otp`: a valid code opens a 24-hour session.
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(body): Json<VerifyOtpBody>,
) -> Result<Json<Value>, ApiError> {
    let email = EmailAddress::parse(&body.email)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    let session = state.otp.verify(&email, &body.otp).await?;
    info!(email = %email, "client session opened");
    Ok(Json(json!({
        "success": true,
        "token": session.token,
        "expiresAt": session.expires_at,
    })))
}

/// `GET /api/client/cases`: the caller's own cases, internals redacted.
pub async fn list_cases(
    State(state): State<AppState>,
    ClientAuth(identity): ClientAuth,
) -> Result<Json<Value>, ApiError> {
    let cases = state.cases.cases_for(&identity.email).await?;
    Ok(Json(json!({ "success": true, "cases": cases })))
}

/// `GET /api/client/cases/:caseId/download-all`: download links for every
/// attachment on the caller's own case. A case that is missing, foreign or
/// empty answers the same 404.
pub async fn download_links(
    State(state): State<AppState>,
    ClientAuth(identity): ClientAuth,
    Path(case_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let case_id = shared_types::CaseId::parse(&case_id)
        .map_err(|_| ApiError::bad_request("Invalid case ID format"))?;
    let files = state
        .cases
        .case_files(&case_id, &identity.email)
        .await
        .map_err(|err| match err {
            CaseError::NotFound => {
                ApiError::not_found("Case not found or no files available")
            }
            other => other.into(),
        })?;

    let files: Vec<Value> = files
        .iter()
        .map(|file| {
            json!({
                "filename": file.original_name,
                "url": file.url,
                "size": file.size,
            })
        })
        .collect();
    Ok(Json(json!({ "success": true, "files": files })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyBody {
    #[serde(default)]
    pub case_id: String,
    #[serde(default)]
    pub message: String,
}

/// `POST /api/client/reply`: owner-gated by the session's email.
pub async fn reply(
    State(state): State<AppState>,
    ClientAuth(identity): ClientAuth,
    Json(body): Json<ReplyBody>,
) -> Result<Json<Value>, ApiError> {
    let case_id = shared_types::CaseId::parse(&body.case_id)
        .map_err(|_| ApiError::bad_request("Invalid case ID format"))?;
    state
        .cases
        .reply(&case_id, &identity.email, &body.message)
        .await?;
    Ok(Json(json!({ "success": true, "message": "Reply sent successfully" })))
}
