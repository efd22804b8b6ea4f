//! Staff routes. Everything here except login sits behind [`StaffAuth`].

use crate::error::ApiError;
use crate::state::{AppState, SourceIp, StaffAuth};
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use case_engine::{CasePatch, CaseQuery, EmailRecord};
use casetrack_auth::{notify_best_effort, AuthError, EmailPriority, LoginCheck, Notification};
use serde::Deserialize;
use serde_json::{json, Value};
use shared_types::{CaseId, EmailAddress};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// `POST /api/admin/login`. Guard check first (429 with a retry-after),
/// then a constant-time credential check; every failure is recorded.
pub async fn login(
    State(state): State<AppState>,
    SourceIp(source): SourceIp,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    if let LoginCheck::LockedOut { retry_after } = state.guard.check(&source) {
        return Err(AuthError::LockedOut {
            retry_after_secs: retry_after.as_secs().max(1),
        }
        .into());
    }

    let ok = state.staff.verify(&request.email, &request.password);
    state.guard.record(&source, ok);
    if !ok {
        warn!(source = %source, "failed staff login");
        return Err(AuthError::InvalidCredentials.into());
    }

    let token = state.sessions.mint_staff(&state.staff.email);
    info!(source = %source, "staff login");
    Ok(Json(json!({
        "success": true,
        "token": token,
        "user": { "email": state.staff.email },
    })))
}

/// `GET /api/admin/cases`: filtered, sorted, paginated listing.
pub async fn list_cases(
    State(state): State<AppState>,
    StaffAuth(_): StaffAuth,
    Query(query): Query<CaseQuery>,
) -> Result<Json<Value>, ApiError> {
    let page = state.cases.list(&query).await?;
    Ok(Json(json!({
        "success": true,
        "cases": page.cases,
        "pagination": page.pagination,
    })))
}

/// `GET /api/admin/cases/export/csv`.
pub async fn export_csv(
    State(state): State<AppState>,
    StaffAuth(_): StaffAuth,
) -> Result<Response, ApiError> {
    let csv = state.cases.export_csv().await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=cases-export.csv".to_string(),
            ),
        ],
        csv,
    )
        .into_response())
}

/// `GET /api/admin/cases/:caseId`: the full record, logs included.
pub async fn get_case(
    State(state): State<AppState>,
    StaffAuth(_): StaffAuth,
    Path(case_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let case_id =
        CaseId::parse(&case_id).map_err(|_| ApiError::bad_request("Invalid case ID format"))?;
    let case = state.cases.get_full(&case_id).await?;
    Ok(Json(json!({ "success": true, "case": case })))
}

/// `PUT /api/admin/cases/:caseId`.
pub async fn update_case(
    State(state): State<AppState>,
    StaffAuth(staff): StaffAuth,
    Path(case_id): Path<String>,
    Json(patch): Json<CasePatch>,
) -> Result<Json<Value>, ApiError> {
    let case_id =
        CaseId::parse(&case_id).map_err(|_| ApiError::bad_request("Invalid case ID format"))?;
    info!(case = %case_id, staff = %staff.email, "case update");
    let case = state.cases.update(&case_id, patch).await?;
    Ok(Json(json!({ "success": true, "case": case })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateRequest {
    #[serde(default)]
    pub case_ids: Vec<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// `PUT /api/admin/cases/bulk-update`. Ids that do not parse or do not
/// match any case are skipped, not errors.
pub async fn bulk_update(
    State(state): State<AppState>,
    StaffAuth(_): StaffAuth,
    Json(request): Json<BulkUpdateRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.case_ids.is_empty() {
        return Err(ApiError::bad_request("caseIds array required"));
    }
    let ids: Vec<CaseId> = request
        .case_ids
        .iter()
        .filter_map(|raw| CaseId::parse(raw).ok())
        .collect();
    let updated = state
        .cases
        .bulk_update(ids, request.status, request.notes)
        .await?;
    Ok(Json(json!({ "success": true, "updated": updated })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailRequest {
    #[serde(default)]
    pub to: String,
    pub cc: Option<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
    pub case_id: Option<String>,
    pub priority: Option<EmailPriority>,
}

/// `POST /api/admin/send-email`: compose mail to a client; when a case id
/// is given the send is recorded in that case's email history.
pub async fn send_email(
    State(state): State<AppState>,
    StaffAuth(staff): StaffAuth,
    Json(request): Json<SendEmailRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.to.is_empty() || request.subject.is_empty() || request.message.is_empty() {
        return Err(ApiError::bad_request(
            "Missing required fields: to, subject, message",
        ));
    }
    let to = EmailAddress::parse(&request.to)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    let cc = match &request.cc {
        Some(cc) if !cc.is_empty() => {
            Some(EmailAddress::parse(cc).map_err(|e| ApiError::bad_request(e.to_string()))?)
        }
        _ => None,
    };
    let case_id = match &request.case_id {
        Some(raw) => Some(
            CaseId::parse(raw).map_err(|_| ApiError::bad_request("Invalid case ID format"))?,
        ),
        None => None,
    };
    let priority = request.priority.unwrap_or_default();

    notify_best_effort(
        state.notifier.as_ref(),
        Notification::StaffMail {
            to: to.clone(),
            cc: cc.clone(),
            subject: request.subject.clone(),
            body: request.message.clone(),
            case_id: case_id.clone(),
            priority,
        },
    )
    .await;

    if let Some(case_id) = &case_id {
        let record = EmailRecord {
            date: chrono::Utc::now(),
            to: to.as_str().to_string(),
            cc: cc.map(|cc| cc.as_str().to_string()),
            subject: request.subject.clone(),
            sent_by: staff.email.as_str().to_string(),
            priority: priority.as_str().to_string(),
            status: "sent".to_string(),
        };
        state.cases.record_email(case_id, record).await?;
    }

    Ok(Json(json!({ "success": true, "message": "Email sent successfully" })))
}
