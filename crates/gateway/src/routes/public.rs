//! Unauthenticated routes: health, case submission, asset-reclaim intake,
//! public status lookup, attachment download.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use case_engine::{attachments, CaseError, IncomingFile, ReclaimSubmission, Submission};
use serde_json::{json, Value};
use shared_types::CaseId;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `POST /api/contact`: multipart form with contact fields and up to five
/// `files` parts.
pub async fn submit_case(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut submission = Submission::default();
    let mut uploads = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "files" {
            let original_name = field.file_name().unwrap_or("upload").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(e.to_string()))?;
            uploads.push(IncomingFile {
                original_name,
                content_type,
                bytes: bytes.to_vec(),
            });
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ApiError::bad_request(e.to_string()))?;
        match name.as_str() {
            "name" => submission.name = Some(value),
            "email" => submission.email = Some(value),
            "phone" => submission.phone = Some(value),
            "service" => submission.service = Some(value),
            "message" => submission.message = Some(value),
            _ => {}
        }
    }

    let case_id = state.cases.create(submission, uploads).await?;
    Ok(Json(json!({
        "success": true,
        "caseId": case_id,
        "message": "Case submitted successfully",
    })))
}

/// `POST /api/asset-reclaim`: the secondary intake. Same multipart shape as
/// the contact form, its own field set and a narrower upload policy.
pub async fn submit_asset_reclaim(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut submission = ReclaimSubmission::default();
    let mut uploads = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "files" {
            let original_name = field.file_name().unwrap_or("upload").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(e.to_string()))?;
            uploads.push(IncomingFile {
                original_name,
                content_type,
                bytes: bytes.to_vec(),
            });
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ApiError::bad_request(e.to_string()))?;
        match name.as_str() {
            "company" => submission.company = Some(value),
            "contactName" => submission.contact_name = Some(value),
            "email" => submission.email = Some(value),
            "phone" => submission.phone = Some(value),
            "propertyAddress" => submission.property_address = Some(value),
            "details" => submission.details = Some(value),
            _ => {}
        }
    }

    let case_id = state.reclaims.submit(submission, uploads).await?;
    Ok(Json(json!({ "ok": true, "caseId": case_id })))
}

/// `GET /api/case/:caseId`: redacted status view, no authentication.
pub async fn get_case(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let case_id =
        CaseId::parse(&case_id).map_err(|_| ApiError::bad_request("Invalid case ID format"))?;
    let view = state.cases.get_public(&case_id).await?;
    Ok(Json(json!({ "success": true, "case": view })))
}

/// `GET /api/uploads/:caseId/:filename`: both path segments are shape
/// checked before any storage lookup.
pub async fn download_attachment(
    State(state): State<AppState>,
    Path((case_id, filename)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let case_id =
        CaseId::parse(&case_id).map_err(|_| ApiError::bad_request("Invalid case ID format"))?;
    if !attachments::is_stored_name(&filename) {
        return Err(ApiError::bad_request("Invalid filename"));
    }

    let bytes = state
        .cases
        .open_attachment(&case_id, &filename)
        .await
        .map_err(|err| match err {
            // Missing files answer 404; an actual I/O fault must not.
            CaseError::NotFound => ApiError::not_found("File not found"),
            other => other.into(),
        })?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type_for(&filename)),
            (header::CONTENT_DISPOSITION, "inline"),
        ],
        bytes,
    )
        .into_response())
}

fn content_type_for(filename: &str) -> &'static str {
    match filename.rsplit_once('.').map(|(_, ext)| ext) {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        _ => "application/octet-stream",
    }
}
