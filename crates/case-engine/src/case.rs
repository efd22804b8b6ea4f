//! Case entities and views.
//!
//! The persisted JSON layout uses camelCase field names; collections written
//! by earlier deployments may omit the log arrays, so those default to empty
//! on read. `updates`, `notes`, `client_replies` and `email_history` are
//! append-only; nothing in this crate removes or rewrites an entry.

use crate::errors::CaseError;
use serde::{Deserialize, Serialize};
use shared_types::{CaseId, EmailAddress, Timestamp};

/// Well-known status values. The field itself stays a free string so
/// operator-defined statuses survive round trips; the progression
/// `new → in-progress → completed` (with `on-hold` as a side branch) is a
/// convention, not an enforced graph.
pub mod status {
    pub const NEW: &str = "new";
    pub const IN_PROGRESS: &str = "in-progress";
    pub const ON_HOLD: &str = "on-hold";
    pub const COMPLETED: &str = "completed";
}

/// An attachment stored under the case's upload directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    /// Stored name, `{unix-millis}-{sanitized original}`.
    pub filename: String,
    pub original_name: String,
    pub size: u64,
    pub mimetype: String,
    pub url: String,
}

/// One entry in the client-visible update log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseUpdate {
    pub date: Timestamp,
    pub message: String,
    pub status: String,
}

/// One entry in the staff-internal notes log. Never serialized into a
/// public or client payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseNote {
    pub date: Timestamp,
    pub message: String,
}

/// One client reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientReply {
    pub date: Timestamp,
    pub message: String,
    pub from: String,
}

/// One staff-sent email recorded against the case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailRecord {
    pub date: Timestamp,
    pub to: String,
    pub cc: Option<String>,
    pub subject: String,
    pub sent_by: String,
    pub priority: String,
    pub status: String,
}

/// A case record, the unit of the Cases collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub id: CaseId,
    pub name: String,
    pub email: EmailAddress,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub files: Vec<StoredFile>,
    pub status: String,
    #[serde(default)]
    pub updates: Vec<CaseUpdate>,
    #[serde(default)]
    pub notes: Vec<CaseNote>,
    #[serde(default)]
    pub client_replies: Vec<ClientReply>,
    #[serde(default)]
    pub email_history: Vec<EmailRecord>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Case {
    pub fn new(id: CaseId, submission: ValidSubmission, files: Vec<StoredFile>, now: Timestamp) -> Self {
        Self {
            id,
            name: submission.name,
            email: submission.email,
            phone: submission.phone,
            service: submission.service,
            message: submission.message,
            files,
            status: status::NEW.to_string(),
            updates: Vec::new(),
            notes: Vec::new(),
            client_replies: Vec::new(),
            email_history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// The public view of a case: what an unauthenticated status lookup gets.
/// No contact attributes, no notes, no replies, no email history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicCaseView {
    pub id: CaseId,
    pub status: String,
    pub created_at: Timestamp,
    pub service: String,
    pub updates: Vec<CaseUpdate>,
}

impl From<&Case> for PublicCaseView {
    fn from(case: &Case) -> Self {
        Self {
            id: case.id.clone(),
            status: case.status.clone(),
            created_at: case.created_at,
            service: case.service.clone(),
            updates: case.updates.clone(),
        }
    }
}

/// The client-portal view: the submitter's own case without the
/// staff-internal notes and email history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCaseView {
    pub id: CaseId,
    pub name: String,
    pub email: EmailAddress,
    pub phone: String,
    pub service: String,
    pub message: String,
    pub files: Vec<StoredFile>,
    pub status: String,
    pub updates: Vec<CaseUpdate>,
    pub client_replies: Vec<ClientReply>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&Case> for ClientCaseView {
    fn from(case: &Case) -> Self {
        Self {
            id: case.id.clone(),
            name: case.name.clone(),
            email: case.email.clone(),
            phone: case.phone.clone(),
            service: case.service.clone(),
            message: case.message.clone(),
            files: case.files.clone(),
            status: case.status.clone(),
            updates: case.updates.clone(),
            client_replies: case.client_replies.clone(),
            created_at: case.created_at,
            updated_at: case.updated_at,
        }
    }
}

/// Raw contact-form input, pre-validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Submission {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub service: Option<String>,
    pub message: Option<String>,
}

/// A submission that passed validation, with fields trimmed and angle
/// brackets stripped.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidSubmission {
    pub name: String,
    pub email: EmailAddress,
    pub phone: String,
    pub service: String,
    pub message: String,
}

const MAX_NAME_LEN: usize = 100;

fn sanitize(value: Option<&String>) -> String {
    value
        .map(|v| v.trim().replace(['<', '>'], ""))
        .unwrap_or_default()
}

impl Submission {
    /// Validate and sanitize. All failures are collected rather than
    /// reported one at a time.
    pub fn validate(&self) -> Result<ValidSubmission, CaseError> {
        let mut reasons = Vec::new();

        let name = sanitize(self.name.as_ref());
        if name.is_empty() {
            reasons.push("Name is required".to_string());
        } else if name.len() > MAX_NAME_LEN {
            reasons.push("Name too long".to_string());
        }

        let raw_email = sanitize(self.email.as_ref());
        let email = if raw_email.is_empty() {
            reasons.push("Email is required".to_string());
            None
        } else {
            match EmailAddress::parse(&raw_email) {
                Ok(email) => Some(email),
                Err(err) => {
                    reasons.push(err.to_string());
                    None
                }
            }
        };

        match email {
            Some(email) if reasons.is_empty() => Ok(ValidSubmission {
                name,
                email,
                phone: sanitize(self.phone.as_ref()),
                service: sanitize(self.service.as_ref()),
                message: sanitize(self.message.as_ref()),
            }),
            _ => Err(CaseError::InvalidSubmission { reasons }),
        }
    }
}
