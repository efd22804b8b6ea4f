//! The asset-reclaim intake.
//!
//! A secondary submission channel for recovering assets held by a third
//! party. Records live in their own collection, carry `AR-` ids, and share
//! the attachment store with regular cases; their upload policy is stricter
//! (documents and photos only, checked on MIME alone).

use crate::attachments::{self, AttachmentStore, IncomingFile};
use crate::case::CaseUpdate;
use crate::errors::CaseError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use shared_types::{Clock, EmailAddress, Timestamp};
use std::sync::Arc;
use tracing::info;

const ID_ALPHABET: &[u8] = b"0123456789ABCDEF";
const ID_LEN: usize = 12;

/// Generate a reclaim id: `AR-` plus 12 uppercase hex characters.
fn generate_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("AR-{suffix}")
}

/// Metadata of a file attached to a reclaim request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReclaimFile {
    /// Stored name, same shape as case attachments.
    pub filename: String,
    pub mimetype: String,
    pub size: u64,
}

/// A reclaim record, the unit of the asset-reclaims collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetReclaim {
    pub case_id: String,
    pub company: String,
    pub contact_name: String,
    pub email: EmailAddress,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub property_address: String,
    pub details: String,
    #[serde(default)]
    pub files: Vec<ReclaimFile>,
    pub status: String,
    #[serde(default)]
    pub updates: Vec<CaseUpdate>,
    pub created_at: Timestamp,
}

/// Raw reclaim-form input, pre-validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReclaimSubmission {
    pub company: Option<String>,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub property_address: Option<String>,
    pub details: Option<String>,
}

/// A reclaim submission that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidReclaim {
    pub company: String,
    pub contact_name: String,
    pub email: EmailAddress,
    pub phone: String,
    pub property_address: String,
    pub details: String,
}

fn sanitize(value: Option<&String>) -> String {
    value
        .map(|v| v.trim().replace(['<', '>'], ""))
        .unwrap_or_default()
}

impl ReclaimSubmission {
    /// Validate and sanitize. Company, contact name, email and details are
    /// required; phone and property address are optional.
    pub fn validate(&self) -> Result<ValidReclaim, CaseError> {
        let mut reasons = Vec::new();

        let company = sanitize(self.company.as_ref());
        if company.is_empty() {
            reasons.push("Company is required".to_string());
        }
        let contact_name = sanitize(self.contact_name.as_ref());
        if contact_name.is_empty() {
            reasons.push("Contact name is required".to_string());
        }
        let details = sanitize(self.details.as_ref());
        if details.is_empty() {
            reasons.push("Details are required".to_string());
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
            Some(email) if reasons.is_empty() => Ok(ValidReclaim {
                company,
                contact_name,
                email,
                phone: sanitize(self.phone.as_ref()),
                property_address: sanitize(self.property_address.as_ref()),
                details,
            }),
            _ => Err(CaseError::InvalidSubmission { reasons }),
        }
    }
}

pub struct ReclaimService {
    reclaims: record_store::Collection<AssetReclaim>,
    files: Arc<dyn AttachmentStore>,
    clock: Arc<dyn Clock>,
}

impl ReclaimService {
    pub fn new(
        reclaims: record_store::Collection<AssetReclaim>,
        files: Arc<dyn AttachmentStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reclaims,
            files,
            clock,
        }
    }

    /// Intake a reclaim submission with optional attachments. Returns the
    /// assigned `AR-` id. As with case intake, files are policy-checked and
    /// written before the record is appended.
    pub async fn submit(
        &self,
        submission: ReclaimSubmission,
        uploads: Vec<IncomingFile>,
    ) -> Result<String, CaseError> {
        let valid = submission.validate()?;
        attachments::check_reclaim_upload(&uploads)?;

        let millis = self.clock.now_unix_millis();
        let id = generate_id();

        let mut files = Vec::with_capacity(uploads.len());
        for upload in uploads {
            let stored = attachments::stored_name(millis, &upload.original_name);
            self.files.save(&id, &stored, &upload.bytes).await?;
            files.push(ReclaimFile {
                filename: stored,
                mimetype: upload.content_type,
                size: upload.bytes.len() as u64,
            });
        }

        let record = AssetReclaim {
            case_id: id.clone(),
            company: valid.company,
            contact_name: valid.contact_name,
            email: valid.email,
            phone: valid.phone,
            property_address: valid.property_address,
            details: valid.details,
            files,
            status: "new".to_string(),
            updates: Vec::new(),
            created_at: self.clock.now(),
        };
        self.reclaims.update(move |records| records.push(record)).await?;

        info!(reclaim = %id, "asset reclaim received");
        Ok(id)
    }
}
