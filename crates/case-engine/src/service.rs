//! The case lifecycle service.
//!
//! Every mutation runs as a single queued store update, so concurrent
//! callers interleave whole operations rather than torn field writes.
//! Notifications go out after the durable write and are best-effort.

use crate::attachments::{self, AttachmentStore, IncomingFile};
use crate::case::{
    Case, CaseNote, CaseUpdate, ClientCaseView, ClientReply, EmailRecord, PublicCaseView,
    StoredFile, Submission,
};
use crate::errors::CaseError;
use crate::query::{self, CasePage, CaseQuery};
use crate::csv;
use async_trait::async_trait;
use casetrack_auth::otp::CaseOwnership;
use casetrack_auth::{notify_best_effort, Notification, Notifier};
use record_store::{Collection, StoreError};
use shared_types::{CaseId, Clock, EmailAddress};
use std::sync::Arc;
use tracing::info;

/// A staff edit to a single case.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct CasePatch {
    pub status: Option<String>,
    /// Appended to the internal notes log.
    pub notes: Option<String>,
    /// Pre-built update entries appended verbatim (bulk-import escape hatch).
    #[serde(default)]
    pub updates: Vec<CaseUpdate>,
}

pub struct CaseService {
    cases: Collection<Case>,
    files: Arc<dyn AttachmentStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    /// Where client-reply alerts are addressed.
    staff_inbox: EmailAddress,
}

impl CaseService {
    pub fn new(
        cases: Collection<Case>,
        files: Arc<dyn AttachmentStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        staff_inbox: EmailAddress,
    ) -> Self {
        Self {
            cases,
            files,
            notifier,
            clock,
            staff_inbox,
        }
    }

    /// Intake a public submission with optional attachments.
    ///
    /// Attachments are policy-checked and written before the case record is
    /// appended, so a stored record never references a missing file.
    pub async fn create(
        &self,
        submission: Submission,
        uploads: Vec<IncomingFile>,
    ) -> Result<CaseId, CaseError> {
        let valid = submission.validate()?;
        attachments::check_upload(&uploads)?;

        let millis = self.clock.now_unix_millis();
        let id = CaseId::generate(millis);

        let mut files = Vec::with_capacity(uploads.len());
        for upload in uploads {
            let stored = attachments::stored_name(millis, &upload.original_name);
            self.files.save(id.as_str(), &stored, &upload.bytes).await?;
            files.push(StoredFile {
                url: format!("/api/uploads/{id}/{stored}"),
                filename: stored,
                original_name: upload.original_name,
                size: upload.bytes.len() as u64,
                mimetype: upload.content_type,
            });
        }

        let email = valid.email.clone();
        let case = Case::new(id.clone(), valid, files, self.clock.now());
        self.cases.update(move |cases| cases.push(case)).await?;

        info!(case = %id, "case created");
        notify_best_effort(
            self.notifier.as_ref(),
            Notification::CaseReceived {
                to: email,
                case_id: id.clone(),
            },
        )
        .await;

        Ok(id)
    }

    /// Unauthenticated status lookup.
    pub async fn get_public(&self, id: &CaseId) -> Result<PublicCaseView, CaseError> {
        let cases = self.cases.read_all().await?;
        cases
            .iter()
            .find(|c| c.id == *id)
            .map(PublicCaseView::from)
            .ok_or(CaseError::NotFound)
    }

    /// Staff lookup: the full record, logs included.
    pub async fn get_full(&self, id: &CaseId) -> Result<Case, CaseError> {
        let cases = self.cases.read_all().await?;
        cases
            .into_iter()
            .find(|c| c.id == *id)
            .ok_or(CaseError::NotFound)
    }

    /// Apply a staff edit.
    ///
    /// A status value equal to the current one appends nothing and sends
    /// nothing; only an actual change grows the update log and notifies the
    /// client. `updated_at` is refreshed on every call.
    pub async fn update(&self, id: &CaseId, patch: CasePatch) -> Result<Case, CaseError> {
        let now = self.clock.now();
        let target = id.clone();
        let outcome = self
            .cases
            .update(move |cases| {
                let case = match cases.iter_mut().find(|c| c.id == target) {
                    Some(case) => case,
                    None => return Err(CaseError::NotFound),
                };

                let mut status_changed = None;
                if let Some(status) = &patch.status {
                    if *status != case.status {
                        case.status = status.clone();
                        case.updates.push(CaseUpdate {
                            date: now,
                            message: format!("Status changed to {status}"),
                            status: status.clone(),
                        });
                        status_changed = Some(status.clone());
                    }
                }
                if let Some(notes) = &patch.notes {
                    case.notes.push(CaseNote {
                        date: now,
                        message: notes.clone(),
                    });
                }
                case.updates.extend(patch.updates.iter().cloned());
                case.updated_at = now;

                Ok((case.clone(), status_changed, patch.notes.clone()))
            })
            .await?;

        let (case, status_changed, notes) = outcome?;
        if let Some(status) = status_changed {
            info!(case = %case.id, status, "case status changed");
            notify_best_effort(
                self.notifier.as_ref(),
                Notification::StatusChanged {
                    to: case.email.clone(),
                    case_id: case.id.clone(),
                    status,
                    notes,
                },
            )
            .await;
        }
        Ok(case)
    }

    /// Apply a status (and optional note text) across many cases at once.
    ///
    /// Lenient by design: ids with no matching case are skipped and do not
    /// count toward the returned total. Without a status the matched cases
    /// only get their `updated_at` refreshed.
    pub async fn bulk_update(
        &self,
        ids: Vec<CaseId>,
        status: Option<String>,
        notes: Option<String>,
    ) -> Result<usize, CaseError> {
        let now = self.clock.now();
        let updated = self
            .cases
            .update(move |cases| {
                let mut updated = 0usize;
                for id in &ids {
                    let case = match cases.iter_mut().find(|c| c.id == *id) {
                        Some(case) => case,
                        None => continue,
                    };
                    if let Some(status) = &status {
                        case.status = status.clone();
                        case.updates.push(CaseUpdate {
                            date: now,
                            message: notes
                                .clone()
                                .unwrap_or_else(|| format!("Status changed to {status}")),
                            status: status.clone(),
                        });
                    }
                    case.updated_at = now;
                    updated += 1;
                }
                updated
            })
            .await?;

        info!(updated, "bulk case update");
        Ok(updated)
    }

    /// Append a client reply. Only the submitting email may reply; anyone
    /// else sees the same "not found" as a nonexistent case.
    pub async fn reply(
        &self,
        id: &CaseId,
        email: &EmailAddress,
        message: &str,
    ) -> Result<(), CaseError> {
        let text = message.trim().replace(['<', '>'], "");
        if text.is_empty() {
            return Err(CaseError::InvalidSubmission {
                reasons: vec!["Message is required".to_string()],
            });
        }

        let now = self.clock.now();
        let target = id.clone();
        let owner = email.clone();
        let reply_text = text.clone();
        let outcome = self
            .cases
            .update(move |cases| {
                let case = cases
                    .iter_mut()
                    .find(|c| c.id == target && c.email == owner)
                    .ok_or(CaseError::NotFound)?;
                case.client_replies.push(ClientReply {
                    date: now,
                    message: reply_text,
                    from: "client".to_string(),
                });
                case.updated_at = now;
                Ok::<_, CaseError>(())
            })
            .await?;
        outcome?;

        info!(case = %id, "client reply recorded");
        notify_best_effort(
            self.notifier.as_ref(),
            Notification::ClientReplied {
                staff: self.staff_inbox.clone(),
                case_id: id.clone(),
                client: email.clone(),
                message: text,
            },
        )
        .await;
        Ok(())
    }

    /// Record a staff-sent email against a case's history. Returns whether
    /// anything was appended; a missing case is not an error here because
    /// the mail itself already went out.
    pub async fn record_email(
        &self,
        id: &CaseId,
        record: EmailRecord,
    ) -> Result<bool, CaseError> {
        let now = self.clock.now();
        let target = id.clone();
        let appended = self
            .cases
            .update(move |cases| {
                match cases.iter_mut().find(|c| c.id == target) {
                    Some(case) => {
                        case.email_history.push(record);
                        case.updated_at = now;
                        true
                    }
                    None => false,
                }
            })
            .await?;
        Ok(appended)
    }

    /// All cases owned by `email`, redacted for the client portal.
    pub async fn cases_for(&self, email: &EmailAddress) -> Result<Vec<ClientCaseView>, CaseError> {
        let cases = self.cases.read_all().await?;
        Ok(cases
            .iter()
            .filter(|c| c.email == *email)
            .map(ClientCaseView::from)
            .collect())
    }

    /// Filtered, sorted, paginated staff listing.
    pub async fn list(&self, query: &CaseQuery) -> Result<CasePage, CaseError> {
        let cases = self.cases.read_all().await?;
        Ok(query::select(cases, query))
    }

    /// Full CSV export, every case.
    pub async fn export_csv(&self) -> Result<String, CaseError> {
        let cases = self.cases.read_all().await?;
        Ok(csv::export(&cases))
    }

    /// Read an attachment after the stored-name gate.
    pub async fn open_attachment(
        &self,
        id: &CaseId,
        stored_name: &str,
    ) -> Result<Vec<u8>, CaseError> {
        self.files.open(id.as_str(), stored_name).await
    }

    /// Download manifest for a client's own case.
    ///
    /// Owner-gated the same way as [`reply`](Self::reply): a case that is
    /// missing, owned by someone else, or has no attachments all answer
    /// `NotFound`, so the response never confirms a foreign case exists.
    pub async fn case_files(
        &self,
        id: &CaseId,
        owner: &EmailAddress,
    ) -> Result<Vec<StoredFile>, CaseError> {
        let cases = self.cases.read_all().await?;
        cases
            .iter()
            .find(|c| c.id == *id && c.email == *owner)
            .map(|c| c.files.clone())
            .filter(|files| !files.is_empty())
            .ok_or(CaseError::NotFound)
    }
}

#[async_trait]
impl CaseOwnership for CaseService {
    async fn owns_cases(&self, email: &EmailAddress) -> Result<bool, StoreError> {
        let cases = self.cases.read_all().await?;
        Ok(cases.iter().any(|c| c.email == *email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachments::InMemoryAttachmentStore;
    use crate::case::status;
    use casetrack_auth::CapturingNotifier;
    use chrono::{TimeZone, Utc};
    use record_store::InMemoryBackend;
    use shared_types::ManualClock;

    struct Fixture {
        service: CaseService,
        notifier: Arc<CapturingNotifier>,
        clock: ManualClock,
    }

    fn fixture() -> Fixture {
        let cases = Collection::<Case>::open("cases", InMemoryBackend::new()).unwrap();
        let notifier = Arc::new(CapturingNotifier::new());
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap());
        let service = CaseService::new(
            cases,
            Arc::new(InMemoryAttachmentStore::new()),
            notifier.clone(),
            Arc::new(clock.clone()),
            EmailAddress::parse("desk@agency.com").unwrap(),
        );
        Fixture {
            service,
            notifier,
            clock,
        }
    }

    fn submission(name: &str, email: &str) -> Submission {
        Submission {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            service: Some("surveillance".to_string()),
            message: Some("please help".to_string()),
            ..Submission::default()
        }
    }

    fn upload(name: &str) -> IncomingFile {
        IncomingFile {
            original_name: name.to_string(),
            content_type: "application/pdf".to_string(),
            bytes: b"pdf bytes".to_vec(),
        }
    }

    #[tokio::test]
    async fn create_stores_case_and_confirms_by_mail() {
        let fx = fixture();
        let id = fx
            .service
            .create(submission("Ada", "ada@x.com"), vec![upload("brief.pdf")])
            .await
            .unwrap();

        let case = fx.service.get_full(&id).await.unwrap();
        assert_eq!(case.status, status::NEW);
        assert_eq!(case.files.len(), 1);
        assert!(attachments::is_stored_name(&case.files[0].filename));
        assert_eq!(case.files[0].original_name, "brief.pdf");
        assert_eq!(case.created_at, case.updated_at);

        assert!(matches!(
            fx.notifier.sent().as_slice(),
            [Notification::CaseReceived { .. }]
        ));
    }

    #[tokio::test]
    async fn create_rejects_policy_violations_without_storing() {
        let fx = fixture();
        let mut bad = upload("tool.exe");
        bad.content_type = "application/octet-stream".to_string();

        let err = fx
            .service
            .create(submission("Ada", "ada@x.com"), vec![bad])
            .await
            .unwrap_err();
        assert!(matches!(err, CaseError::FileRejected { .. }));
        assert!(fx.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn status_change_appends_update_and_notifies() {
        let fx = fixture();
        let id = fx
            .service
            .create(submission("Ada", "ada@x.com"), Vec::new())
            .await
            .unwrap();
        fx.clock.advance(chrono::Duration::hours(1));
        let case = fx
            .service
            .update(
                &id,
                CasePatch {
                    status: Some(status::IN_PROGRESS.to_string()),
                    notes: Some("assigned to field team".to_string()),
                    updates: Vec::new(),
                },
            )
            .await
            .unwrap();

        assert_eq!(case.status, status::IN_PROGRESS);
        assert_eq!(case.updates.len(), 1);
        assert_eq!(case.updates[0].message, "Status changed to in-progress");
        assert_eq!(case.notes.len(), 1);
        assert!(case.updated_at > case.created_at);

        let sent = fx.notifier.sent();
        assert!(matches!(
            sent.last(),
            Some(Notification::StatusChanged { status, .. }) if status == status::IN_PROGRESS
        ));
    }

    #[tokio::test]
    async fn same_status_appends_nothing_and_stays_quiet() {
        let fx = fixture();
        let id = fx
            .service
            .create(submission("Ada", "ada@x.com"), Vec::new())
            .await
            .unwrap();
        let before = fx.notifier.sent().len();

        let case = fx
            .service
            .update(
                &id,
                CasePatch {
                    status: Some(status::NEW.to_string()),
                    ..CasePatch::default()
                },
            )
            .await
            .unwrap();

        assert!(case.updates.is_empty());
        assert_eq!(fx.notifier.sent().len(), before);
    }

    #[tokio::test]
    async fn raw_updates_append_verbatim() {
        let fx = fixture();
        let id = fx
            .service
            .create(submission("Ada", "ada@x.com"), Vec::new())
            .await
            .unwrap();

        let imported = CaseUpdate {
            date: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
            message: "migrated from legacy tracker".to_string(),
            status: "legacy".to_string(),
        };
        let case = fx
            .service
            .update(
                &id,
                CasePatch {
                    updates: vec![imported.clone()],
                    ..CasePatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(case.updates, vec![imported]);
        assert_eq!(case.status, status::NEW);
    }

    #[tokio::test]
    async fn update_unknown_case_is_not_found() {
        let fx = fixture();
        let err = fx
            .service
            .update(&CaseId::generate(0), CasePatch::default())
            .await
            .unwrap_err();
        assert_eq!(err, CaseError::NotFound);
    }

    #[tokio::test]
    async fn bulk_update_skips_unknown_ids() {
        let fx = fixture();
        let a = fx
            .service
            .create(submission("Ada", "ada@x.com"), Vec::new())
            .await
            .unwrap();
        let b = fx
            .service
            .create(submission("Bob", "bob@x.com"), Vec::new())
            .await
            .unwrap();

        let updated = fx
            .service
            .bulk_update(
                vec![a.clone(), CaseId::generate(1), b.clone()],
                Some(status::ON_HOLD.to_string()),
                Some("awaiting client docs".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(updated, 2);

        let case = fx.service.get_full(&a).await.unwrap();
        assert_eq!(case.status, status::ON_HOLD);
        assert_eq!(case.updates[0].message, "awaiting client docs");
    }

    #[tokio::test]
    async fn reply_is_owner_gated() {
        let fx = fixture();
        let id = fx
            .service
            .create(submission("Ada", "ada@x.com"), Vec::new())
            .await
            .unwrap();

        let stranger = EmailAddress::parse("mallory@x.com").unwrap();
        assert_eq!(
            fx.service.reply(&id, &stranger, "let me in").await,
            Err(CaseError::NotFound)
        );

        let owner = EmailAddress::parse("ada@x.com").unwrap();
        fx.service
            .reply(&id, &owner, "  any news? <b>  ")
            .await
            .unwrap();

        let case = fx.service.get_full(&id).await.unwrap();
        assert_eq!(case.client_replies.len(), 1);
        assert_eq!(case.client_replies[0].message, "any news? b");
        assert_eq!(case.client_replies[0].from, "client");

        let sent = fx.notifier.sent();
        assert!(matches!(
            sent.last(),
            Some(Notification::ClientReplied { staff, .. })
                if staff.as_str() == "desk@agency.com"
        ));
    }

    #[tokio::test]
    async fn email_history_appends_when_case_exists() {
        let fx = fixture();
        let id = fx
            .service
            .create(submission("Ada", "ada@x.com"), Vec::new())
            .await
            .unwrap();

        let record = EmailRecord {
            date: fx.clock.now(),
            to: "ada@x.com".to_string(),
            cc: None,
            subject: "Progress report".to_string(),
            sent_by: "admin@agency.com".to_string(),
            priority: "normal".to_string(),
            status: "sent".to_string(),
        };
        assert!(fx.service.record_email(&id, record.clone()).await.unwrap());
        assert!(!fx
            .service
            .record_email(&CaseId::generate(2), record)
            .await
            .unwrap());

        let case = fx.service.get_full(&id).await.unwrap();
        assert_eq!(case.email_history.len(), 1);
        assert_eq!(case.email_history[0].subject, "Progress report");
    }

    #[tokio::test]
    async fn download_manifest_requires_ownership_and_files() {
        let fx = fixture();
        let with_files = fx
            .service
            .create(submission("Ada", "ada@x.com"), vec![upload("brief.pdf")])
            .await
            .unwrap();
        let without_files = fx
            .service
            .create(submission("Ada", "ada@x.com"), Vec::new())
            .await
            .unwrap();

        let owner = EmailAddress::parse("ada@x.com").unwrap();
        let files = fx.service.case_files(&with_files, &owner).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].original_name, "brief.pdf");

        // Foreign owner, empty case and unknown case are indistinguishable.
        let stranger = EmailAddress::parse("mallory@x.com").unwrap();
        assert_eq!(
            fx.service.case_files(&with_files, &stranger).await,
            Err(CaseError::NotFound)
        );
        assert_eq!(
            fx.service.case_files(&without_files, &owner).await,
            Err(CaseError::NotFound)
        );
        assert_eq!(
            fx.service.case_files(&CaseId::generate(3), &owner).await,
            Err(CaseError::NotFound)
        );
    }

    #[tokio::test]
    async fn client_portal_sees_own_cases_without_internals() {
        let fx = fixture();
        fx.service
            .create(submission("Ada", "ada@x.com"), Vec::new())
            .await
            .unwrap();
        fx.service
            .create(submission("Bob", "bob@x.com"), Vec::new())
            .await
            .unwrap();

        let owner = EmailAddress::parse("ada@x.com").unwrap();
        let views = fx.service.cases_for(&owner).await.unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].name, "Ada");
    }

    #[tokio::test]
    async fn ownership_gate_reflects_the_store() {
        let fx = fixture();
        let email = EmailAddress::parse("ada@x.com").unwrap();
        assert!(!fx.service.owns_cases(&email).await.unwrap());

        fx.service
            .create(submission("Ada", "ada@x.com"), Vec::new())
            .await
            .unwrap();
        assert!(fx.service.owns_cases(&email).await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_updates_interleave_whole_operations() {
        let fx = fixture();
        let id = fx
            .service
            .create(submission("Ada", "ada@x.com"), Vec::new())
            .await
            .unwrap();

        let service = Arc::new(fx.service);
        let mut handles = Vec::new();
        for i in 0..20 {
            let service = service.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                service
                    .update(
                        &id,
                        CasePatch {
                            notes: Some(format!("note {i}")),
                            ..CasePatch::default()
                        },
                    )
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let case = service.get_full(&id).await.unwrap();
        assert_eq!(case.notes.len(), 20);
    }
}
