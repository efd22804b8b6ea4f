//! Restart behavior over the file-backed store: what was durable before a
//! process exit is readable after it.

#[cfg(test)]
mod tests {
    use case_engine::{Case, CasePatch, CaseService, InMemoryAttachmentStore, Submission};
    use casetrack_auth::session::{Plane, SessionConfig, SessionManager};
    use casetrack_auth::{CapturingNotifier, IdentityRecord, OtpConfig, OtpService};
    use casetrack_auth::otp::CaseOwnership;
    use record_store::{Collection, JsonFileBackend};
    use shared_types::{Clock, EmailAddress, SystemClock};
    use std::path::Path;
    use std::sync::Arc;

    fn service(dir: &Path, notifier: Arc<CapturingNotifier>) -> Arc<CaseService> {
        let collection =
            Collection::<Case>::open("cases", JsonFileBackend::new(dir.join("cases.json")))
                .unwrap();
        Arc::new(CaseService::new(
            collection,
            Arc::new(InMemoryAttachmentStore::new()),
            notifier,
            Arc::new(SystemClock),
            EmailAddress::parse("desk@agency.com").unwrap(),
        ))
    }

    fn submission(email: &str) -> Submission {
        Submission {
            name: Some("Ada".to_string()),
            email: Some(email.to_string()),
            ..Submission::default()
        }
    }

    #[tokio::test]
    async fn cases_survive_restart_with_logs_intact() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Arc::new(CapturingNotifier::new());

        let case_id = {
            let service = service(dir.path(), notifier.clone());
            let id = service
                .create(submission("ada@example.com"), Vec::new())
                .await
                .unwrap();
            service
                .update(
                    &id,
                    CasePatch {
                        status: Some("in-progress".to_string()),
                        notes: Some("first pass".to_string()),
                        updates: Vec::new(),
                    },
                )
                .await
                .unwrap();
            id
        };

        // Fresh handles on the same files.
        let service = service(dir.path(), notifier);
        let case = service.get_full(&case_id).await.unwrap();
        assert_eq!(case.status, "in-progress");
        assert_eq!(case.updates.len(), 1);
        assert_eq!(case.notes.len(), 1);
    }

    #[tokio::test]
    async fn client_session_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Arc::new(CapturingNotifier::new());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let email = EmailAddress::parse("ada@example.com").unwrap();
        let identities_path = dir.path().join("identities.json");

        let token = {
            let cases = service(dir.path(), notifier.clone());
            cases
                .create(submission("ada@example.com"), Vec::new())
                .await
                .unwrap();

            let identities = Collection::<IdentityRecord>::open(
                "identities",
                JsonFileBackend::new(&identities_path),
            )
            .unwrap();
            let ownership: Arc<dyn CaseOwnership> = cases;
            let otp = OtpService::new(
                identities,
                ownership,
                notifier.clone(),
                clock.clone(),
                OtpConfig::default(),
            );
            otp.issue(&email).await.unwrap();
            let code = notifier.last_login_code(&email).unwrap();
            otp.verify(&email, &code).await.unwrap().token
        };

        // New process: a fresh session manager over the reopened collection
        // still honors the token.
        let identities = Collection::<IdentityRecord>::open(
            "identities",
            JsonFileBackend::new(&identities_path),
        )
        .unwrap();
        let sessions = SessionManager::new(SessionConfig::new("secret"), identities, clock);
        let identity = sessions.validate(&token, Plane::Client).await.unwrap();
        assert_eq!(identity.email, email);
    }

    #[tokio::test]
    async fn empty_data_dir_starts_clean() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), Arc::new(CapturingNotifier::new()));
        let page = service
            .list(&case_engine::CaseQuery::default())
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 0);
    }
}
