//! The full client journey: submit a case, request a login code, verify it,
//! use the session, and observe single-use and expiry behavior across the
//! real service wiring.

#[cfg(test)]
mod tests {
    use case_engine::{CaseService, InMemoryAttachmentStore, Submission};
    use casetrack_auth::otp::CaseOwnership;
    use casetrack_auth::session::{Plane, SessionConfig, SessionManager};
    use casetrack_auth::{
        AuthError, CapturingNotifier, IdentityRecord, OtpConfig, OtpService,
    };
    use chrono::{Duration, TimeZone, Utc};
    use record_store::{Collection, InMemoryBackend};
    use shared_types::{EmailAddress, ManualClock};
    use std::sync::Arc;

    struct World {
        cases: Arc<CaseService>,
        otp: OtpService,
        sessions: SessionManager,
        notifier: Arc<CapturingNotifier>,
        clock: ManualClock,
    }

    fn world() -> World {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap());
        let notifier = Arc::new(CapturingNotifier::new());
        let identities =
            Collection::<IdentityRecord>::open("identities", InMemoryBackend::new()).unwrap();
        let case_collection = Collection::open("cases", InMemoryBackend::new()).unwrap();

        let cases = Arc::new(CaseService::new(
            case_collection,
            Arc::new(InMemoryAttachmentStore::new()),
            notifier.clone(),
            Arc::new(clock.clone()),
            EmailAddress::parse("desk@agency.com").unwrap(),
        ));
        let ownership: Arc<dyn CaseOwnership> = cases.clone();
        let otp = OtpService::new(
            identities.clone(),
            ownership,
            notifier.clone(),
            Arc::new(clock.clone()),
            OtpConfig::default(),
        );
        let sessions = SessionManager::new(
            SessionConfig::new("integration-secret"),
            identities,
            Arc::new(clock.clone()),
        );
        World {
            cases,
            otp,
            sessions,
            notifier,
            clock,
        }
    }

    fn submission(email: &str) -> Submission {
        Submission {
            name: Some("Ada Lovelace".to_string()),
            email: Some(email.to_string()),
            service: Some("surveillance".to_string()),
            ..Submission::default()
        }
    }

    #[tokio::test]
    async fn submit_login_reply() {
        let w = world();
        let email = EmailAddress::parse("ada@example.com").unwrap();
        let case_id = w.cases.create(submission("ada@example.com"), Vec::new()).await.unwrap();

        w.otp.issue(&email).await.unwrap();
        let code = w.notifier.last_login_code(&email).unwrap();
        let session = w.otp.verify(&email, &code).await.unwrap();

        let identity = w
            .sessions
            .validate(&session.token, Plane::Client)
            .await
            .unwrap();
        assert_eq!(identity.email, email);

        w.cases.reply(&case_id, &identity.email, "checking in").await.unwrap();
        let case = w.cases.get_full(&case_id).await.unwrap();
        assert_eq!(case.client_replies.len(), 1);
    }

    #[tokio::test]
    async fn no_case_no_code() {
        let w = world();
        let email = EmailAddress::parse("stranger@example.com").unwrap();
        assert_eq!(w.otp.issue(&email).await, Err(AuthError::UnknownIdentity));
        assert!(w.notifier.last_login_code(&email).is_none());
    }

    #[tokio::test]
    async fn code_is_single_use_and_session_expires() {
        let w = world();
        let email = EmailAddress::parse("ada@example.com").unwrap();
        w.cases.create(submission("ada@example.com"), Vec::new()).await.unwrap();

        w.otp.issue(&email).await.unwrap();
        let code = w.notifier.last_login_code(&email).unwrap();
        let session = w.otp.verify(&email, &code).await.unwrap();

        // Second use of the same code fails.
        assert_eq!(
            w.otp.verify(&email, &code).await,
            Err(AuthError::InvalidCode)
        );

        // The session works for 24 hours and not a second longer.
        w.clock.advance(Duration::hours(23));
        assert!(w
            .sessions
            .validate(&session.token, Plane::Client)
            .await
            .is_ok());
        w.clock.advance(Duration::hours(1) + Duration::seconds(1));
        assert_eq!(
            w.sessions.validate(&session.token, Plane::Client).await,
            Err(AuthError::ExpiredToken)
        );
    }

    #[tokio::test]
    async fn reissue_replaces_and_never_appends() {
        let w = world();
        let email = EmailAddress::parse("ada@example.com").unwrap();
        w.cases.create(submission("ada@example.com"), Vec::new()).await.unwrap();

        for _ in 0..5 {
            w.otp.issue(&email).await.unwrap();
        }
        // Five issues, still one identity record.
        let code = w.notifier.last_login_code(&email).unwrap();
        w.otp.verify(&email, &code).await.unwrap();
    }

    #[tokio::test]
    async fn verifying_opens_session_that_survives_reissue_to_others() {
        let w = world();
        let ada = EmailAddress::parse("ada@example.com").unwrap();
        let bob = EmailAddress::parse("bob@example.com").unwrap();
        w.cases.create(submission("ada@example.com"), Vec::new()).await.unwrap();
        w.cases.create(submission("bob@example.com"), Vec::new()).await.unwrap();

        w.otp.issue(&ada).await.unwrap();
        let ada_code = w.notifier.last_login_code(&ada).unwrap();
        let ada_session = w.otp.verify(&ada, &ada_code).await.unwrap();

        // Bob's login does not disturb Ada's session.
        w.otp.issue(&bob).await.unwrap();
        let bob_code = w.notifier.last_login_code(&bob).unwrap();
        w.otp.verify(&bob, &bob_code).await.unwrap();

        assert!(w
            .sessions
            .validate(&ada_session.token, Plane::Client)
            .await
            .is_ok());
    }
}
