//! Subsystem wiring: open the collections, construct the services, hand the
//! gateway its state.

use crate::config::AppConfig;
use anyhow::{Context, Result};
use case_engine::{
    AssetReclaim, AttachmentStore, Case, CaseService, FsAttachmentStore, ReclaimService,
};
use casetrack_auth::otp::CaseOwnership;
use casetrack_auth::session::{SessionConfig, SessionManager, StaffCredentials};
use casetrack_auth::{
    IdentityRecord, LogNotifier, LoginGuard, LoginGuardConfig, Notifier, OtpConfig, OtpService,
};
use casetrack_gateway::AppState;
use record_store::{Collection, JsonFileBackend};
use shared_types::{Clock, SystemClock};
use std::sync::Arc;
use tracing::info;

pub struct Subsystems {
    pub state: AppState,
    pub guard: Arc<LoginGuard>,
}

pub fn build(config: &AppConfig) -> Result<Subsystems> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);

    let cases_path = config.data_dir.join("cases.json");
    let reclaims_path = config.data_dir.join("asset-reclaims.json");
    let identities_path = config.data_dir.join("identities.json");

    let cases_collection = Collection::<Case>::open("cases", JsonFileBackend::new(&cases_path))
        .with_context(|| format!("opening cases collection at {}", cases_path.display()))?;
    let reclaims_collection = Collection::<AssetReclaim>::open(
        "asset-reclaims",
        JsonFileBackend::new(&reclaims_path),
    )
    .with_context(|| {
        format!(
            "opening asset-reclaims collection at {}",
            reclaims_path.display()
        )
    })?;
    let identities = Collection::<IdentityRecord>::open(
        "identities",
        JsonFileBackend::new(&identities_path),
    )
    .with_context(|| {
        format!(
            "opening identities collection at {}",
            identities_path.display()
        )
    })?;

    // Both intake channels write under the same uploads root.
    let files: Arc<dyn AttachmentStore> = Arc::new(FsAttachmentStore::new(&config.uploads_dir));

    let cases = Arc::new(CaseService::new(
        cases_collection,
        files.clone(),
        notifier.clone(),
        clock.clone(),
        config.staff_inbox.clone(),
    ));
    let reclaims = Arc::new(ReclaimService::new(
        reclaims_collection,
        files,
        clock.clone(),
    ));
    let ownership: Arc<dyn CaseOwnership> = cases.clone();

    let otp = Arc::new(OtpService::new(
        identities.clone(),
        ownership,
        notifier.clone(),
        clock.clone(),
        OtpConfig::default(),
    ));
    let sessions = Arc::new(SessionManager::new(
        SessionConfig::new(config.token_secret.clone()),
        identities,
        clock.clone(),
    ));
    let guard = Arc::new(LoginGuard::new(LoginGuardConfig::default(), clock));
    let staff = Arc::new(StaffCredentials {
        email: config.admin_email.clone(),
        password: config.admin_password.clone(),
    });

    info!(
        data_dir = %config.data_dir.display(),
        uploads_dir = %config.uploads_dir.display(),
        "subsystems wired"
    );

    Ok(Subsystems {
        state: AppState {
            cases,
            reclaims,
            otp,
            sessions,
            guard: guard.clone(),
            notifier,
            staff,
        },
        guard,
    })
}
