//! One-time-code issuance and verification.
//!
//! Issuing replaces (never appends to) any prior record for the email, so
//! a second request instantly invalidates the first code. Verification
//! consumes the code by swapping the identity record to a session inside a
//! single store update; the swap and the code check happen in the same
//! queued operation, so two racing verifications cannot both succeed.

use crate::errors::AuthError;
use crate::identity::{IdentityRecord, IdentityState};
use crate::notify::{notify_best_effort, Notification, Notifier};
use async_trait::async_trait;
use chrono::Duration;
use rand::Rng;
use record_store::{Collection, StoreError};
use shared_types::{Clock, EmailAddress, Timestamp};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Digits in a code.
const CODE_LEN: usize = 6;

/// Authorization gate: codes are only issued to emails that own cases.
#[async_trait]
pub trait CaseOwnership: Send + Sync {
    async fn owns_cases(&self, email: &EmailAddress) -> Result<bool, StoreError>;
}

/// Validity windows.
#[derive(Debug, Clone)]
pub struct OtpConfig {
    /// How long an issued code stays valid.
    pub code_validity: Duration,
    /// Fixed session duration granted on successful verification.
    pub session_validity: Duration,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            code_validity: Duration::minutes(10),
            session_validity: Duration::hours(24),
        }
    }
}

/// A client session opened by a verified code.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSession {
    pub email: EmailAddress,
    pub token: String,
    pub expires_at: Timestamp,
}

/// Issues and verifies one-time codes against the Identities collection.
pub struct OtpService {
    identities: Collection<IdentityRecord>,
    ownership: Arc<dyn CaseOwnership>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    config: OtpConfig,
}

impl OtpService {
    pub fn new(
        identities: Collection<IdentityRecord>,
        ownership: Arc<dyn CaseOwnership>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        config: OtpConfig,
    ) -> Self {
        Self {
            identities,
            ownership,
            notifier,
            clock,
            config,
        }
    }

    /// Issue a fresh code for `email`.
    ///
    /// Fails with [`AuthError::UnknownIdentity`] unless the email owns at
    /// least one case. The code goes out through the Notifier only; the
    /// return value carries nothing a caller could echo to a response.
    pub async fn issue(&self, email: &EmailAddress) -> Result<(), AuthError> {
        if !self.ownership.owns_cases(email).await? {
            return Err(AuthError::UnknownIdentity);
        }

        let code = generate_code();
        let now = self.clock.now();
        let expires_at = now + self.config.code_validity;

        let record = IdentityRecord {
            email: email.clone(),
            state: IdentityState::PendingCode {
                code: code.clone(),
                issued_at: now,
                expires_at,
            },
        };

        let target = email.clone();
        self.identities
            .update(move |records| {
                // Replace, never append: at most one live record per email.
                records.retain(|r| r.email != target);
                records.push(record);
            })
            .await?;

        info!(email = %email, "one-time code issued");

        // Delivery happens after the durable write and never blocks or
        // fails the issuance.
        notify_best_effort(
            self.notifier.as_ref(),
            Notification::LoginCode {
                to: email.clone(),
                code,
                expires_at,
            },
        )
        .await;

        Ok(())
    }

    /// Verify a submitted code and open a session.
    ///
    /// Input is normalized to digits; anything but exactly six digits is
    /// rejected before the store is touched. On success the identity record
    /// becomes a session in the same queued update that checked the code,
    /// single use by construction. On failure the stored state is untouched,
    /// so the client may retry until expiry.
    pub async fn verify(
        &self,
        email: &EmailAddress,
        submitted: &str,
    ) -> Result<ClientSession, AuthError> {
        let digits: String = submitted.chars().filter(char::is_ascii_digit).collect();
        if digits.len() != CODE_LEN {
            return Err(AuthError::InvalidCode);
        }

        let now = self.clock.now();
        let session = ClientSession {
            email: email.clone(),
            token: Uuid::new_v4().to_string(),
            expires_at: now + self.config.session_validity,
        };

        let target = email.clone();
        let granted = session.clone();
        let outcome = self
            .identities
            .update(move |records| {
                let slot = records.iter_mut().find(|r| {
                    r.email == target
                        && matches!(&r.state, IdentityState::PendingCode { code, .. } if *code == digits)
                });

                let record = match slot {
                    Some(record) => record,
                    None => return Err(AuthError::InvalidCode),
                };

                if record.expired_at(now) {
                    return Err(AuthError::ExpiredCode);
                }

                record.state = IdentityState::Session {
                    token: granted.token.clone(),
                    issued_at: now,
                    expires_at: granted.expires_at,
                };
                Ok(())
            })
            .await?;

        outcome?;
        info!(email = %email, "one-time code verified, session opened");
        Ok(session)
    }
}

fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}
