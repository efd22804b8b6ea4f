//! Session Manager: one validation entry point, two token planes.
//!
//! - **Staff**: stateless tokens, base64url(JSON claims) + HMAC-SHA256
//!   signature, 24 h validity, verified by signature and expiry alone. No
//!   server-side revocation list exists for this plane.
//! - **Client**: opaque UUID tokens resolved against the Identities
//!   collection; deleting the record revokes the session.
//!
//! Both planes fail closed and neither slides its expiry on use. Call sites
//! say which plane they expect; a token from the other plane is invalid.

use crate::errors::AuthError;
use crate::identity::{IdentityRecord, IdentityState};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Duration;
use hmac::{Hmac, Mac};
use record_store::Collection;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use shared_types::{Clock, EmailAddress};
use std::sync::Arc;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Which authentication plane a token is expected to belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plane {
    Staff,
    Client,
}

/// Role carried by a validated identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Staff,
    Client,
}

/// The identity a valid token resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub email: EmailAddress,
    pub role: Role,
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// HMAC key for the staff plane.
    pub secret: String,
    /// Staff token validity from issuance.
    pub staff_validity: Duration,
}

impl SessionConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            staff_validity: Duration::hours(24),
        }
    }
}

/// Staff credentials held by the runtime configuration.
///
/// Both fields are compared in constant time so a probe cannot learn how
/// much of a guess matched.
#[derive(Debug, Clone)]
pub struct StaffCredentials {
    pub email: EmailAddress,
    pub password: String,
}

impl StaffCredentials {
    pub fn verify(&self, email: &str, password: &str) -> bool {
        let email_ok = match EmailAddress::parse(email) {
            Ok(candidate) => constant_time_eq(candidate.as_str(), self.email.as_str()),
            Err(_) => false,
        };
        let password_ok = constant_time_eq(password, &self.password);
        email_ok && password_ok
    }
}

/// Constant-time string comparison, padded so length is not an oracle.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let max_len = a.len().max(b.len());
    let mut a_padded = vec![0u8; max_len];
    let mut b_padded = vec![0xFFu8; max_len];
    a_padded[..a.len()].copy_from_slice(a.as_bytes());
    b_padded[..b.len()].copy_from_slice(b.as_bytes());

    let lengths_equal = a.len().ct_eq(&b.len());
    let contents_equal = a_padded.ct_eq(&b_padded);
    (lengths_equal & contents_equal).into()
}

#[derive(Debug, Serialize, Deserialize)]
struct StaffClaims {
    sub: String,
    role: String,
    iat: i64,
    exp: i64,
}

/// Mints staff tokens and validates tokens on either plane.
pub struct SessionManager {
    config: SessionConfig,
    identities: Collection<IdentityRecord>,
    clock: Arc<dyn Clock>,
}

impl SessionManager {
    pub fn new(
        config: SessionConfig,
        identities: Collection<IdentityRecord>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            identities,
            clock,
        }
    }

    /// Mint a signed staff token for `email`.
    pub fn mint_staff(&self, email: &EmailAddress) -> String {
        let now = self.clock.now();
        let claims = StaffClaims {
            sub: email.as_str().to_string(),
            role: "staff".to_string(),
            iat: now.timestamp(),
            exp: (now + self.config.staff_validity).timestamp(),
        };
        // StaffClaims serialization cannot fail: plain strings and ints.
        let payload =
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap_or_default());
        let signature = hex::encode(self.sign(payload.as_bytes()));
        format!("{payload}.{signature}")
    }

    /// Validate a bearer token against the expected plane.
    pub async fn validate(
        &self,
        token: &str,
        plane: Plane,
    ) -> Result<SessionIdentity, AuthError> {
        match plane {
            Plane::Staff => self.validate_staff(token),
            Plane::Client => self.validate_client(token).await,
        }
    }

    fn validate_staff(&self, token: &str) -> Result<SessionIdentity, AuthError> {
        let (payload, signature_hex) = token.split_once('.').ok_or(AuthError::InvalidToken)?;
        let signature = hex::decode(signature_hex).map_err(|_| AuthError::InvalidToken)?;

        let expected = self.sign(payload.as_bytes());
        if !bool::from(expected.ct_eq(&signature)) {
            return Err(AuthError::InvalidToken);
        }

        let claims_bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| AuthError::InvalidToken)?;
        let claims: StaffClaims =
            serde_json::from_slice(&claims_bytes).map_err(|_| AuthError::InvalidToken)?;

        if claims.role != "staff" {
            return Err(AuthError::InvalidToken);
        }
        if claims.exp < self.clock.now().timestamp() {
            return Err(AuthError::ExpiredToken);
        }

        let email = EmailAddress::parse(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        Ok(SessionIdentity {
            email,
            role: Role::Staff,
        })
    }

    async fn validate_client(&self, token: &str) -> Result<SessionIdentity, AuthError> {
        let records = self.identities.read_all().await?;
        let record = records
            .iter()
            .find(|r| matches!(&r.state, IdentityState::Session { token: t, .. } if t == token))
            .ok_or(AuthError::InvalidToken)?;

        if record.expired_at(self.clock.now()) {
            return Err(AuthError::ExpiredToken);
        }

        Ok(SessionIdentity {
            email: record.email.clone(),
            role: Role::Client,
        })
    }

    /// Revoke a client session by deleting its store record. The staff
    /// plane has no equivalent; signed tokens simply expire.
    pub async fn revoke_client(&self, token: &str) -> Result<bool, AuthError> {
        let token = token.to_string();
        let removed = self
            .identities
            .update(move |records| {
                let before = records.len();
                records.retain(|r| {
                    !matches!(&r.state, IdentityState::Session { token: t, .. } if *t == token)
                });
                before != records.len()
            })
            .await?;
        Ok(removed)
    }

    fn sign(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(self.config.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}
