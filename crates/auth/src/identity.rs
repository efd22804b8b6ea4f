//! Identity records.
//!
//! One record per email in the Identities collection. The state enum is the
//! whole point: an identity holds either a pending one-time code or a live
//! session, never both, and never more than one of either. Issuing a code
//! or opening a session replaces the record wholesale.

use serde::{Deserialize, Serialize};
use shared_types::{EmailAddress, Timestamp};

/// What the identity currently holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum IdentityState {
    /// A one-time code awaiting verification.
    #[serde(rename_all = "camelCase")]
    PendingCode {
        code: String,
        issued_at: Timestamp,
        expires_at: Timestamp,
    },
    /// A live client session (the code that opened it is gone).
    #[serde(rename_all = "camelCase")]
    Session {
        token: String,
        issued_at: Timestamp,
        expires_at: Timestamp,
    },
}

/// A record in the Identities collection, keyed by email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
    pub email: EmailAddress,
    #[serde(flatten)]
    pub state: IdentityState,
}

impl IdentityRecord {
    /// Whether this record's state has outlived its validity window.
    pub fn expired_at(&self, now: Timestamp) -> bool {
        let expires_at = match &self.state {
            IdentityState::PendingCode { expires_at, .. } => expires_at,
            IdentityState::Session { expires_at, .. } => expires_at,
        };
        *expires_at < now
    }
}
