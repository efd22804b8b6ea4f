//! Authentication errors.

use record_store::StoreError;

/// Errors from the authentication layer.
///
/// Every variant fails closed: the caller terminates the request, no retry.
/// Only `Store` indicates a fault rather than a rejection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Staff credentials did not match.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Source is locked out after repeated failures.
    #[error("too many login attempts, retry in {retry_after_secs}s")]
    LockedOut { retry_after_secs: u64 },

    /// No cases exist for this email; no code will be issued.
    #[error("no cases found for this email")]
    UnknownIdentity,

    /// Submitted code is malformed or does not match the stored one.
    #[error("invalid one-time code")]
    InvalidCode,

    /// The stored code matched but its validity window has passed.
    #[error("one-time code has expired")]
    ExpiredCode,

    /// Token is missing, malformed, tampered, or on the wrong plane.
    #[error("invalid token")]
    InvalidToken,

    /// Token was valid once but its validity window has passed.
    #[error("token has expired")]
    ExpiredToken,

    /// The record store failed underneath us.
    #[error(transparent)]
    Store(#[from] StoreError),
}
