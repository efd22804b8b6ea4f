//! Normalized email addresses.
//!
//! Identities are keyed by email, so every address is normalized (trimmed,
//! lowercased) at the boundary. Comparing two `EmailAddress` values is the
//! identity-equality check used by the OTP and session layers.

use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_LEN: usize = 255;

/// Errors from parsing an email address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmailError {
    #[error("email address is empty")]
    Empty,
    #[error("email address too long ({0} > {MAX_LEN})")]
    TooLong(usize),
    #[error("email address is malformed")]
    Malformed,
}

/// A validated, normalized (lowercase) email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Parse and normalize an address.
    ///
    /// The shape check matches the original intake rule: one `@`, non-empty
    /// local part, a domain containing a dot, no whitespace. This is an
    /// intake filter, not RFC 5321 validation.
    pub fn parse(input: &str) -> Result<Self, EmailError> {
        let normalized = input.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(EmailError::Empty);
        }
        if normalized.len() > MAX_LEN {
            return Err(EmailError::TooLong(normalized.len()));
        }
        if normalized.chars().any(char::is_whitespace) {
            return Err(EmailError::Malformed);
        }
        let (local, domain) = normalized.split_once('@').ok_or(EmailError::Malformed)?;
        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(EmailError::Malformed);
        }
        let (host, tld) = domain.rsplit_once('.').ok_or(EmailError::Malformed)?;
        if host.is_empty() || tld.is_empty() {
            return Err(EmailError::Malformed);
        }
        Ok(EmailAddress(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
