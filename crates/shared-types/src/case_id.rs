//! Case identifiers.
//!
//! A case id is opaque, globally unique, and immutable once assigned. The
//! wire format is `C-` followed by uppercase base-36: the creation time in
//! milliseconds plus a 4-character random suffix, e.g. `C-LXK2M91QF3A7`.
//!
//! The format check is deliberately loose (`C-` + non-empty `[A-Z0-9]+`) so
//! that historical ids with different suffix lengths keep validating.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Alphabet for the random suffix (uppercase base-36).
const SUFFIX_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const SUFFIX_LEN: usize = 4;

/// Errors from parsing an externally supplied case id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaseIdError {
    /// Input did not match `C-[A-Z0-9]+`.
    #[error("invalid case id format: {0:?}")]
    InvalidFormat(String),
}

/// An opaque case identifier.
///
/// Construct new ids with [`CaseId::generate`]; parse externally supplied
/// ids with [`CaseId::parse`], which enforces the format before any lookup
/// happens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseId(String);

impl CaseId {
    /// Generate a fresh case id from the given creation time (unix millis).
    ///
    /// Uniqueness comes from the millisecond timestamp plus 4 random
    /// characters; collisions would need two submissions in the same
    /// millisecond drawing the same suffix.
    pub fn generate(unix_millis: u64) -> Self {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
            .collect();
        CaseId(format!("C-{}{}", to_base36_upper(unix_millis), suffix))
    }

    /// Parse and validate an externally supplied case id.
    pub fn parse(input: &str) -> Result<Self, CaseIdError> {
        let rest = input
            .strip_prefix("C-")
            .ok_or_else(|| CaseIdError::InvalidFormat(input.to_string()))?;
        if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit() || b.is_ascii_uppercase()) {
            return Err(CaseIdError::InvalidFormat(input.to_string()));
        }
        Ok(CaseId(input.to_string()))
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn to_base36_upper(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(SUFFIX_ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    // Alphabet bytes are ASCII, so this cannot fail.
    String::from_utf8(digits).unwrap_or_default()
}
