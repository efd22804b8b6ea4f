//! Case engine errors.

use record_store::StoreError;

/// Everything a case operation can fail with.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CaseError {
    /// No case with the given id (or not owned by the caller).
    #[error("case not found")]
    NotFound,

    /// A submission failed validation; each reason is human-readable.
    #[error("invalid submission: {}", reasons.join(", "))]
    InvalidSubmission { reasons: Vec<String> },

    /// An attachment violated the upload policy.
    #[error("file rejected: {reason}")]
    FileRejected { reason: String },

    /// Attachment storage I/O failure.
    #[error("attachment storage: {message}")]
    FileStorage { message: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CaseError {
    pub(crate) fn rejected(reason: impl Into<String>) -> Self {
        Self::FileRejected {
            reason: reason.into(),
        }
    }

    pub(crate) fn storage(err: &std::io::Error) -> Self {
        Self::FileStorage {
            message: err.to_string(),
        }
    }
}
