//! Record Store errors.

/// Errors that can occur against a [`crate::Collection`].
///
/// Callers must not treat any of these as "collection is empty"; an I/O or
/// decode failure on a collection that has data is a persistence fault, not
/// an absence of records.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Underlying I/O failed while loading or persisting.
    #[error("store I/O error: {message}")]
    Io { message: String },

    /// The persisted bytes could not be decoded.
    #[error("store corruption: {message}")]
    Corrupt { message: String },

    /// Records could not be encoded for persisting.
    #[error("store serialization error: {message}")]
    Serialization { message: String },

    /// The collection task has shut down.
    #[error("collection is closed")]
    Closed,
}

impl StoreError {
    pub(crate) fn io(err: &std::io::Error) -> Self {
        StoreError::Io {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_message() {
        let err = StoreError::Io {
            message: "disk failure".to_string(),
        };
        assert!(err.to_string().contains("disk failure"));
    }
}
