//! Error types shared across the library.
//!
//! Backend failures are not part of this enum: the dispatcher
//! folds them into [`BackendResponse`](crate::backend::BackendResponse) so a
//! failed call never aborts the caller.

use thiserror::Error;

/// Library error
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid setup (API key, endpoint URL, curriculum file)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed request or record; nothing was dispatched or written
    #[error("validation error: {0}")]
    Validation(String),

    /// Lookup outside the configured range
    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind() {
        let err = Error::validation("code review requires a payload");
        assert_eq!(
            err.to_string(),
            "validation error: code review requires a payload"
        );

        let err = Error::not_found("week 9");
        assert_eq!(err.to_string(), "not found: week 9");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io.into();
        assert!(matches!(err, Error::Storage(_)));
    }
}
