//! Core error types for loading configuration and declared resources.
//!
//! All errors are explicit and typed; nothing in here panics.

use std::path::PathBuf;

use thiserror::Error;

/// Core error type for file and document handling.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read file '{path}': {reason}")]
    FileReadFailed { path: PathBuf, reason: String },

    #[error("directory does not exist: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("YAML parse error: {reason}")]
    YamlParseFailed { reason: String },

    #[error("invalid document: {reason}")]
    InvalidDocument { reason: String },
}

impl Error {
    /// Create a file read error.
    pub fn file_read_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::FileReadFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a missing directory error.
    pub fn directory_not_found(path: impl Into<PathBuf>) -> Self {
        Self::DirectoryNotFound { path: path.into() }
    }

    /// Create a YAML parse error.
    pub fn yaml_parse_failed(reason: impl Into<String>) -> Self {
        Self::YamlParseFailed {
            reason: reason.into(),
        }
    }

    /// Create an invalid document error.
    pub fn invalid_document(reason: impl Into<String>) -> Self {
        Self::InvalidDocument {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_read_failed_mentions_path() {
        let err = Error::file_read_failed("/etc/teamsync.yaml", "permission denied");
        let message = err.to_string();
        assert!(message.contains("/etc/teamsync.yaml"));
        assert!(message.contains("permission denied"));
    }

    #[test]
    fn test_invalid_document_display() {
        let err = Error::invalid_document("metadata.name is empty");
        assert_eq!(err.to_string(), "invalid document: metadata.name is empty");
    }
}
