//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for content store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type for cursor store operations.
pub type CursorStoreResult<T> = Result<T, CursorStoreError>;

/// Errors that can occur in the content store or the installation lock.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The subject ID cannot be used as a storage key.
    #[error("invalid subject ID {subject_id:?}: {reason}")]
    InvalidSubject {
        /// The rejected subject ID.
        subject_id: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A stored record could not be read back.
    #[error("record corrupted: {0}")]
    Corrupted(String),

    /// Another process holds the installation lock.
    #[error("installation is locked by another process: {}", .0.display())]
    Locked(PathBuf),
}

/// Errors that can occur in the cursor store.
#[derive(Debug, Error)]
pub enum CursorStoreError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The stored value exists but cannot be interpreted.
    #[error("cursor slot {} is corrupt: {detail}", path.display())]
    Corrupt {
        /// Location of the slot.
        path: PathBuf,
        /// What was found.
        detail: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CursorStoreError::Corrupt {
            path: PathBuf::from("/state/cursor"),
            detail: "\"abc\" is not a cursor".into(),
        };
        assert!(err.to_string().contains("/state/cursor"));
        assert!(err.to_string().contains("abc"));

        let err = StorageError::InvalidSubject {
            subject_id: "../etc".into(),
            reason: "contains a path separator",
        };
        assert!(err.to_string().contains("../etc"));
    }
}
