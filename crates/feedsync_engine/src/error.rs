//! Error types for the sync engine.

use feedsync_protocol::{Cursor, DecodeError, ParseError};
use feedsync_storage::{CursorStoreError, StorageError};
use std::path::PathBuf;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Result type for page fetches.
pub type FetchResult<T> = Result<T, FetchError>;

/// A page could not be fetched.
///
/// Every transport-level problem lands here; the engine treats them as one
/// category and ends the run.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Network or client error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether an external retry could succeed.
        retryable: bool,
    },

    /// The server answered with a non-success status.
    #[error("server returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The response body could not be parsed into a page.
    #[error("unparseable response body: {0}")]
    Body(#[from] ParseError),
}

impl FetchError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if an external caller could reasonably retry the run.
    ///
    /// The engine itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport { retryable, .. } => *retryable,
            FetchError::Status { status } => *status == 429 || *status >= 500,
            FetchError::Body(_) => false,
        }
    }
}

/// Errors that end a sync run.
#[derive(Error, Debug)]
pub enum SyncError {
    /// A page could not be fetched.
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// An event in the current page failed validation.
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// The content store rejected a mutation.
    #[error("store error: {0}")]
    Store(#[from] StorageError),

    /// The committed cursor cannot be read back.
    #[error("corrupt cursor state at {}: {detail}", path.display())]
    CorruptState {
        /// Location of the cursor slot.
        path: PathBuf,
        /// What was found.
        detail: String,
    },

    /// The cursor slot could not be read or written.
    #[error("cursor store error: {0}")]
    CursorStore(#[source] std::io::Error),

    /// The feed handed back a continuation behind the committed cursor.
    #[error("feed cursor regressed from {current} to {next}")]
    CursorRegression {
        /// The committed cursor.
        current: Cursor,
        /// The continuation the page declared.
        next: Cursor,
    },

    /// The feed handed back the cursor the page was fetched at, so the
    /// loop would request the same page forever.
    #[error("feed cursor stalled at {cursor}")]
    CursorStalled {
        /// The committed cursor.
        cursor: Cursor,
    },

    /// A run is already in progress on this engine.
    #[error("a sync run is already in progress")]
    AlreadyRunning,
}

impl SyncError {
    /// Returns a stable short name for the error category.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::Fetch(_) => "fetch",
            SyncError::Decode(DecodeError::MalformedEvent { .. }) => "malformed_event",
            SyncError::Decode(DecodeError::UnknownKind { .. }) => "unknown_kind",
            SyncError::Store(_) => "store",
            SyncError::CorruptState { .. } => "corrupt_state",
            SyncError::CursorStore(_) => "cursor_store",
            SyncError::CursorRegression { .. } => "cursor_regression",
            SyncError::CursorStalled { .. } => "cursor_stalled",
            SyncError::AlreadyRunning => "already_running",
        }
    }
}

impl From<CursorStoreError> for SyncError {
    fn from(err: CursorStoreError) -> Self {
        match err {
            CursorStoreError::Corrupt { path, detail } => SyncError::CorruptState { path, detail },
            CursorStoreError::Io(e) => SyncError::CursorStore(e),
        }
    }
}
