//! Content store trait definition.

use crate::error::{StorageError, StorageResult};
use std::sync::Arc;

/// Longest subject ID accepted as a storage key.
const MAX_SUBJECT_ID_LEN: usize = 200;

/// A stored subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Subject ID (the key).
    pub subject_id: String,
    /// Raw document, exactly as delivered.
    pub document: Vec<u8>,
    /// ID of the action that last wrote this record.
    pub last_action: u64,
}

/// A key-addressed store of subject records.
///
/// Content stores are **opaque document stores**: they never look inside a
/// document. The sync loop relies on both mutations being idempotent, so it
/// never needs to check existence before writing.
///
/// # Invariants
///
/// - `upsert` creates or overwrites; applying it twice equals applying it once
/// - `remove` deletes if present and succeeds silently if absent
/// - `exists` is for diagnostics only
/// - Stores must be `Send + Sync`
///
/// # Implementors
///
/// - [`super::MemoryContentStore`] - For testing
/// - [`super::DirectoryContentStore`] - One file per record
pub trait ContentStore: Send + Sync {
    /// Creates or overwrites the record for `subject_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the subject ID is not a valid key or the write
    /// fails.
    fn upsert(&self, subject_id: &str, document: &[u8], action_id: u64) -> StorageResult<()>;

    /// Deletes the record for `subject_id` if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the subject ID is not a valid key or the delete
    /// fails. A missing record is not an error.
    fn remove(&self, subject_id: &str) -> StorageResult<()>;

    /// Returns true if a record exists for `subject_id`.
    fn exists(&self, subject_id: &str) -> bool;

    /// Reads the record for `subject_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record exists but cannot be read.
    fn get(&self, subject_id: &str) -> StorageResult<Option<Record>>;

    /// Lists every stored subject ID in ascending order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be enumerated.
    fn subject_ids(&self) -> StorageResult<Vec<String>>;
}

impl<S: ContentStore + ?Sized> ContentStore for Arc<S> {
    fn upsert(&self, subject_id: &str, document: &[u8], action_id: u64) -> StorageResult<()> {
        (**self).upsert(subject_id, document, action_id)
    }

    fn remove(&self, subject_id: &str) -> StorageResult<()> {
        (**self).remove(subject_id)
    }

    fn exists(&self, subject_id: &str) -> bool {
        (**self).exists(subject_id)
    }

    fn get(&self, subject_id: &str) -> StorageResult<Option<Record>> {
        (**self).get(subject_id)
    }

    fn subject_ids(&self) -> StorageResult<Vec<String>> {
        (**self).subject_ids()
    }
}

/// Checks that a subject ID can be used as a storage key.
///
/// Keys are restricted to ASCII letters, digits, `-`, `_` and `.`, must not
/// start with `.`, and are at most 200 bytes long. This is the directory
/// backend's file-name rule; the in-memory store accepts any string.
///
/// # Errors
///
/// Returns [`StorageError::InvalidSubject`] describing the first violation.
pub fn validate_subject_id(subject_id: &str) -> StorageResult<()> {
    let reject = |reason: &'static str| -> StorageResult<()> {
        Err(StorageError::InvalidSubject {
            subject_id: subject_id.to_string(),
            reason,
        })
    };

    if subject_id.is_empty() {
        return reject("empty");
    }
    if subject_id.len() > MAX_SUBJECT_ID_LEN {
        return reject("too long");
    }
    if subject_id.starts_with('.') {
        return reject("starts with '.'");
    }
    if !subject_id
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
    {
        return reject("contains characters outside [A-Za-z0-9._-]");
    }

    Ok(())
}
