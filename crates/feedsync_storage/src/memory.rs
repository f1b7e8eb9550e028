//! In-memory content store for testing.

use crate::content::{ContentStore, Record};
use crate::error::StorageResult;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// An in-memory content store.
///
/// This store keeps all records in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Dry runs that should not touch the filesystem
///
/// Keys are arbitrary strings; only the directory backend restricts them.
///
/// # Example
///
/// ```rust
/// use feedsync_storage::{ContentStore, MemoryContentStore};
///
/// let store = MemoryContentStore::new();
/// store.upsert("A", b"<x/>", 1).unwrap();
/// assert_eq!(store.get("A").unwrap().unwrap().document, b"<x/>");
/// ```
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    records: RwLock<BTreeMap<String, Record>>,
}

impl MemoryContentStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every record, ordered by subject ID.
    ///
    /// Useful for comparing whole-store state in tests.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Record> {
        self.records.read().values().cloned().collect()
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl ContentStore for MemoryContentStore {
    fn upsert(&self, subject_id: &str, document: &[u8], action_id: u64) -> StorageResult<()> {
        self.records.write().insert(
            subject_id.to_string(),
            Record {
                subject_id: subject_id.to_string(),
                document: document.to_vec(),
                last_action: action_id,
            },
        );
        Ok(())
    }

    fn remove(&self, subject_id: &str) -> StorageResult<()> {
        self.records.write().remove(subject_id);
        Ok(())
    }

    fn exists(&self, subject_id: &str) -> bool {
        self.records.read().contains_key(subject_id)
    }

    fn get(&self, subject_id: &str) -> StorageResult<Option<Record>> {
        Ok(self.records.read().get(subject_id).cloned())
    }

    fn subject_ids(&self) -> StorageResult<Vec<String>> {
        Ok(self.records.read().keys().cloned().collect())
    }
}
