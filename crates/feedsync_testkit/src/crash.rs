//! Fault injection for crash and failure testing.
//!
//! The sync loop must leave an installation resumable after a failure at
//! any point. These wrappers make the content store or the cursor slot fail
//! at a chosen step, standing in for a crash at that point.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use feedsync_testkit::crash::FailingStore;
//!
//! let store = Arc::new(MemoryContentStore::new());
//! let failing = FailingStore::new(Arc::clone(&store));
//! failing.fail_after(3);
//! // A run over `failing` stops on the fourth mutation; a second run over
//! // `store` must converge to the same state as an uninterrupted run.
//! ```

use feedsync_protocol::Cursor;
use feedsync_storage::{
    ContentStore, CursorStore, CursorStoreError, CursorStoreResult, Record, StorageError,
    StorageResult,
};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

fn simulated(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("simulated crash during {what}"))
}

/// A content store wrapper that fails every mutation after a threshold.
pub struct FailingStore<S: ContentStore> {
    inner: S,
    fail_after: AtomicUsize,
    mutations: AtomicUsize,
    crashed: AtomicBool,
}

impl<S: ContentStore> FailingStore<S> {
    /// Wraps `inner`; no failures until [`FailingStore::fail_after`] is set.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_after: AtomicUsize::new(usize::MAX),
            mutations: AtomicUsize::new(0),
            crashed: AtomicBool::new(false),
        }
    }

    /// Lets `count` more mutations through, then fails every later one.
    pub fn fail_after(&self, count: usize) {
        self.fail_after
            .store(self.mutations.load(Ordering::SeqCst) + count, Ordering::SeqCst);
    }

    /// Returns the number of mutations that reached the inner store.
    pub fn mutations(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    /// Returns whether a failure was injected.
    pub fn has_crashed(&self) -> bool {
        self.crashed.load(Ordering::SeqCst)
    }

    /// Clears the failure threshold.
    pub fn reset(&self) {
        self.fail_after.store(usize::MAX, Ordering::SeqCst);
        self.crashed.store(false, Ordering::SeqCst);
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn admit(&self, what: &str) -> StorageResult<()> {
        if self.mutations.load(Ordering::SeqCst) >= self.fail_after.load(Ordering::SeqCst) {
            self.crashed.store(true, Ordering::SeqCst);
            return Err(StorageError::Io(simulated(what)));
        }
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl<S: ContentStore> ContentStore for FailingStore<S> {
    fn upsert(&self, subject_id: &str, document: &[u8], action_id: u64) -> StorageResult<()> {
        self.admit("upsert")?;
        self.inner.upsert(subject_id, document, action_id)
    }

    fn remove(&self, subject_id: &str) -> StorageResult<()> {
        self.admit("remove")?;
        self.inner.remove(subject_id)
    }

    fn exists(&self, subject_id: &str) -> bool {
        self.inner.exists(subject_id)
    }

    fn get(&self, subject_id: &str) -> StorageResult<Option<Record>> {
        self.inner.get(subject_id)
    }

    fn subject_ids(&self) -> StorageResult<Vec<String>> {
        self.inner.subject_ids()
    }
}

/// A cursor store wrapper that fails a chosen save.
///
/// A failed save leaves the inner slot untouched, like a crash between
/// applying a page and committing its cursor.
pub struct CrashingCursorStore<C: CursorStore> {
    inner: C,
    crash_on_save: AtomicUsize,
    saves: AtomicUsize,
}

impl<C: CursorStore> CrashingCursorStore<C> {
    /// Wraps `inner`; no failures until [`CrashingCursorStore::crash_on_save`] is set.
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            crash_on_save: AtomicUsize::new(usize::MAX),
            saves: AtomicUsize::new(0),
        }
    }

    /// Fails the `n`th save attempt from now (1-based) and every one after it.
    pub fn crash_on_save(&self, n: usize) {
        let n = n.max(1);
        self.crash_on_save
            .store(self.saves.load(Ordering::SeqCst) + n, Ordering::SeqCst);
    }

    /// Returns the number of save attempts.
    pub fn save_attempts(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: CursorStore> CursorStore for CrashingCursorStore<C> {
    fn load(&self) -> CursorStoreResult<Option<Cursor>> {
        self.inner.load()
    }

    fn save(&self, cursor: &Cursor) -> CursorStoreResult<()> {
        let attempt = self.saves.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt >= self.crash_on_save.load(Ordering::SeqCst) {
            return Err(CursorStoreError::Io(simulated("cursor save")));
        }
        self.inner.save(cursor)
    }
}
