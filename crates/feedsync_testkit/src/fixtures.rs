//! Test fixtures and installation helpers.
//!
//! Provides page builders, temporary on-disk installations and
//! ready-made engines for common test scenarios.

use feedsync_engine::{ScriptedFetcher, SyncConfig, SyncEngine};
use feedsync_protocol::{Cursor, FeedKind, Page, RawEvent, TableDecoder};
use feedsync_storage::{
    DirectoryContentStore, FileCursorStore, InstallationLock, MemoryContentStore,
    MemoryCursorStore,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Engine over in-memory stores and a scripted fetcher.
pub type MemoryEngine =
    SyncEngine<ScriptedFetcher, TableDecoder, MemoryContentStore, MemoryCursorStore>;

/// Returns the `(upsert, remove)` kind names a feed uses on the wire.
pub fn kind_names(feed: FeedKind) -> (&'static str, &'static str) {
    match feed {
        FeedKind::Editorial => ("published", "unpublished"),
        FeedKind::Recommendations => ("recommend", "unrecommend"),
    }
}

/// Renders the document a feed would carry for `subject_id`.
pub fn article_document(subject_id: &str, body: &str) -> String {
    format!("<article articleId=\"{subject_id}\">{body}</article>")
}

/// Builds pages using one feed's vocabulary.
///
/// ```rust,ignore
/// let page = PageBuilder::new(FeedKind::Editorial)
///     .upsert(1, "A", "<x/>")
///     .remove(2, "B")
///     .next(100)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct PageBuilder {
    feed: FeedKind,
    events: Vec<RawEvent>,
    next_cursor: Option<Cursor>,
}

impl PageBuilder {
    /// Starts an empty page with no continuation.
    pub fn new(feed: FeedKind) -> Self {
        Self {
            feed,
            events: Vec::new(),
            next_cursor: None,
        }
    }

    /// Adds an upsert event carrying `document` verbatim.
    pub fn upsert(mut self, id: u64, subject_id: &str, document: &str) -> Self {
        let (upsert, _) = kind_names(self.feed);
        self.events
            .push(RawEvent::new(id.to_string(), upsert).with_subject(subject_id, document));
        self
    }

    /// Adds a remove event.
    pub fn remove(mut self, id: u64, subject_id: &str) -> Self {
        let (_, remove) = kind_names(self.feed);
        self.events.push(
            RawEvent::new(id.to_string(), remove)
                .with_subject(subject_id, article_document(subject_id, "")),
        );
        self
    }

    /// Adds an arbitrary raw event.
    pub fn event(mut self, event: RawEvent) -> Self {
        self.events.push(event);
        self
    }

    /// Declares a continuation.
    pub fn next(mut self, cursor: u64) -> Self {
        self.next_cursor = Some(Cursor::new(cursor));
        self
    }

    /// Finishes the page.
    pub fn build(self) -> Page {
        Page::new(self.events, self.next_cursor)
    }
}

/// Creates an engine over in-memory stores that serves `pages` in order.
pub fn memory_engine(feed: FeedKind, pages: Vec<Page>) -> MemoryEngine {
    SyncEngine::new(
        SyncConfig::new(feed.default_page_limit()),
        ScriptedFetcher::with_pages(pages),
        feed.decoder(),
        MemoryContentStore::new(),
        MemoryCursorStore::new(),
    )
}

/// An installation laid out in a temporary directory.
///
/// The directory is removed when the value is dropped.
pub struct TempInstallation {
    temp_dir: TempDir,
    state_dir: PathBuf,
    store_dir: PathBuf,
}

impl TempInstallation {
    /// Creates an empty installation.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let state_dir = temp_dir.path().join("state");
        let store_dir = temp_dir.path().join("store");
        Self {
            temp_dir,
            state_dir,
            store_dir,
        }
    }

    /// Root of the installation.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Directory holding the cursor slot and the lock.
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Directory holding stored records.
    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    /// Path of the cursor slot.
    pub fn cursor_path(&self) -> PathBuf {
        self.state_dir.join("last-id")
    }

    /// Opens the cursor slot.
    pub fn cursor_store(&self) -> FileCursorStore {
        FileCursorStore::open(&self.cursor_path()).expect("Failed to open cursor slot")
    }

    /// Opens the record directory.
    pub fn content_store(&self) -> DirectoryContentStore {
        DirectoryContentStore::open(&self.store_dir).expect("Failed to open content store")
    }

    /// Takes the installation lock.
    pub fn lock(&self) -> InstallationLock {
        InstallationLock::acquire(&self.state_dir).expect("Failed to acquire installation lock")
    }

    /// Writes raw bytes into the cursor slot.
    pub fn write_cursor_raw(&self, contents: &[u8]) {
        std::fs::create_dir_all(&self.state_dir).expect("Failed to create state directory");
        std::fs::write(self.cursor_path(), contents).expect("Failed to write cursor slot");
    }
}

impl Default for TempInstallation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedsync_storage::{ContentStore, CursorStore};

    #[test]
    fn page_builder_uses_feed_vocabulary() {
        let page = PageBuilder::new(FeedKind::Recommendations)
            .upsert(1, "A", "<a/>")
            .remove(2, "B")
            .next(2)
            .build();

        assert_eq!(page.events[0].kind, "recommend");
        assert_eq!(page.events[1].kind, "unrecommend");
        assert_eq!(page.next_cursor, Some(Cursor::new(2)));
    }

    #[test]
    fn memory_engine_runs_builder_pages() {
        let engine = memory_engine(
            FeedKind::Editorial,
            vec![
                PageBuilder::new(FeedKind::Editorial)
                    .upsert(1, "A", "<x/>")
                    .remove(2, "B")
                    .next(100)
                    .build(),
                PageBuilder::new(FeedKind::Editorial).build(),
            ],
        );

        let report = engine.run().unwrap();
        assert_eq!(report.actions_processed, 2);
        assert_eq!(engine.store().get("A").unwrap().unwrap().document, b"<x/>");
    }

    #[test]
    fn temp_installation_layout() {
        let install = TempInstallation::new();
        install.cursor_store().save(&Cursor::new(5)).unwrap();
        install.content_store().upsert("A", b"<a/>", 5).unwrap();

        assert!(install.cursor_path().starts_with(install.root()));
        assert_eq!(
            std::fs::read_to_string(install.cursor_path()).unwrap(),
            "5\n"
        );
        assert!(install.store_dir().join("A.rec").exists());
        let _lock = install.lock();
    }
}
