//! Sync engine state machine.

use crate::config::SyncConfig;
use crate::dispatcher::{Applied, Dispatcher};
use crate::error::{SyncError, SyncResult};
use crate::events::{ProgressSink, SyncEvent, TracingSink};
use crate::fetcher::PageFetcher;
use feedsync_protocol::{Action, Cursor, EventDecoder, Page};
use feedsync_storage::{ContentStore, CursorStore};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The current phase of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// No run has started.
    Idle,
    /// Waiting for the next page.
    FetchingPage,
    /// Decoding and applying the current page.
    ApplyingPage,
    /// Saving the page's continuation cursor.
    CommittingCursor,
    /// The last run ended without error.
    Done,
    /// The last run ended with an error.
    Failed,
}

impl SyncPhase {
    /// Returns true while a run is in progress.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SyncPhase::FetchingPage | SyncPhase::ApplyingPage | SyncPhase::CommittingCursor
        )
    }

    /// Returns true if a new run may start from this phase.
    pub fn can_start(&self) -> bool {
        !self.is_active()
    }
}

/// Progress of the current (or last) run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncState {
    /// Last committed cursor, `None` before the first commit.
    pub cursor: Option<Cursor>,
    /// Actions processed in this run.
    pub actions_processed: u64,
}

/// Statistics accumulated across runs of one engine.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Runs that ended without error.
    pub runs_completed: u64,
    /// Runs that ended with an error.
    pub runs_failed: u64,
    /// Pages fetched.
    pub pages_fetched: u64,
    /// Actions that mutated (or confirmed) store state.
    pub actions_applied: u64,
    /// Actions skipped as repeats within a run.
    pub duplicates_skipped: u64,
    /// When the last run ended.
    pub last_run_time: Option<Instant>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Why a successful run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The feed declared no further page.
    Completed,
    /// Cancellation was requested.
    Cancelled,
    /// The configured page bound was reached.
    PageLimit,
}

/// Summary of one successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Pages fetched.
    pub pages_fetched: u64,
    /// Actions decoded and dispatched, duplicates included.
    pub actions_processed: u64,
    /// Actions skipped as repeats.
    pub duplicates_skipped: u64,
    /// Committed cursor at the end of the run.
    pub final_cursor: Option<Cursor>,
    /// Why the run stopped.
    pub stop: StopReason,
    /// Wall-clock duration.
    pub duration: Duration,
}

/// Requests cancellation of a running engine from another thread.
///
/// The loop checks the flag only between pages, so a cancelled run always
/// ends on a committed cursor.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns true if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Returns the underlying flag.
    ///
    /// Storing `true` into it is the same as calling [`CancelHandle::cancel`],
    /// which lets a signal handler request cancellation directly.
    pub fn shared_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Clears the running flag when a run leaves scope.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The sync engine drives one installation's feed into its content store.
///
/// One engine serves one installation. Runs are strictly sequential: a
/// second call to [`SyncEngine::run`] while one is in progress fails with
/// [`SyncError::AlreadyRunning`].
pub struct SyncEngine<F, D, S, C>
where
    F: PageFetcher,
    D: EventDecoder,
    S: ContentStore,
    C: CursorStore,
{
    config: SyncConfig,
    fetcher: F,
    decoder: D,
    store: S,
    cursors: C,
    sink: Arc<dyn ProgressSink>,
    phase: RwLock<SyncPhase>,
    state: RwLock<SyncState>,
    stats: RwLock<SyncStats>,
    cancel: CancelHandle,
    running: AtomicBool,
}

impl<F, D, S, C> SyncEngine<F, D, S, C>
where
    F: PageFetcher,
    D: EventDecoder,
    S: ContentStore,
    C: CursorStore,
{
    /// Creates a new sync engine reporting to a [`TracingSink`].
    pub fn new(config: SyncConfig, fetcher: F, decoder: D, store: S, cursors: C) -> Self {
        Self {
            config,
            fetcher,
            decoder,
            store,
            cursors,
            sink: Arc::new(TracingSink),
            phase: RwLock::new(SyncPhase::Idle),
            state: RwLock::new(SyncState::default()),
            stats: RwLock::new(SyncStats::default()),
            cancel: CancelHandle::default(),
            running: AtomicBool::new(false),
        }
    }

    /// Replaces the progress sink.
    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Gets the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Gets the current phase.
    pub fn phase(&self) -> SyncPhase {
        *self.phase.read()
    }

    /// Gets the progress of the current (or last) run.
    pub fn state(&self) -> SyncState {
        self.state.read().clone()
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Gets the content store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Gets the page fetcher.
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Gets the cursor store.
    pub fn cursor_store(&self) -> &C {
        &self.cursors
    }

    /// Returns a handle that can cancel runs of this engine.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Cancels the ongoing run at the next page boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Clears a pending cancellation.
    ///
    /// Runs do not clear the flag themselves: a cancellation requested
    /// before a run starts stops that run before its first fetch.
    pub fn reset_cancel(&self) {
        self.cancel.reset();
    }

    fn set_phase(&self, phase: SyncPhase) {
        *self.phase.write() = phase;
    }

    /// Runs the sync loop until the feed is exhausted, the run is
    /// cancelled, or the page bound is reached.
    ///
    /// # Errors
    ///
    /// Any failure ends the run. The committed cursor is left on the last
    /// fully applied page, so the next run resumes from there.
    pub fn run(&self) -> SyncResult<SyncReport> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(SyncError::AlreadyRunning);
        }
        let _guard = RunGuard(&self.running);
        let start = Instant::now();

        match self.run_pages(start) {
            Ok(report) => {
                self.set_phase(SyncPhase::Done);
                {
                    let mut stats = self.stats.write();
                    stats.runs_completed += 1;
                    stats.last_run_time = Some(Instant::now());
                    stats.last_error = None;
                }
                self.sink.emit(&SyncEvent::RunFinished {
                    report: report.clone(),
                });
                Ok(report)
            }
            Err(e) => {
                self.handle_error(&e);
                Err(e)
            }
        }
    }

    fn run_pages(&self, start: Instant) -> SyncResult<SyncReport> {
        let mut cursor = self.cursors.load()?;
        *self.state.write() = SyncState {
            cursor,
            actions_processed: 0,
        };
        self.sink.emit(&SyncEvent::RunStarted { cursor });

        let mut dispatcher = Dispatcher::new();
        let mut pages_fetched = 0u64;
        let mut actions_processed = 0u64;
        let mut duplicates_skipped = 0u64;

        let stop = loop {
            if self.cancel.is_cancelled() {
                tracing::info!(cursor = ?cursor.map(|c| c.position()), "sync run cancelled");
                break StopReason::Cancelled;
            }
            if let Some(max_pages) = self.config.max_pages {
                if pages_fetched >= u64::from(max_pages) {
                    break StopReason::PageLimit;
                }
            }

            self.set_phase(SyncPhase::FetchingPage);
            let page = self.fetcher.fetch(cursor.as_ref(), self.config.page_limit)?;
            pages_fetched += 1;
            self.stats.write().pages_fetched += 1;
            self.sink.emit(&SyncEvent::PageFetched {
                count: page.len(),
                next_cursor: page.next_cursor,
            });

            if let (Some(current), Some(next)) = (cursor, page.next_cursor) {
                if next < current {
                    return Err(SyncError::CursorRegression { current, next });
                }
                if next == current {
                    return Err(SyncError::CursorStalled { cursor: current });
                }
            }

            self.set_phase(SyncPhase::ApplyingPage);
            let actions = self.decode_page(&page)?;
            for action in &actions {
                let outcome = dispatcher.apply(action, &self.store)?;
                if outcome == Applied::Duplicate {
                    duplicates_skipped += 1;
                    self.stats.write().duplicates_skipped += 1;
                } else {
                    self.stats.write().actions_applied += 1;
                }
                self.sink.emit(&SyncEvent::ActionApplied {
                    id: action.id,
                    kind: action.kind,
                    subject_id: action.subject_id.clone(),
                    outcome,
                });
            }

            self.set_phase(SyncPhase::CommittingCursor);
            if let Some(next) = page.next_cursor {
                self.cursors.save(&next)?;
                cursor = Some(next);
                self.sink.emit(&SyncEvent::CursorCommitted { cursor: next });
            }

            let count = actions.len() as u64;
            actions_processed += count;
            {
                let mut state = self.state.write();
                state.cursor = cursor;
                state.actions_processed = actions_processed;
            }
            self.sink.emit(&SyncEvent::PageCommitted {
                actions: count,
                total: actions_processed,
            });

            if !page.has_next() {
                break StopReason::Completed;
            }
        };

        Ok(SyncReport {
            pages_fetched,
            actions_processed,
            duplicates_skipped,
            final_cursor: cursor,
            stop,
            duration: start.elapsed(),
        })
    }

    /// Decodes every event of a page; the first failure rejects the page.
    fn decode_page(&self, page: &Page) -> SyncResult<Vec<Action>> {
        page.events
            .iter()
            .map(|event| self.decoder.decode(event).map_err(SyncError::from))
            .collect()
    }

    /// Handles an error by updating phase and stats.
    fn handle_error(&self, error: &SyncError) {
        self.set_phase(SyncPhase::Failed);
        {
            let mut stats = self.stats.write();
            stats.runs_failed += 1;
            stats.last_run_time = Some(Instant::now());
            stats.last_error = Some(error.to_string());
        }
        self.sink.emit(&SyncEvent::Error {
            kind: error.kind().to_string(),
            detail: error.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::events::CollectingSink;
    use crate::fetcher::ScriptedFetcher;
    use feedsync_protocol::{FeedKind, RawEvent, TableDecoder};
    use feedsync_storage::{DirectoryContentStore, MemoryContentStore, MemoryCursorStore};

    type TestEngine =
        SyncEngine<ScriptedFetcher, TableDecoder, MemoryContentStore, MemoryCursorStore>;

    fn engine_with(pages: Vec<Page>, cursors: MemoryCursorStore) -> TestEngine {
        SyncEngine::new(
            SyncConfig::new(20),
            ScriptedFetcher::with_pages(pages),
            FeedKind::Editorial.decoder(),
            MemoryContentStore::new(),
            cursors,
        )
    }

    fn published(id: u64, subject: &str, doc: &str) -> RawEvent {
        RawEvent::new(id.to_string(), "published").with_subject(subject, doc)
    }

    fn unpublished(id: u64, subject: &str) -> RawEvent {
        RawEvent::new(id.to_string(), "unpublished").with_subject(subject, "")
    }

    #[test]
    fn phase_checks() {
        assert!(SyncPhase::Idle.can_start());
        assert!(SyncPhase::Done.can_start());
        assert!(SyncPhase::Failed.can_start());
        assert!(!SyncPhase::FetchingPage.can_start());
        assert!(SyncPhase::ApplyingPage.is_active());
        assert!(!SyncPhase::Done.is_active());
    }

    #[test]
    fn initial_state() {
        let engine = engine_with(vec![], MemoryCursorStore::new());
        assert_eq!(engine.phase(), SyncPhase::Idle);
        assert_eq!(engine.state(), SyncState::default());
        assert_eq!(engine.stats().runs_completed, 0);
    }

    #[test]
    fn end_to_end_two_pages() {
        let engine = engine_with(
            vec![
                Page::new(
                    vec![published(1, "A", "<x/>"), unpublished(2, "B")],
                    Some(Cursor::new(100)),
                ),
                Page::empty(),
            ],
            MemoryCursorStore::new(),
        );

        let report = engine.run().unwrap();

        assert_eq!(report.pages_fetched, 2);
        assert_eq!(report.actions_processed, 2);
        assert_eq!(report.final_cursor, Some(Cursor::new(100)));
        assert_eq!(report.stop, StopReason::Completed);
        assert_eq!(engine.store().get("A").unwrap().unwrap().document, b"<x/>");
        assert!(!engine.store().exists("B"));
        assert_eq!(engine.cursor_store().load().unwrap(), Some(Cursor::new(100)));
        assert_eq!(engine.cursor_store().save_history(), vec![Cursor::new(100)]);
        assert_eq!(engine.phase(), SyncPhase::Done);
        assert_eq!(engine.state().actions_processed, 2);
        assert_eq!(
            engine.fetcher().requests(),
            vec![(None, 20), (Some(Cursor::new(100)), 20)]
        );
    }

    #[test]
    fn resumes_from_committed_cursor() {
        let engine = engine_with(
            vec![Page::empty()],
            MemoryCursorStore::with_cursor(Cursor::new(42)),
        );

        engine.run().unwrap();

        assert_eq!(engine.fetcher().requests(), vec![(Some(Cursor::new(42)), 20)]);
        assert_eq!(engine.state().cursor, Some(Cursor::new(42)));
    }

    #[test]
    fn unknown_kind_aborts_page_without_mutation() {
        let engine = engine_with(
            vec![Page::new(
                vec![
                    published(1, "A", "<a/>"),
                    RawEvent::new("2", "archived").with_subject("B", "<b/>"),
                ],
                Some(Cursor::new(2)),
            )],
            MemoryCursorStore::new(),
        );

        let err = engine.run().unwrap_err();

        assert_eq!(err.kind(), "unknown_kind");
        assert!(engine.store().is_empty());
        assert_eq!(engine.cursor_store().load().unwrap(), None);
        assert_eq!(engine.phase(), SyncPhase::Failed);
        assert!(engine.stats().last_error.is_some());
    }

    #[test]
    fn store_error_leaves_cursor_uncommitted() {
        let dir = tempfile::tempdir().unwrap();
        let engine = SyncEngine::new(
            SyncConfig::default(),
            ScriptedFetcher::with_pages(vec![Page::new(
                vec![published(1, "A", "<a/>"), published(2, "../etc", "<b/>")],
                Some(Cursor::new(2)),
            )]),
            FeedKind::Editorial.decoder(),
            DirectoryContentStore::open(dir.path()).unwrap(),
            MemoryCursorStore::with_cursor(Cursor::new(0)),
        );

        let err = engine.run().unwrap_err();

        assert!(matches!(err, SyncError::Store(_)));
        assert_eq!(err.kind(), "store");
        assert!(engine.store().exists("A"));
        assert_eq!(engine.cursor_store().load().unwrap(), Some(Cursor::new(0)));
    }

    #[test]
    fn fetch_error_is_fatal() {
        let fetcher = ScriptedFetcher::new();
        fetcher.push_error(FetchError::Status { status: 503 });
        let engine = SyncEngine::new(
            SyncConfig::default(),
            fetcher,
            FeedKind::Editorial.decoder(),
            MemoryContentStore::new(),
            MemoryCursorStore::new(),
        );

        let err = engine.run().unwrap_err();
        assert_eq!(err.kind(), "fetch");
        assert_eq!(engine.fetcher().fetch_count(), 1);
        assert_eq!(engine.stats().runs_failed, 1);
    }

    #[test]
    fn corrupt_cursor_fails_before_fetching() {
        let engine = engine_with(vec![Page::empty()], MemoryCursorStore::with_raw("1x0"));

        let err = engine.run().unwrap_err();

        assert!(matches!(err, SyncError::CorruptState { .. }));
        assert_eq!(engine.fetcher().fetch_count(), 0);
    }

    #[test]
    fn regressing_cursor_is_rejected() {
        let engine = engine_with(
            vec![Page::new(vec![published(5, "A", "<a/>")], Some(Cursor::new(50)))],
            MemoryCursorStore::with_cursor(Cursor::new(100)),
        );

        let err = engine.run().unwrap_err();

        assert!(matches!(
            err,
            SyncError::CursorRegression { current, next }
                if current == Cursor::new(100) && next == Cursor::new(50)
        ));
        assert!(engine.store().is_empty());
    }

    #[test]
    fn stalled_cursor_is_rejected() {
        let engine = engine_with(
            vec![
                Page::new(vec![published(6, "A", "<a/>")], Some(Cursor::new(5))),
                Page::new(vec![published(6, "A", "<a/>")], Some(Cursor::new(5))),
            ],
            MemoryCursorStore::with_cursor(Cursor::new(5)),
        );

        let err = engine.run().unwrap_err();

        assert!(matches!(
            err,
            SyncError::CursorStalled { cursor } if cursor == Cursor::new(5)
        ));
        assert_eq!(err.kind(), "cursor_stalled");
        assert_eq!(engine.fetcher().fetch_count(), 1);
        assert!(engine.store().is_empty());
        assert!(engine.cursor_store().save_history().is_empty());
        assert_eq!(engine.phase(), SyncPhase::Failed);
    }

    #[test]
    fn cancellation_before_run_fetches_nothing() {
        let engine = engine_with(vec![Page::empty()], MemoryCursorStore::new());
        engine.cancel_handle().cancel();

        let report = engine.run().unwrap();
        assert_eq!(report.stop, StopReason::Cancelled);
        assert_eq!(report.pages_fetched, 0);

        engine.reset_cancel();
        let report = engine.run().unwrap();
        assert_eq!(report.stop, StopReason::Completed);
    }

    struct CancelAfterFirstPage(Arc<AtomicBool>);

    impl ProgressSink for CancelAfterFirstPage {
        fn emit(&self, event: &SyncEvent) {
            if matches!(event, SyncEvent::PageFetched { .. }) {
                self.0.store(true, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn shared_flag_stops_at_next_page_boundary() {
        let engine = engine_with(
            vec![
                Page::new(vec![published(1, "A", "<a/>")], Some(Cursor::new(1))),
                Page::new(vec![published(2, "B", "<b/>")], None),
            ],
            MemoryCursorStore::new(),
        );
        let flag = engine.cancel_handle().shared_flag();
        let engine = engine.with_sink(Arc::new(CancelAfterFirstPage(flag)));

        let report = engine.run().unwrap();

        assert_eq!(report.stop, StopReason::Cancelled);
        assert_eq!(report.pages_fetched, 1);
        assert_eq!(report.final_cursor, Some(Cursor::new(1)));
        assert!(engine.store().exists("A"));
        assert!(!engine.store().exists("B"));
        assert!(engine.cancel_handle().is_cancelled());
    }

    #[test]
    fn page_limit_stops_on_boundary() {
        let engine = SyncEngine::new(
            SyncConfig::new(1).with_max_pages(1),
            ScriptedFetcher::with_pages(vec![
                Page::new(vec![published(1, "A", "<a/>")], Some(Cursor::new(1))),
                Page::new(vec![published(2, "B", "<b/>")], Some(Cursor::new(2))),
            ]),
            FeedKind::Editorial.decoder(),
            MemoryContentStore::new(),
            MemoryCursorStore::new(),
        );

        let report = engine.run().unwrap();

        assert_eq!(report.stop, StopReason::PageLimit);
        assert_eq!(report.final_cursor, Some(Cursor::new(1)));
        assert_eq!(engine.fetcher().remaining(), 1);
    }

    #[test]
    fn duplicate_within_run_is_counted() {
        let engine = engine_with(
            vec![
                Page::new(vec![published(1, "A", "<a/>")], Some(Cursor::new(1))),
                Page::new(
                    vec![published(1, "A", "<a/>"), unpublished(2, "A")],
                    None,
                ),
            ],
            MemoryCursorStore::new(),
        );

        let report = engine.run().unwrap();

        assert_eq!(report.duplicates_skipped, 1);
        assert_eq!(report.actions_processed, 3);
        assert!(!engine.store().exists("A"));
        assert_eq!(engine.stats().actions_applied, 2);
    }

    #[test]
    fn applied_ids_do_not_outlive_a_run() {
        let engine = engine_with(
            vec![Page::new(vec![published(1, "A", "<a/>")], None)],
            MemoryCursorStore::new(),
        );
        engine.run().unwrap();

        engine
            .fetcher()
            .push_page(Page::new(vec![published(1, "A", "<a/>")], None));
        let report = engine.run().unwrap();

        assert_eq!(report.duplicates_skipped, 0);
        assert_eq!(engine.stats().actions_applied, 2);
        assert_eq!(engine.stats().duplicates_skipped, 0);
    }

    #[test]
    fn events_follow_the_loop() {
        let sink = Arc::new(CollectingSink::new());
        let engine = engine_with(
            vec![Page::new(vec![published(1, "A", "<a/>")], Some(Cursor::new(1))), Page::empty()],
            MemoryCursorStore::new(),
        )
        .with_sink(sink.clone());

        engine.run().unwrap();
        let events = sink.events();

        assert_eq!(events[0], SyncEvent::RunStarted { cursor: None });
        assert_eq!(
            events[1],
            SyncEvent::PageFetched {
                count: 1,
                next_cursor: Some(Cursor::new(1))
            }
        );
        assert!(matches!(
            events[2],
            SyncEvent::ActionApplied {
                id: 1,
                outcome: Applied::Inserted,
                ..
            }
        ));
        assert_eq!(
            events[3],
            SyncEvent::CursorCommitted {
                cursor: Cursor::new(1)
            }
        );
        assert_eq!(events[4], SyncEvent::PageCommitted { actions: 1, total: 1 });
        assert!(matches!(events.last(), Some(SyncEvent::RunFinished { .. })));
    }

    #[test]
    fn failure_emits_error_event() {
        let sink = Arc::new(CollectingSink::new());
        let engine = engine_with(vec![], MemoryCursorStore::new()).with_sink(sink.clone());

        engine.run().unwrap_err();

        assert!(matches!(
            sink.events().last(),
            Some(SyncEvent::Error { kind, .. }) if kind == "fetch"
        ));
    }
}
