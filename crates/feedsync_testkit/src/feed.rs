//! A simulated feed backed by an ordered event log.

use crate::fixtures::{article_document, kind_names};
use feedsync_engine::{FetchError, FetchResult, PageFetcher};
use feedsync_protocol::{Cursor, FeedKind, Page, RawEvent};
use parking_lot::Mutex;

#[derive(Debug, Clone)]
struct LogEntry {
    id: u64,
    event: RawEvent,
}

/// Serves pages out of an in-memory event log, the way the partner feeds do.
///
/// A fetch at cursor `c` returns up to `limit` events with IDs above `c`.
/// The page declares a continuation (the last ID it holds) only while more
/// events remain after it, so the final page of a run commits nothing.
/// Events can be appended between runs to simulate a growing feed.
pub struct EventLogFetcher {
    feed: FeedKind,
    log: Mutex<Vec<LogEntry>>,
    fetches: Mutex<Vec<Option<Cursor>>>,
    fail_on_fetch: Mutex<Option<usize>>,
}

impl EventLogFetcher {
    /// Creates an empty log for `feed`.
    pub fn new(feed: FeedKind) -> Self {
        Self {
            feed,
            log: Mutex::new(Vec::new()),
            fetches: Mutex::new(Vec::new()),
            fail_on_fetch: Mutex::new(None),
        }
    }

    /// Appends a raw event.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not exceed the last logged ID.
    pub fn push_raw(&self, id: u64, event: RawEvent) {
        let mut log = self.log.lock();
        if let Some(last) = log.last() {
            assert!(id > last.id, "event log IDs must increase");
        }
        log.push(LogEntry { id, event });
    }

    /// Appends an upsert of `subject_id` carrying `document`.
    pub fn push_upsert(&self, id: u64, subject_id: &str, document: &str) {
        let (upsert, _) = kind_names(self.feed);
        self.push_raw(
            id,
            RawEvent::new(id.to_string(), upsert).with_subject(subject_id, document),
        );
    }

    /// Appends a removal of `subject_id`.
    pub fn push_remove(&self, id: u64, subject_id: &str) {
        let (_, remove) = kind_names(self.feed);
        self.push_raw(
            id,
            RawEvent::new(id.to_string(), remove)
                .with_subject(subject_id, article_document(subject_id, "")),
        );
    }

    /// Makes the `n`th fetch from now (1-based) fail with a transport error.
    pub fn fail_on_fetch(&self, n: usize) {
        *self.fail_on_fetch.lock() = Some(self.fetches.lock().len() + n.max(1));
    }

    /// Returns the highest logged ID.
    pub fn last_id(&self) -> Option<u64> {
        self.log.lock().last().map(|e| e.id)
    }

    /// Returns the number of logged events.
    pub fn len(&self) -> usize {
        self.log.lock().len()
    }

    /// Returns true if nothing is logged.
    pub fn is_empty(&self) -> bool {
        self.log.lock().is_empty()
    }

    /// Returns the cursor of every fetch so far.
    pub fn fetches(&self) -> Vec<Option<Cursor>> {
        self.fetches.lock().clone()
    }
}

impl PageFetcher for EventLogFetcher {
    fn fetch(&self, cursor: Option<&Cursor>, limit: u32) -> FetchResult<Page> {
        let attempt = {
            let mut fetches = self.fetches.lock();
            fetches.push(cursor.copied());
            fetches.len()
        };
        if *self.fail_on_fetch.lock() == Some(attempt) {
            return Err(FetchError::transport_retryable("simulated connection reset"));
        }

        let after = cursor.map_or(0, Cursor::position);
        let log = self.log.lock();
        let pending: Vec<&LogEntry> = log.iter().filter(|e| e.id > after).collect();
        let take = pending.len().min(limit.max(1) as usize);
        let page: Vec<&LogEntry> = pending[..take].to_vec();

        let next_cursor = if pending.len() > take {
            page.last().map(|e| Cursor::new(e.id))
        } else {
            None
        };

        Ok(Page::new(
            page.into_iter().map(|e| e.event.clone()).collect(),
            next_cursor,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_of(n: u64) -> EventLogFetcher {
        let fetcher = EventLogFetcher::new(FeedKind::Editorial);
        for id in 1..=n {
            fetcher.push_upsert(id, "A", "<a/>");
        }
        fetcher
    }

    #[test]
    fn pages_through_log() {
        let fetcher = log_of(5);

        let first = fetcher.fetch(None, 2).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first.next_cursor, Some(Cursor::new(2)));

        let last = fetcher.fetch(Some(&Cursor::new(4)), 2).unwrap();
        assert_eq!(last.len(), 1);
        assert!(!last.has_next());
    }

    #[test]
    fn exact_fit_declares_no_continuation() {
        let fetcher = log_of(2);
        let page = fetcher.fetch(None, 2).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page.next_cursor, None);
    }

    #[test]
    fn injected_failure_hits_chosen_fetch() {
        let fetcher = log_of(3);
        fetcher.fail_on_fetch(2);

        assert!(fetcher.fetch(None, 1).is_ok());
        assert!(fetcher.fetch(Some(&Cursor::new(1)), 1).is_err());
        assert!(fetcher.fetch(Some(&Cursor::new(1)), 1).is_ok());
        assert_eq!(fetcher.fetches().len(), 3);
    }
}
