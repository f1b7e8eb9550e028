//! Page fetcher abstraction.

use crate::error::{FetchError, FetchResult};
use feedsync_protocol::{Cursor, Page};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// A page fetcher retrieves one page of the feed at a cursor.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (HTTP, scripted pages for testing, etc.).
pub trait PageFetcher: Send + Sync {
    /// Fetches the page that follows `cursor` (`None` means the beginning of
    /// the feed), holding at most `limit` events.
    fn fetch(&self, cursor: Option<&Cursor>, limit: u32) -> FetchResult<Page>;
}

impl<F: PageFetcher + ?Sized> PageFetcher for std::sync::Arc<F> {
    fn fetch(&self, cursor: Option<&Cursor>, limit: u32) -> FetchResult<Page> {
        (**self).fetch(cursor, limit)
    }
}

/// A fetcher that replays a fixed script of responses, for testing.
///
/// Each call pops the next scripted response and records the request. Once
/// the script is exhausted every call fails with a transport error.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    script: Mutex<VecDeque<FetchResult<Page>>>,
    requests: Mutex<Vec<(Option<Cursor>, u32)>>,
}

impl ScriptedFetcher {
    /// Creates a fetcher with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fetcher that serves `pages` in order.
    pub fn with_pages(pages: impl IntoIterator<Item = Page>) -> Self {
        let fetcher = Self::new();
        for page in pages {
            fetcher.push_page(page);
        }
        fetcher
    }

    /// Appends a page to the script.
    pub fn push_page(&self, page: Page) {
        self.script.lock().push_back(Ok(page));
    }

    /// Appends a failure to the script.
    pub fn push_error(&self, error: FetchError) {
        self.script.lock().push_back(Err(error));
    }

    /// Returns every `(cursor, limit)` pair requested so far.
    pub fn requests(&self) -> Vec<(Option<Cursor>, u32)> {
        self.requests.lock().clone()
    }

    /// Returns the number of fetches made.
    pub fn fetch_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Returns the number of scripted responses not yet served.
    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

impl PageFetcher for ScriptedFetcher {
    fn fetch(&self, cursor: Option<&Cursor>, limit: u32) -> FetchResult<Page> {
        self.requests.lock().push((cursor.copied(), limit));
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::transport_fatal("no scripted response left")))
    }
}
