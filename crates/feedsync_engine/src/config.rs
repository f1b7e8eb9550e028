//! Configuration for the sync engine.

/// Configuration for sync runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Maximum number of events requested per page.
    pub page_limit: u32,
    /// Optional bound on pages fetched in one run.
    ///
    /// When reached, the run stops cleanly on a committed cursor. This guards
    /// against runaway feeds; correctness does not depend on it.
    pub max_pages: Option<u32>,
}

impl SyncConfig {
    /// Creates a configuration with the given page size and no page bound.
    pub fn new(page_limit: u32) -> Self {
        Self {
            page_limit,
            max_pages: None,
        }
    }

    /// Sets the page size.
    pub fn with_page_limit(mut self, limit: u32) -> Self {
        self.page_limit = limit;
        self
    }

    /// Sets the maximum number of pages per run.
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = Some(max_pages);
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(20)
    }
}
