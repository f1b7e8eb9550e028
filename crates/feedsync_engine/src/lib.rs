//! # FeedSync Engine
//!
//! Cursor-driven pagination and replay loop for FeedSync.
//!
//! This crate provides:
//! - Sync state machine (idle → fetching → applying → committing → done)
//! - Action dispatch onto a [`feedsync_storage::ContentStore`]
//! - Page fetcher abstraction, with an HTTP fetcher over an abstract client
//! - Structured progress events for logging sinks
//!
//! ## Architecture
//!
//! The engine runs a strictly sequential **fetch → decode → apply → commit**
//! loop:
//! 1. Load the last committed cursor
//! 2. Fetch one page at that cursor
//! 3. Decode every event in the page, then apply the actions in order
//! 4. Commit the page's continuation cursor
//! 5. Repeat while the page declares a continuation
//!
//! ## Key Invariants
//!
//! - The committed cursor always ends a fully applied prefix of the feed
//! - A failed page never advances the cursor
//! - Page N+1 is never fetched before page N's cursor commit completes
//! - Store mutations are idempotent, so re-applying a page is harmless
//! - Cancellation is observed only between pages

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod dispatcher;
mod engine;
mod error;
mod events;
mod fetcher;
mod http;

pub use config::SyncConfig;
pub use dispatcher::{Applied, Dispatcher};
pub use engine::{
    CancelHandle, StopReason, SyncEngine, SyncPhase, SyncReport, SyncState, SyncStats,
};
pub use error::{FetchError, FetchResult, SyncError, SyncResult};
pub use events::{CollectingSink, NullSink, ProgressSink, SyncEvent, TracingSink};
pub use fetcher::{PageFetcher, ScriptedFetcher};
pub use http::{HttpClient, HttpFetcher, HttpFetcherConfig, HttpResponse};
