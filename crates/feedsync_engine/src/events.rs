//! Structured progress events emitted by the sync loop.

use crate::dispatcher::Applied;
use crate::engine::SyncReport;
use feedsync_protocol::{ActionKind, Cursor};
use parking_lot::Mutex;
use serde::Serialize;

/// One step of a sync run, as seen by a progress sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    /// The run loaded its cursor and is about to fetch.
    RunStarted {
        /// Committed cursor at start, `None` for a fresh installation.
        cursor: Option<Cursor>,
    },
    /// A page arrived.
    PageFetched {
        /// Number of raw events in the page.
        count: usize,
        /// Continuation the page declared.
        next_cursor: Option<Cursor>,
    },
    /// One action was applied to the content store.
    ActionApplied {
        /// Feed action ID.
        id: u64,
        /// Action kind.
        kind: ActionKind,
        /// Target subject.
        subject_id: String,
        /// What the store did.
        outcome: Applied,
    },
    /// A new cursor was durably saved.
    CursorCommitted {
        /// The saved cursor.
        cursor: Cursor,
    },
    /// A page was fully applied.
    PageCommitted {
        /// Actions in this page.
        actions: u64,
        /// Actions processed so far in this run.
        total: u64,
    },
    /// The run failed.
    Error {
        /// Stable error category, see [`crate::SyncError::kind`].
        kind: String,
        /// Human-readable detail.
        detail: String,
    },
    /// The run ended without error.
    RunFinished {
        /// Final report.
        report: SyncReport,
    },
}

/// Receives progress events from a sync run.
///
/// Sinks are called synchronously from the sync loop; they must not block
/// for long and must not fail.
pub trait ProgressSink: Send + Sync {
    /// Handles one event.
    fn emit(&self, event: &SyncEvent);
}

impl<P: ProgressSink + ?Sized> ProgressSink for std::sync::Arc<P> {
    fn emit(&self, event: &SyncEvent) {
        (**self).emit(event)
    }
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn emit(&self, event: &SyncEvent) {
        match event {
            SyncEvent::RunStarted { cursor } => {
                tracing::info!(cursor = ?cursor.map(|c| c.position()), "sync run started");
            }
            SyncEvent::PageFetched { count, next_cursor } => {
                tracing::info!(
                    count,
                    next_cursor = ?next_cursor.map(|c| c.position()),
                    "page fetched"
                );
            }
            SyncEvent::ActionApplied {
                id,
                kind,
                subject_id,
                outcome,
            } => {
                tracing::debug!(
                    action_id = id,
                    kind = %kind,
                    subject_id = %subject_id,
                    outcome = %outcome,
                    "action applied"
                );
            }
            SyncEvent::CursorCommitted { cursor } => {
                tracing::info!(cursor = cursor.position(), "cursor committed");
            }
            SyncEvent::PageCommitted { actions, total } => {
                tracing::info!(actions, total, "page committed");
            }
            SyncEvent::Error { kind, detail } => {
                tracing::error!(kind = %kind, detail = %detail, "sync run failed");
            }
            SyncEvent::RunFinished { report } => {
                tracing::info!(
                    pages = report.pages_fetched,
                    actions = report.actions_processed,
                    duplicates = report.duplicates_skipped,
                    cursor = ?report.final_cursor.map(|c| c.position()),
                    stop = ?report.stop,
                    "sync run finished"
                );
            }
        }
    }
}

/// Keeps every event in memory, for tests.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<SyncEvent>>,
}

impl CollectingSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every event received so far.
    pub fn events(&self) -> Vec<SyncEvent> {
        self.events.lock().clone()
    }

    /// Drops all recorded events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl ProgressSink for CollectingSink {
    fn emit(&self, event: &SyncEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: &SyncEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collecting_sink_keeps_order() {
        let sink = CollectingSink::new();
        sink.emit(&SyncEvent::RunStarted { cursor: None });
        sink.emit(&SyncEvent::CursorCommitted {
            cursor: Cursor::new(100),
        });

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], SyncEvent::RunStarted { cursor: None });

        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn events_serialize_with_tag() {
        let event = SyncEvent::ActionApplied {
            id: 2,
            kind: ActionKind::Remove,
            subject_id: "B".into(),
            outcome: Applied::AlreadyAbsent,
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event"], "action_applied");
        assert_eq!(json["kind"], "remove");
        assert_eq!(json["outcome"], "already_absent");
        assert_eq!(json["subject_id"], "B");
    }

    #[test]
    fn cursor_serializes_as_number() {
        let json = serde_json::to_value(SyncEvent::CursorCommitted {
            cursor: Cursor::new(100),
        })
        .unwrap();
        assert_eq!(json["cursor"], 100);
    }
}
