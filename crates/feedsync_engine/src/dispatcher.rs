//! Action dispatch onto a content store.
//!
//! The dispatcher turns one decoded [`Action`] into exactly one store
//! mutation. It remembers the action IDs it has applied during the current
//! run so a feed that repeats an action inside one run is applied once.

use feedsync_protocol::{Action, ActionKind};
use feedsync_storage::{ContentStore, StorageError, StorageResult};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// What applying one action did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Applied {
    /// Upsert created a new record.
    Inserted,
    /// Upsert overwrote an existing record.
    Updated,
    /// Remove deleted an existing record.
    Removed,
    /// Remove found nothing to delete.
    AlreadyAbsent,
    /// The action ID was already applied in this run; the store was not touched.
    Duplicate,
}

impl Applied {
    /// Returns a stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Applied::Inserted => "inserted",
            Applied::Updated => "updated",
            Applied::Removed => "removed",
            Applied::AlreadyAbsent => "already_absent",
            Applied::Duplicate => "duplicate",
        }
    }
}

impl fmt::Display for Applied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Applies actions to a content store, one mutation per action.
///
/// Memory grows with the distinct action IDs applied, and nothing is ever
/// evicted. The engine creates one dispatcher per run and drops it when the
/// run ends, so the set is bounded by the actions in that run's pages: at
/// most `max_pages * page_limit` when a page cap is configured.
#[derive(Debug, Default)]
pub struct Dispatcher {
    seen: HashSet<u64>,
}

impl Dispatcher {
    /// Creates a dispatcher with no remembered actions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of distinct actions applied.
    pub fn applied_count(&self) -> usize {
        self.seen.len()
    }

    /// Returns true if `action_id` has already been applied by this dispatcher.
    pub fn has_applied(&self, action_id: u64) -> bool {
        self.seen.contains(&action_id)
    }

    /// Applies `action` to `store`.
    ///
    /// The existence check only labels the outcome; both mutations are
    /// idempotent on their own. An action is remembered only once its
    /// mutation succeeds.
    ///
    /// # Errors
    ///
    /// Returns the store's error unchanged. An Upsert without a document
    /// is reported as [`StorageError::Corrupted`].
    pub fn apply<S: ContentStore + ?Sized>(
        &mut self,
        action: &Action,
        store: &S,
    ) -> StorageResult<Applied> {
        if self.seen.contains(&action.id) {
            tracing::debug!(action_id = action.id, "skipping duplicate action");
            return Ok(Applied::Duplicate);
        }

        let existed = store.exists(&action.subject_id);
        let outcome = match action.kind {
            ActionKind::Upsert => {
                let document = action.document().ok_or_else(|| {
                    StorageError::Corrupted(format!("upsert action {} has no document", action.id))
                })?;
                store.upsert(&action.subject_id, document, action.id)?;
                if existed {
                    Applied::Updated
                } else {
                    Applied::Inserted
                }
            }
            ActionKind::Remove => {
                store.remove(&action.subject_id)?;
                if existed {
                    Applied::Removed
                } else {
                    Applied::AlreadyAbsent
                }
            }
        };

        self.seen.insert(action.id);
        Ok(outcome)
    }
}
