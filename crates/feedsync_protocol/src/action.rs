//! Decoded feed actions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of store mutation an action requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Subject was created or updated.
    Upsert,
    /// Subject was withdrawn.
    Remove,
}

impl ActionKind {
    /// Returns a stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Upsert => "upsert",
            ActionKind::Remove => "remove",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded unit of work against one subject.
///
/// # Fields
///
/// - `id`: the feed's action identifier (monotonically increasing per feed)
/// - `kind`: Upsert or Remove
/// - `subject_id`: the subject the action targets
/// - `payload`: for Upsert, the subject's raw document
///
/// Use [`Action::upsert`] and [`Action::remove`]; they keep the payload
/// consistent with the kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    /// Feed action ID.
    pub id: u64,
    /// Action kind.
    pub kind: ActionKind,
    /// Subject ID.
    pub subject_id: String,
    /// Raw subject document (Upsert only).
    pub payload: Option<Vec<u8>>,
}

impl Action {
    /// Creates a new Upsert action.
    pub fn upsert(id: u64, subject_id: impl Into<String>, document: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            kind: ActionKind::Upsert,
            subject_id: subject_id.into(),
            payload: Some(document.into()),
        }
    }

    /// Creates a new Remove action.
    pub fn remove(id: u64, subject_id: impl Into<String>) -> Self {
        Self {
            id,
            kind: ActionKind::Remove,
            subject_id: subject_id.into(),
            payload: None,
        }
    }

    /// Returns the document for an Upsert, `None` for a Remove.
    pub fn document(&self) -> Option<&[u8]> {
        match self.kind {
            ActionKind::Upsert => self.payload.as_deref(),
            ActionKind::Remove => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_carries_payload() {
        let action = Action::upsert(1, "A", "<x/>");
        assert_eq!(action.kind, ActionKind::Upsert);
        assert_eq!(action.document(), Some(&b"<x/>"[..]));
    }

    #[test]
    fn remove_has_no_payload() {
        let action = Action::remove(2, "B");
        assert_eq!(action.kind, ActionKind::Remove);
        assert!(action.payload.is_none());
        assert!(action.document().is_none());
    }

    #[test]
    fn kind_names() {
        assert_eq!(ActionKind::Upsert.to_string(), "upsert");
        assert_eq!(ActionKind::Remove.as_str(), "remove");
    }
}
