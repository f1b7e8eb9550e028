//! Event validation and normalization.

use crate::action::{Action, ActionKind};
use crate::error::{DecodeError, DecodeResult};
use crate::event::RawEvent;

/// Turns one raw event into a typed [`Action`].
///
/// Decoding is pure: implementations must not touch any store.
pub trait EventDecoder: Send + Sync {
    /// Validates and normalizes a raw event.
    fn decode(&self, event: &RawEvent) -> DecodeResult<Action>;
}

/// Fixed mapping from a feed's kind vocabulary to [`ActionKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindTable {
    entries: Vec<(String, ActionKind)>,
}

impl KindTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds a mapping. A later entry for the same name replaces the earlier one.
    pub fn with(mut self, name: impl Into<String>, kind: ActionKind) -> Self {
        let name = name.into();
        self.entries.retain(|(existing, _)| *existing != name);
        self.entries.push((name, kind));
        self
    }

    /// Looks up a kind string. Matching is exact.
    pub fn lookup(&self, name: &str) -> Option<ActionKind> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, kind)| *kind)
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for KindTable {
    fn default() -> Self {
        Self::new()
    }
}

/// The stock decoder: exactly-one-subject check, then kind lookup.
///
/// Validation order:
/// 1. the event must carry exactly one subject sub-record
/// 2. the kind must be in the table
/// 3. the declared ID must be an unsigned integer and the subject ID non-empty
///
/// For Upsert the subject document is carried through untouched.
#[derive(Debug, Clone)]
pub struct TableDecoder {
    table: KindTable,
}

impl TableDecoder {
    /// Creates a decoder over the given kind table.
    pub fn new(table: KindTable) -> Self {
        Self { table }
    }

    /// Returns the kind table.
    pub fn table(&self) -> &KindTable {
        &self.table
    }
}

impl EventDecoder for TableDecoder {
    fn decode(&self, event: &RawEvent) -> DecodeResult<Action> {
        let subject = match event.subjects.as_slice() {
            [subject] => subject,
            subjects => {
                return Err(DecodeError::malformed(
                    &event.declared_id,
                    format!("expected exactly one subject, found {}", subjects.len()),
                ))
            }
        };

        let kind = self
            .table
            .lookup(&event.kind)
            .ok_or_else(|| DecodeError::UnknownKind {
                event_id: event.declared_id.clone(),
                kind: event.kind.clone(),
            })?;

        let id = event.declared_id.trim().parse::<u64>().map_err(|_| {
            DecodeError::malformed(&event.declared_id, "action ID is not an unsigned integer")
        })?;

        if subject.subject_id.trim().is_empty() {
            return Err(DecodeError::malformed(
                &event.declared_id,
                "subject ID is empty",
            ));
        }

        Ok(match kind {
            ActionKind::Upsert => Action::upsert(id, &subject.subject_id, subject.document.clone()),
            ActionKind::Remove => Action::remove(id, &subject.subject_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn decoder() -> TableDecoder {
        TableDecoder::new(
            KindTable::new()
                .with("published", ActionKind::Upsert)
                .with("unpublished", ActionKind::Remove),
        )
    }

    #[test]
    fn decodes_upsert_with_verbatim_document() {
        let event = RawEvent::new("1", "published").with_subject("A", "<article articleId=\"A\"><x/></article>");
        let action = decoder().decode(&event).unwrap();

        assert_eq!(action, Action::upsert(1, "A", "<article articleId=\"A\"><x/></article>"));
    }

    #[test]
    fn decodes_remove_without_payload() {
        let event = RawEvent::new("2", "unpublished").with_subject("B", "<article articleId=\"B\"/>");
        let action = decoder().decode(&event).unwrap();

        assert_eq!(action, Action::remove(2, "B"));
    }

    #[test]
    fn rejects_missing_subject() {
        let event = RawEvent::new("5", "published");
        let err = decoder().decode(&event).unwrap_err();

        assert!(matches!(err, DecodeError::MalformedEvent { ref event_id, .. } if event_id == "5"));
    }

    #[test]
    fn rejects_multiple_subjects() {
        let event = RawEvent::new("6", "published")
            .with_subject("A", "<a/>")
            .with_subject("B", "<b/>");
        let err = decoder().decode(&event).unwrap_err();

        assert!(matches!(err, DecodeError::MalformedEvent { .. }));
    }

    #[test]
    fn subject_count_is_checked_before_kind() {
        let event = RawEvent::new("7", "archived");
        let err = decoder().decode(&event).unwrap_err();

        assert!(matches!(err, DecodeError::MalformedEvent { .. }));
    }

    #[test]
    fn rejects_unknown_kind() {
        let event = RawEvent::new("8", "archived").with_subject("A", "<a/>");
        let err = decoder().decode(&event).unwrap_err();

        assert_eq!(
            err,
            DecodeError::UnknownKind {
                event_id: "8".into(),
                kind: "archived".into(),
            }
        );
    }

    #[test]
    fn kind_lookup_is_case_sensitive() {
        let event = RawEvent::new("9", "Published").with_subject("A", "<a/>");
        assert!(matches!(
            decoder().decode(&event),
            Err(DecodeError::UnknownKind { .. })
        ));
    }

    #[test]
    fn rejects_non_numeric_id() {
        let event = RawEvent::new("abc", "published").with_subject("A", "<a/>");
        let err = decoder().decode(&event).unwrap_err();

        assert!(matches!(err, DecodeError::MalformedEvent { ref event_id, .. } if event_id == "abc"));
    }

    #[test]
    fn rejects_empty_subject_id() {
        let event = RawEvent::new("10", "unpublished").with_subject("  ", "<a/>");
        assert!(matches!(
            decoder().decode(&event),
            Err(DecodeError::MalformedEvent { .. })
        ));
    }

    #[test]
    fn kind_table_replaces_duplicates() {
        let table = KindTable::new()
            .with("x", ActionKind::Upsert)
            .with("x", ActionKind::Remove);
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup("x"), Some(ActionKind::Remove));
        assert_eq!(table.lookup("y"), None);
    }

    proptest! {
        #[test]
        fn numeric_ids_with_known_kind_decode(id in any::<u64>(), subject in "[A-Za-z0-9-]{1,16}") {
            let event = RawEvent::new(id.to_string(), "published").with_subject(subject.clone(), "<a/>");
            let action = decoder().decode(&event).unwrap();
            prop_assert_eq!(action.id, id);
            prop_assert_eq!(&action.subject_id, &subject);
            prop_assert_eq!(action.document(), Some(&b"<a/>"[..]));
        }

        #[test]
        fn unknown_kinds_never_decode(kind in "[a-z]{1,12}") {
            prop_assume!(kind != "published" && kind != "unpublished");
            let event = RawEvent::new("1", kind).with_subject("A", "<a/>");
            let is_unknown = matches!(decoder().decode(&event), Err(DecodeError::UnknownKind { .. }));
            prop_assert!(is_unknown);
        }
    }
}
