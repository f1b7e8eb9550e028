//! Raw feed events and pages, as delivered by the wire.

use crate::cursor::Cursor;

/// A subject sub-record inside a raw event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSubject {
    /// Subject ID as declared by the feed.
    pub subject_id: String,
    /// Verbatim serialized sub-record.
    pub document: Vec<u8>,
}

impl RawSubject {
    /// Creates a new raw subject.
    pub fn new(subject_id: impl Into<String>, document: impl Into<Vec<u8>>) -> Self {
        Self {
            subject_id: subject_id.into(),
            document: document.into(),
        }
    }
}

/// One event exactly as the feed declared it, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// Declared action ID (unvalidated text).
    pub declared_id: String,
    /// Declared kind string (feed-specific vocabulary).
    pub kind: String,
    /// Every subject sub-record found under the event.
    pub subjects: Vec<RawSubject>,
}

impl RawEvent {
    /// Creates a raw event with no subjects.
    pub fn new(declared_id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            declared_id: declared_id.into(),
            kind: kind.into(),
            subjects: Vec::new(),
        }
    }

    /// Adds a subject sub-record.
    pub fn with_subject(mut self, subject_id: impl Into<String>, document: impl Into<Vec<u8>>) -> Self {
        self.subjects.push(RawSubject::new(subject_id, document));
        self
    }
}

/// One fetched batch of raw events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    /// Events in feed order.
    pub events: Vec<RawEvent>,
    /// Continuation cursor; `None` means the feed is drained for this run.
    pub next_cursor: Option<Cursor>,
}

impl Page {
    /// Creates a page.
    pub fn new(events: Vec<RawEvent>, next_cursor: Option<Cursor>) -> Self {
        Self {
            events,
            next_cursor,
        }
    }

    /// Creates an empty terminal page.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if another page must be fetched after this one.
    pub fn has_next(&self) -> bool {
        self.next_cursor.is_some()
    }

    /// Returns the number of events in the page.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if the page carries no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuation_drives_has_next() {
        let page = Page::new(vec![], Some(Cursor::new(100)));
        assert!(page.has_next());
        assert!(page.is_empty());

        assert!(!Page::empty().has_next());
    }

    #[test]
    fn event_builder_collects_subjects() {
        let event = RawEvent::new("7", "published")
            .with_subject("A", "<article articleId=\"A\"/>")
            .with_subject("B", "<article articleId=\"B\"/>");
        assert_eq!(event.subjects.len(), 2);
        assert_eq!(event.subjects[1].subject_id, "B");
    }
}
