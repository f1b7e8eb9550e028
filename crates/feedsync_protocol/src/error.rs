//! Error types for decoding and parsing.

use thiserror::Error;

/// Result type for event decoding.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Result type for page parsing.
pub type ParseResult<T> = Result<T, ParseError>;

/// A single raw event failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The event is structurally invalid.
    #[error("malformed event #{event_id}: {reason}")]
    MalformedEvent {
        /// The event's declared ID, for diagnostics.
        event_id: String,
        /// What was wrong.
        reason: String,
    },

    /// The event's kind is not in the feed's lookup table.
    #[error("unknown kind {kind:?} on event #{event_id}")]
    UnknownKind {
        /// The event's declared ID.
        event_id: String,
        /// The unrecognized kind string.
        kind: String,
    },
}

impl DecodeError {
    /// Creates a malformed-event error.
    pub fn malformed(event_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedEvent {
            event_id: event_id.into(),
            reason: reason.into(),
        }
    }

    /// Returns the declared ID of the offending event.
    pub fn event_id(&self) -> &str {
        match self {
            DecodeError::MalformedEvent { event_id, .. } => event_id,
            DecodeError::UnknownKind { event_id, .. } => event_id,
        }
    }
}

/// A response body could not be turned into a page.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The body is not well-formed XML.
    #[error("invalid XML: {0}")]
    Xml(#[from] roxmltree::Error),

    /// The body is not valid UTF-8.
    #[error("response body is not UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    /// The continuation block is present but unusable.
    #[error("invalid query-continue block: {0}")]
    InvalidContinuation(String),
}
