//! # FeedSync Protocol
//!
//! Feed event types, action decoding and the page wire codec for FeedSync.
//!
//! This crate provides:
//! - [`Cursor`] - the opaque, ordered continuation token
//! - [`RawEvent`] and [`Page`] - one fetched batch as the wire delivered it
//! - [`Action`] - a decoded unit of work (`Upsert` or `Remove`)
//! - [`EventDecoder`] / [`TableDecoder`] - validation and kind lookup
//! - [`FeedKind`] - per-feed presets (kind table, continuation element)
//! - [`XmlPageParser`] - parses one XML response body into a [`Page`]
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod action;
mod cursor;
mod decoder;
mod error;
mod event;
mod feed;
mod xml;

pub use action::{Action, ActionKind};
pub use cursor::Cursor;
pub use decoder::{EventDecoder, KindTable, TableDecoder};
pub use error::{DecodeError, DecodeResult, ParseError, ParseResult};
pub use event::{Page, RawEvent, RawSubject};
pub use feed::FeedKind;
pub use xml::XmlPageParser;
