//! # FeedSync Testkit
//!
//! Test utilities for FeedSync.
//!
//! This crate provides:
//! - Page builders, in-memory engines and temporary installations
//! - A simulated feed served from an ordered event log
//! - Fault-injecting content and cursor stores for crash testing
//! - Property-based test generators using proptest
//! - Wire test vectors for both partner feeds
//!
//! ## Usage
//!
//! ```rust,ignore
//! use feedsync_testkit::prelude::*;
//!
//! #[test]
//! fn replays_cleanly() {
//!     let engine = memory_engine(
//!         FeedKind::Editorial,
//!         vec![PageBuilder::new(FeedKind::Editorial).upsert(1, "A", "<a/>").build()],
//!     );
//!     engine.run().unwrap();
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod crash;
pub mod feed;
pub mod fixtures;
pub mod generators;
pub mod vectors;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::crash::*;
    pub use crate::feed::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::vectors::*;
    pub use feedsync_protocol::FeedKind;
}

pub use crash::*;
pub use feed::*;
pub use fixtures::*;
pub use generators::*;
pub use vectors::*;
