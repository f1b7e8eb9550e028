//! # FeedSync Storage
//!
//! Durable local state for FeedSync.
//!
//! This crate provides the two stores the sync loop writes to, plus the lock
//! that keeps one installation single-writer:
//!
//! - [`CursorStore`] - single-slot persistence of the last committed cursor
//! - [`ContentStore`] - key-addressed subject records
//! - [`InstallationLock`] - advisory exclusive lock per installation
//!
//! ## Design Principles
//!
//! - Stores hold opaque documents; they never interpret them
//! - Every file write is write-temp, fsync, rename, fsync-dir
//! - Upsert and remove are idempotent, remove of an absent subject succeeds
//! - A corrupt cursor is an error, never a silent reset
//!
//! ## Available Backends
//!
//! - [`MemoryContentStore`] / [`MemoryCursorStore`] - for tests
//! - [`DirectoryContentStore`] / [`FileCursorStore`] - persistent, one file per key
//!
//! ## Example
//!
//! ```rust
//! use feedsync_storage::{ContentStore, MemoryContentStore};
//!
//! let store = MemoryContentStore::new();
//! store.upsert("A", b"<x/>", 1).unwrap();
//! assert!(store.exists("A"));
//! store.remove("A").unwrap();
//! store.remove("A").unwrap(); // absent is fine
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod atomic;
mod content;
mod cursor;
mod directory;
mod error;
mod lock;
mod memory;

pub use content::{validate_subject_id, ContentStore, Record};
pub use cursor::{CursorStore, FileCursorStore, MemoryCursorStore};
pub use directory::DirectoryContentStore;
pub use error::{CursorStoreError, CursorStoreResult, StorageError, StorageResult};
pub use lock::InstallationLock;
pub use memory::MemoryContentStore;
