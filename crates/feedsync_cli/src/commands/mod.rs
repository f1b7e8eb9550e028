//! CLI command implementations.

pub mod cursor;
pub mod inspect;
pub mod sync;
