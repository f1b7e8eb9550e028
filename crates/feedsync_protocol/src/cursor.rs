//! Feed continuation cursor.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Progress marker for a paginated feed.
///
/// A cursor means "every event at or before this point has been applied".
/// The feeds hand out numeric action IDs as their continuation token, so the
/// cursor is a `u64` that renders and parses as plain decimal text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(u64);

impl Cursor {
    /// Creates a cursor from a raw position.
    #[must_use]
    pub const fn new(position: u64) -> Self {
        Self(position)
    }

    /// Returns the raw position.
    #[must_use]
    pub const fn position(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Cursor {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Self)
    }
}

impl From<u64> for Cursor {
    fn from(position: u64) -> Self {
        Self(position)
    }
}
