//! Per-feed presets.
//!
//! The two partner feeds share one wire shape and differ only in their kind
//! vocabulary, the name of the continuation element and their defaults.

use crate::action::ActionKind;
use crate::decoder::{KindTable, TableDecoder};
use crate::xml::XmlPageParser;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A known feed type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    /// Editorial stream: `published` / `unpublished`.
    Editorial,
    /// Recommendations stream: `recommend` / `unrecommend`.
    Recommendations,
}

impl FeedKind {
    /// All known feeds.
    pub const ALL: [FeedKind; 2] = [FeedKind::Editorial, FeedKind::Recommendations];

    /// Returns the stable feed name.
    pub fn name(&self) -> &'static str {
        match self {
            FeedKind::Editorial => "editorial",
            FeedKind::Recommendations => "recommendations",
        }
    }

    /// Returns the kind lookup table for this feed.
    pub fn kind_table(&self) -> KindTable {
        match self {
            FeedKind::Editorial => KindTable::new()
                .with("published", ActionKind::Upsert)
                .with("unpublished", ActionKind::Remove),
            FeedKind::Recommendations => KindTable::new()
                .with("recommend", ActionKind::Upsert)
                .with("unrecommend", ActionKind::Remove),
        }
    }

    /// Returns a decoder for this feed.
    pub fn decoder(&self) -> TableDecoder {
        TableDecoder::new(self.kind_table())
    }

    /// Element name used for parameters inside `query-continue`.
    pub fn continuation_element(&self) -> &'static str {
        match self {
            FeedKind::Editorial => "parameter",
            FeedKind::Recommendations => "param",
        }
    }

    /// Returns a page parser for this feed.
    pub fn page_parser(&self) -> XmlPageParser {
        XmlPageParser::new(self.continuation_element())
    }

    /// Default stream endpoint.
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            FeedKind::Editorial => "http://partner-api.strategyeye.com/editorials/stream.xml",
            FeedKind::Recommendations => {
                "http://partner-api.editoreye.com/recommendations/stream.xml"
            }
        }
    }

    /// Default page size requested per fetch.
    pub fn default_page_limit(&self) -> u32 {
        match self {
            FeedKind::Editorial => 20,
            FeedKind::Recommendations => 10,
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FeedKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeedKind::ALL
            .into_iter()
            .find(|feed| feed.name() == s)
            .ok_or_else(|| format!("unknown feed {s:?} (expected editorial or recommendations)"))
    }
}
