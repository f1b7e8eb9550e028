//! Property-based test generators using proptest.
//!
//! Provides strategies for generating feed histories together with the
//! store state they should converge to.

use crate::feed::EventLogFetcher;
use crate::fixtures::article_document;
use feedsync_protocol::FeedKind;
use proptest::prelude::*;
use std::collections::BTreeMap;

/// One change in a generated feed history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedOp {
    /// Publish or update a subject.
    Upsert {
        /// Subject ID.
        subject_id: String,
        /// Document body inside the article element.
        body: String,
    },
    /// Withdraw a subject.
    Remove {
        /// Subject ID.
        subject_id: String,
    },
}

/// Strategy for subject IDs drawn from a small pool, so histories revisit
/// the same subjects often.
pub fn subject_id_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["A", "B", "C", "D", "article-7", "article-999"])
        .prop_map(str::to_string)
}

/// Strategy for document bodies.
pub fn body_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z0-9 ]{0,24}").expect("Invalid regex")
}

/// Strategy for a single feed change.
pub fn feed_op_strategy() -> impl Strategy<Value = FeedOp> {
    prop_oneof![
        3 => (subject_id_strategy(), body_strategy())
            .prop_map(|(subject_id, body)| FeedOp::Upsert { subject_id, body }),
        1 => subject_id_strategy().prop_map(|subject_id| FeedOp::Remove { subject_id }),
    ]
}

/// Strategy for a feed history.
pub fn feed_history_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<FeedOp>> {
    prop::collection::vec(feed_op_strategy(), min_ops..max_ops)
}

/// Strategy for page sizes.
pub fn page_limit_strategy() -> impl Strategy<Value = u32> {
    1u32..8
}

/// Appends `ops` to `fetcher`, numbering them from `first_id`.
///
/// Returns the next unused ID.
pub fn append_history(fetcher: &EventLogFetcher, first_id: u64, ops: &[FeedOp]) -> u64 {
    let mut id = first_id;
    for op in ops {
        match op {
            FeedOp::Upsert { subject_id, body } => {
                fetcher.push_upsert(id, subject_id, &article_document(subject_id, body));
            }
            FeedOp::Remove { subject_id } => fetcher.push_remove(id, subject_id),
        }
        id += 1;
    }
    id
}

/// Builds an event log holding `ops` with IDs `1..=ops.len()`.
pub fn history_fetcher(feed: FeedKind, ops: &[FeedOp]) -> EventLogFetcher {
    let fetcher = EventLogFetcher::new(feed);
    append_history(&fetcher, 1, ops);
    fetcher
}

/// Computes the store contents after applying `ops` in order.
pub fn expected_documents(ops: &[FeedOp]) -> BTreeMap<String, Vec<u8>> {
    let mut state = BTreeMap::new();
    for op in ops {
        match op {
            FeedOp::Upsert { subject_id, body } => {
                state.insert(
                    subject_id.clone(),
                    article_document(subject_id, body).into_bytes(),
                );
            }
            FeedOp::Remove { subject_id } => {
                state.remove(subject_id);
            }
        }
    }
    state
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
