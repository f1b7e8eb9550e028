//! Wire test vectors for the partner feeds.
//!
//! Each vector is a response body as a feed serves it, with the events and
//! continuation the page parser must extract, or the failure it must report.

use feedsync_protocol::FeedKind;

/// An event expected from a vector: `(declared_id, kind, subject_ids)`.
pub type ExpectedEvent = (&'static str, &'static str, &'static [&'static str]);

/// A response body with its expected parse.
#[derive(Debug, Clone)]
pub struct FeedVector {
    /// Unique identifier for this vector.
    pub id: &'static str,
    /// Human-readable description.
    pub description: &'static str,
    /// Feed whose parser applies.
    pub feed: FeedKind,
    /// Response body.
    pub body: &'static str,
    /// Events in order.
    pub events: &'static [ExpectedEvent],
    /// Declared continuation.
    pub next_cursor: Option<u64>,
    /// True if parsing must fail.
    pub expect_error: bool,
}

/// Response bodies covering both feeds' shapes and their failure modes.
pub fn feed_vectors() -> Vec<FeedVector> {
    vec![
        FeedVector {
            id: "editorial_page",
            description: "Editorial page with a continuation",
            feed: FeedKind::Editorial,
            body: r#"<?xml version="1.0" encoding="UTF-8"?>
<response>
  <actions>
    <action actionId="101" type="published">
      <article articleId="A"><title>Rates</title><body>text</body></article>
    </action>
    <action actionId="102" type="unpublished">
      <article articleId="B"/>
    </action>
  </actions>
  <query-continue>
    <parameter name="lastId">102</parameter>
  </query-continue>
</response>"#,
            events: &[("101", "published", &["A"]), ("102", "unpublished", &["B"])],
            next_cursor: Some(102),
            expect_error: false,
        },
        FeedVector {
            id: "editorial_last_page",
            description: "Editorial page without query-continue",
            feed: FeedKind::Editorial,
            body: r#"<response><actions>
  <action actionId="103" type="published"><article articleId="C"/></action>
</actions></response>"#,
            events: &[("103", "published", &["C"])],
            next_cursor: None,
            expect_error: false,
        },
        FeedVector {
            id: "recommendations_page",
            description: "Recommendations page uses the param element",
            feed: FeedKind::Recommendations,
            body: r#"<response>
  <actions>
    <action actionId="7" type="recommend"><article articleId="R1"/></action>
  </actions>
  <query-continue><param name="lastId">7</param></query-continue>
</response>"#,
            events: &[("7", "recommend", &["R1"])],
            next_cursor: Some(7),
            expect_error: false,
        },
        FeedVector {
            id: "actions_as_root",
            description: "The actions element may be the document element",
            feed: FeedKind::Recommendations,
            body: r#"<actions><action actionId="8" type="unrecommend"><article articleId="R1"/></action></actions>"#,
            events: &[("8", "unrecommend", &["R1"])],
            next_cursor: None,
            expect_error: false,
        },
        FeedVector {
            id: "two_subjects",
            description: "An action with two articles parses; decoding rejects it",
            feed: FeedKind::Editorial,
            body: r#"<response><actions>
  <action actionId="9" type="published"><article articleId="X"/><article articleId="Y"/></action>
</actions></response>"#,
            events: &[("9", "published", &["X", "Y"])],
            next_cursor: None,
            expect_error: false,
        },
        FeedVector {
            id: "wrong_continuation_element",
            description: "Editorial parser does not accept the param element",
            feed: FeedKind::Editorial,
            body: r#"<response><actions/><query-continue><param name="lastId">5</param></query-continue></response>"#,
            events: &[],
            next_cursor: None,
            expect_error: true,
        },
        FeedVector {
            id: "non_numeric_continuation",
            description: "Continuation must be a numeric ID",
            feed: FeedKind::Editorial,
            body: r#"<response><actions/><query-continue><parameter name="lastId">abc</parameter></query-continue></response>"#,
            events: &[],
            next_cursor: None,
            expect_error: true,
        },
        FeedVector {
            id: "truncated_body",
            description: "Truncated XML",
            feed: FeedKind::Recommendations,
            body: "<response><actions><action actionId=\"1\"",
            events: &[],
            next_cursor: None,
            expect_error: true,
        },
    ]
}
