//! XML page codec.
//!
//! A stream response looks like:
//!
//! ```text
//! <response>
//!   <actions>
//!     <action actionId="1" type="published">
//!       <article articleId="A">...</article>
//!     </action>
//!   </actions>
//!   <query-continue>
//!     <parameter name="lastId">100</parameter>
//!   </query-continue>
//! </response>
//! ```
//!
//! `actions` may also be the document element itself. Each `article` element
//! found anywhere under an `action` becomes one [`RawSubject`]; its document
//! is the exact source text of the element.

use crate::cursor::Cursor;
use crate::error::{ParseError, ParseResult};
use crate::event::{Page, RawEvent, RawSubject};
use roxmltree::{Document, Node};

const ACTIONS: &str = "actions";
const ACTION: &str = "action";
const ACTION_ID_ATTR: &str = "actionId";
const ACTION_TYPE_ATTR: &str = "type";
const SUBJECT: &str = "article";
const SUBJECT_ID_ATTR: &str = "articleId";
const QUERY_CONTINUE: &str = "query-continue";
const CONTINUE_PARAM: &str = "lastId";

/// Parses one response body into a [`Page`].
#[derive(Debug, Clone)]
pub struct XmlPageParser {
    continuation_element: String,
}

impl XmlPageParser {
    /// Creates a parser that reads continuation parameters from elements
    /// with the given name (`parameter` or `param`).
    pub fn new(continuation_element: impl Into<String>) -> Self {
        Self {
            continuation_element: continuation_element.into(),
        }
    }

    /// Parses a response body.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The body is not UTF-8 or not well-formed XML
    /// - A `query-continue` block is present but does not hold exactly one
    ///   `lastId` parameter with a numeric value
    pub fn parse(&self, body: &[u8]) -> ParseResult<Page> {
        let text = std::str::from_utf8(body)?;
        let doc = Document::parse(text)?;
        let root = doc.root_element();

        let mut events = Vec::new();
        for actions in action_lists(root) {
            for action in child_elements(actions, ACTION) {
                events.push(raw_event(action, text));
            }
        }

        let next_cursor = self.continuation(root)?;

        Ok(Page::new(events, next_cursor))
    }

    fn continuation(&self, root: Node<'_, '_>) -> ParseResult<Option<Cursor>> {
        let blocks: Vec<_> = child_elements(root, QUERY_CONTINUE).collect();
        let block = match blocks.as_slice() {
            [] => return Ok(None),
            [block] => *block,
            _ => {
                return Err(ParseError::InvalidContinuation(format!(
                    "expected at most one block, found {}",
                    blocks.len()
                )))
            }
        };

        let params: Vec<_> = child_elements(block, &self.continuation_element)
            .filter(|node| node.attribute("name") == Some(CONTINUE_PARAM))
            .collect();

        let [param] = params.as_slice() else {
            return Err(ParseError::InvalidContinuation(format!(
                "does not contain exactly one {CONTINUE_PARAM} {}",
                self.continuation_element
            )));
        };

        let value = param.text().unwrap_or_default().trim();
        value.parse::<Cursor>().map(Some).map_err(|_| {
            ParseError::InvalidContinuation(format!("{CONTINUE_PARAM} {value:?} is not numeric"))
        })
    }
}

fn action_lists<'a, 'input>(root: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
    if root.has_tag_name(ACTIONS) {
        vec![root]
    } else {
        child_elements(root, ACTIONS).collect()
    }
}

fn child_elements<'a, 'input: 'a>(
    parent: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    parent
        .children()
        .filter(move |node| node.is_element() && node.has_tag_name(name))
}

fn raw_event(action: Node<'_, '_>, source: &str) -> RawEvent {
    let subjects = action
        .descendants()
        .filter(|node| node.is_element() && node.has_tag_name(SUBJECT))
        .map(|node| {
            RawSubject::new(
                node.attribute(SUBJECT_ID_ATTR).unwrap_or_default(),
                source[node.range()].as_bytes().to_vec(),
            )
        })
        .collect();

    RawEvent {
        declared_id: action.attribute(ACTION_ID_ATTR).unwrap_or_default().to_string(),
        kind: action.attribute(ACTION_TYPE_ATTR).unwrap_or_default().to_string(),
        subjects,
    }
}
