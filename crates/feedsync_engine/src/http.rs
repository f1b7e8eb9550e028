//! HTTP page fetcher.
//!
//! This module provides an HTTP-based fetcher for the sync engine.
//! The actual HTTP client is abstracted via a trait to allow different
//! implementations (reqwest, ureq, a canned client in tests, etc.).

use crate::error::{FetchError, FetchResult};
use crate::fetcher::PageFetcher;
use feedsync_protocol::{Cursor, FeedKind, Page, XmlPageParser};
use parking_lot::RwLock;

/// A raw HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a 200 response with the given body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP transport. Errors are
/// plain messages: anything the client cannot deliver becomes a retryable
/// [`FetchError::Transport`].
pub trait HttpClient: Send + Sync {
    /// Sends a GET request with the given query parameters.
    fn get(&self, url: &str, query: &[(&str, String)]) -> Result<HttpResponse, String>;
}

/// Where and as whom to fetch a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpFetcherConfig {
    /// Stream endpoint URL.
    pub endpoint: String,
    /// Installation ID sent as `install`.
    pub install_id: String,
    /// API key sent as `key`.
    pub api_key: String,
}

impl HttpFetcherConfig {
    /// Creates a configuration.
    pub fn new(
        endpoint: impl Into<String>,
        install_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            install_id: install_id.into(),
            api_key: api_key.into(),
        }
    }

    /// Creates a configuration pointing at a feed's default endpoint.
    pub fn for_feed(feed: FeedKind, install_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::new(feed.default_endpoint(), install_id, api_key)
    }
}

/// HTTP-based page fetcher.
///
/// Sends `key`, `install`, `limit` and, once a cursor exists, `lastId` as
/// query parameters and parses the XML body with the feed's page parser.
pub struct HttpFetcher<C: HttpClient> {
    config: HttpFetcherConfig,
    parser: XmlPageParser,
    client: C,
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpFetcher<C> {
    /// Creates a fetcher for `feed`.
    pub fn new(feed: FeedKind, config: HttpFetcherConfig, client: C) -> Self {
        Self::with_parser(config, feed.page_parser(), client)
    }

    /// Creates a fetcher with an explicit page parser.
    pub fn with_parser(config: HttpFetcherConfig, parser: XmlPageParser, client: C) -> Self {
        Self {
            config,
            parser,
            client,
            last_error: RwLock::new(None),
        }
    }

    /// Returns the endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Returns the last transport error message, if the last fetch failed.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Builds the query parameters for one fetch.
    pub fn query(&self, cursor: Option<&Cursor>, limit: u32) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("key", self.config.api_key.clone()),
            ("install", self.config.install_id.clone()),
        ];
        if let Some(cursor) = cursor {
            query.push(("lastId", cursor.to_string()));
        }
        query.push(("limit", limit.to_string()));
        query
    }

    fn set_error(&self, err: &str) {
        *self.last_error.write() = Some(err.to_string());
    }

    fn clear_error(&self) {
        *self.last_error.write() = None;
    }
}

impl<C: HttpClient> PageFetcher for HttpFetcher<C> {
    fn fetch(&self, cursor: Option<&Cursor>, limit: u32) -> FetchResult<Page> {
        let query = self.query(cursor, limit);
        tracing::debug!(
            endpoint = %self.config.endpoint,
            install = %self.config.install_id,
            last_id = ?cursor.map(Cursor::position),
            limit,
            "calling feed service"
        );

        let response = self.client.get(&self.config.endpoint, &query).map_err(|e| {
            self.set_error(&e);
            FetchError::transport_retryable(e)
        })?;

        if !response.is_success() {
            self.set_error(&format!("status {}", response.status));
            return Err(FetchError::Status {
                status: response.status,
            });
        }

        let page = self.parser.parse(&response.body).map_err(|e| {
            self.set_error(&e.to_string());
            FetchError::Body(e)
        })?;
        self.clear_error();
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct TestClient {
        response: Mutex<Result<HttpResponse, String>>,
        seen: Mutex<Vec<(String, Vec<(String, String)>)>>,
    }

    impl TestClient {
        fn new(response: Result<HttpResponse, String>) -> Self {
            Self {
                response: Mutex::new(response),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl HttpClient for TestClient {
        fn get(&self, url: &str, query: &[(&str, String)]) -> Result<HttpResponse, String> {
            self.seen.lock().push((
                url.to_string(),
                query
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
            ));
            self.response.lock().clone()
        }
    }

    fn fetcher(response: Result<HttpResponse, String>) -> HttpFetcher<TestClient> {
        HttpFetcher::new(
            FeedKind::Editorial,
            HttpFetcherConfig::new("https://feeds.example.com/stream.xml", "42", "secret"),
            TestClient::new(response),
        )
    }

    #[test]
    fn first_fetch_omits_last_id() {
        let fetcher = fetcher(Ok(HttpResponse::ok("<response><actions/></response>")));
        fetcher.fetch(None, 20).unwrap();

        let seen = fetcher.client.seen.lock();
        let (url, query) = &seen[0];
        assert_eq!(url, "https://feeds.example.com/stream.xml");
        assert_eq!(
            query,
            &vec![
                ("key".to_string(), "secret".to_string()),
                ("install".to_string(), "42".to_string()),
                ("limit".to_string(), "20".to_string()),
            ]
        );
    }

    #[test]
    fn later_fetch_sends_last_id() {
        let fetcher = fetcher(Ok(HttpResponse::ok("<response><actions/></response>")));
        let query = fetcher.query(Some(&Cursor::new(100)), 10);

        assert!(query.contains(&("lastId", "100".to_string())));
        assert!(query.contains(&("limit", "10".to_string())));
    }

    #[test]
    fn parses_body_into_page() {
        let body = r#"<response>
  <actions><action actionId="1" type="published"><article articleId="A"/></action></actions>
  <query-continue><parameter name="lastId">1</parameter></query-continue>
</response>"#;
        let page = fetcher(Ok(HttpResponse::ok(body))).fetch(None, 20).unwrap();

        assert_eq!(page.len(), 1);
        assert_eq!(page.next_cursor, Some(Cursor::new(1)));
    }

    #[test]
    fn client_failure_is_retryable_transport_error() {
        let fetcher = fetcher(Err("connection refused".into()));
        let err = fetcher.fetch(None, 20).unwrap_err();

        assert!(matches!(err, FetchError::Transport { .. }));
        assert!(err.is_retryable());
        assert_eq!(fetcher.last_error().as_deref(), Some("connection refused"));
    }

    #[test]
    fn non_success_status_is_reported() {
        let fetcher = fetcher(Ok(HttpResponse {
            status: 403,
            body: b"forbidden".to_vec(),
        }));
        let err = fetcher.fetch(None, 20).unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 403 }));
    }

    #[test]
    fn unparseable_body_is_body_error() {
        let fetcher = fetcher(Ok(HttpResponse::ok("<response>")));
        let err = fetcher.fetch(None, 20).unwrap_err();

        assert!(matches!(err, FetchError::Body(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn last_error_clears_only_after_a_parsed_page() {
        let fetcher = fetcher(Err("connection reset".into()));
        fetcher.fetch(None, 20).unwrap_err();
        assert_eq!(fetcher.last_error().as_deref(), Some("connection reset"));

        *fetcher.client.response.lock() = Ok(HttpResponse::ok("<response><actions>"));
        fetcher.fetch(None, 20).unwrap_err();
        let last = fetcher.last_error().unwrap();
        assert!(last.starts_with("invalid XML"), "{last}");

        *fetcher.client.response.lock() = Ok(HttpResponse::ok("<response><actions/></response>"));
        fetcher.fetch(None, 20).unwrap();
        assert_eq!(fetcher.last_error(), None);
    }

    #[test]
    fn endpoint_defaults_per_feed() {
        let config = HttpFetcherConfig::for_feed(FeedKind::Recommendations, "1", "k");
        assert_eq!(
            config.endpoint,
            "http://partner-api.editoreye.com/recommendations/stream.xml"
        );
    }
}
