//! Blocking reqwest implementation of the engine's HTTP client.

use feedsync_engine::{HttpClient, HttpResponse};
use std::time::Duration;

/// HTTP client backed by `reqwest::blocking`.
pub struct ReqwestClient {
    inner: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Builds a client with connect and request timeouts.
    pub fn new(connect_timeout: Duration, timeout: Duration) -> Result<Self, reqwest::Error> {
        let inner = reqwest::blocking::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .user_agent(concat!("feedsync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { inner })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str, query: &[(&str, String)]) -> Result<HttpResponse, String> {
        let response = self
            .inner
            .get(url)
            .query(query)
            .send()
            .map_err(|e| e.without_url().to_string())?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(|e| e.without_url().to_string())?;
        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}
