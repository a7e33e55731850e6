//! In-memory [`ContentFetcher`] for tests.

use crate::error::{FetchError, Result};
use crate::{ContentFetcher, HttpMethod};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Serves canned JSON by exact URL and records every request.
///
/// Unknown URLs answer with a 404 [`FetchError::RemoteError`]; URLs
/// registered with [`MockFetcher::with_failure`] answer with a transient
/// failure.
#[derive(Debug, Default)]
pub struct MockFetcher {
    responses: HashMap<String, Value>,
    failures: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, url: impl Into<String>, body: Value) -> Self {
        self.responses.insert(url.into(), body);
        self
    }

    pub fn with_failure(mut self, url: impl Into<String>, message: impl Into<String>) -> Self {
        self.failures.insert(url.into(), message.into());
        self
    }

    /// Every URL requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls().len()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == url).count()
    }

    fn respond(&self, url: &str) -> Result<Value> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());

        if let Some(message) = self.failures.get(url) {
            return Err(FetchError::TransientNetworkFailure(message.clone()));
        }
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::RemoteError {
                status: 404,
                body: format!("no canned response for {}", url),
            })
    }
}

#[async_trait]
impl ContentFetcher for MockFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value> {
        self.respond(url)
    }

    async fn send_json(
        &self,
        url: &str,
        _method: HttpMethod,
        _body: Option<&Value>,
        _headers: &[(String, String)],
    ) -> Result<Value> {
        self.respond(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_serves_and_records() {
        let fetcher = MockFetcher::new().with_response("https://x/a", json!({"id": "a"}));

        let value = fetcher.fetch_json("https://x/a").await.unwrap();
        assert_eq!(value["id"], "a");

        let err = fetcher.fetch_json("https://x/b").await.unwrap_err();
        assert!(err.is_not_found());

        assert_eq!(fetcher.calls(), vec!["https://x/a", "https://x/b"]);
        assert_eq!(fetcher.calls_to("https://x/a"), 1);
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let fetcher = MockFetcher::new().with_failure("https://x/down", "connection reset");
        let err = fetcher
            .send_json("https://x/down", HttpMethod::Post, Some(&json!({})), &[])
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }
}
