#![doc = include_str!("../README.md")]

pub mod endpoints;
pub mod error;
pub mod http;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use endpoints::{Endpoints, expand_url};
pub use error::{FetchError, Result};
pub use http::{HttpFetcher, RetryConfig};

use async_trait::async_trait;
use serde_json::Value;

/// HTTP verbs the REST API is called with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Authenticated JSON access to the work-tracking service.
///
/// Implementations own their credential and any retry policy; callers treat
/// every error they get back as final.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// GET `url` and parse the body as JSON.
    async fn fetch_json(&self, url: &str) -> Result<Value>;

    /// Issue `method` against `url` with an optional JSON body and extra
    /// headers, and parse the response as JSON.
    async fn send_json(
        &self,
        url: &str,
        method: HttpMethod,
        body: Option<&Value>,
        headers: &[(String, String)],
    ) -> Result<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_conversion() {
        assert_eq!(reqwest::Method::from(HttpMethod::Get), reqwest::Method::GET);
        assert_eq!(
            reqwest::Method::from(HttpMethod::Patch),
            reqwest::Method::PATCH
        );
    }
}
