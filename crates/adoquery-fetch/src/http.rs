use crate::error::{FetchError, Result};
use crate::{ContentFetcher, HttpMethod};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff policy for transient failures.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for each further retry.
    pub base_delay: Duration,
    /// Upper bound for a single delay.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryConfig {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// [`ContentFetcher`] over HTTPS with a personal access token.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    token: String,
    retry: RetryConfig,
}

impl HttpFetcher {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_timeout(token, Self::DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            token: token.into(),
            retry: RetryConfig::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    async fn request_once(
        &self,
        url: &str,
        method: HttpMethod,
        body: Option<&Value>,
        headers: &[(String, String)],
    ) -> Result<Value> {
        let mut request = self
            .client
            .request(method.into(), url)
            .basic_auth("", Some(&self.token))
            .header(reqwest::header::ACCEPT, "application/json");
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                FetchError::TransientNetworkFailure(e.to_string())
            } else {
                FetchError::Http(e)
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| FetchError::TransientNetworkFailure(e.to_string()))?;

        if !status.is_success() {
            return Err(FetchError::RemoteError {
                status: status.as_u16(),
                body: text,
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn request_with_retry(
        &self,
        url: &str,
        method: HttpMethod,
        body: Option<&Value>,
        headers: &[(String, String)],
    ) -> Result<Value> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            debug!(%url, ?method, attempt, "requesting");
            match self.request_once(url, method, body, headers).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(%url, attempt, ?delay, error = %e, "transient failure, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value> {
        self.request_with_retry(url, HttpMethod::Get, None, &[])
            .await
    }

    async fn send_json(
        &self,
        url: &str,
        method: HttpMethod,
        body: Option<&Value>,
        headers: &[(String, String)],
    ) -> Result<Value> {
        self.request_with_retry(url, method, body, headers).await
    }
}
