use std::time::Duration;

use marquee_domain::{MarqueeError, Result};
use reqwest::{Client as ReqwestClient, Response, StatusCode};
use tracing::{debug, warn};

use crate::errors::InfraError;

/// HTTP fetcher with built-in retry, timeout and status classification.
///
/// `fetch` resolves every terminal failure to `Ok(None)` rather than an
/// error: the sync engine treats an unreachable or refusing upstream as
/// "nothing to fetch", logs it, and carries on. Only request construction
/// problems (a malformed URL) surface as `Err`.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    max_attempts: usize,
    base_backoff: Duration,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Issue a GET with retry semantics, classifying the outcome.
    ///
    /// - 2xx: the response
    /// - 404: absent, no retry (resource genuinely missing)
    /// - other 4xx: absent, no retry (client error)
    /// - 5xx and network-level failures: retried with exponential
    ///   backoff; absent once attempts are exhausted
    pub async fn fetch(&self, url: &str) -> Result<Option<Response>> {
        let attempts = self.max_attempts.max(1);

        for attempt in 1..=attempts {
            debug!(attempt, url, "sending HTTP request");

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    debug!(attempt, url, %status, "received HTTP response");

                    if status.is_success() {
                        return Ok(Some(response));
                    }

                    if status == StatusCode::NOT_FOUND {
                        debug!(url, "resource not found, not retrying");
                        return Ok(None);
                    }

                    if status.is_client_error() {
                        warn!(url, %status, "client error from upstream, not retrying");
                        return Ok(None);
                    }

                    // Server error: retryable until attempts run out.
                    if attempt < attempts {
                        warn!(attempt, url, %status, "server error, retrying after backoff");
                        self.sleep_with_backoff(attempt).await;
                        continue;
                    }

                    warn!(url, %status, attempts, "retries exhausted on server error");
                    return Ok(None);
                }
                Err(err) => {
                    if err.is_builder() {
                        let infra: InfraError = err.into();
                        return Err(MarqueeError::from(infra));
                    }

                    if attempt < attempts && should_retry_error(&err) {
                        warn!(attempt, url, error = %err, "request failed, retrying after backoff");
                        self.sleep_with_backoff(attempt).await;
                        continue;
                    }

                    warn!(url, error = %err, attempts, "request failed terminally");
                    return Ok(None);
                }
            }
        }

        Ok(None)
    }

    fn backoff_delay(&self, retry_number: usize) -> Duration {
        let shift = retry_number.saturating_sub(1).min(8) as u32;
        let multiplier = 1u32 << shift;
        self.base_backoff.saturating_mul(multiplier)
    }

    async fn sleep_with_backoff(&self, retry_number: usize) {
        let delay = self.backoff_delay(retry_number);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: usize,
    base_backoff: Duration,
    user_agent: Option<String>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_attempts: 3,
            base_backoff: Duration::from_secs(2),
            user_agent: None,
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configure the total number of attempts (initial try + retries).
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<HttpClient> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        let client = builder.build().map_err(|err| {
            let infra: InfraError = err.into();
            MarqueeError::from(infra)
        })?;

        Ok(HttpClient {
            client,
            max_attempts: self.max_attempts.max(1),
            base_backoff: self.base_backoff,
        })
    }
}

fn should_retry_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
