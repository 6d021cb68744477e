//! Shared blocking HTTP client for every source fetcher.
//!
//! Handles retries with exponential backoff, `Retry-After` on 429, and the
//! circuit breaker. Fetchers only see parsed JSON or a [`DataError`].

use super::circuit_breaker::CircuitBreaker;
use super::provider::DataError;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("deepbtc/", env!("CARGO_PKG_VERSION"));

/// Upper bound on a server-requested `Retry-After` wait.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Pause between consecutive requests of one fetch (pages, charts, series).
    pub request_pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            request_pause: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

pub struct HttpClient {
    client: reqwest::blocking::Client,
    breaker: Arc<CircuitBreaker>,
    policy: RetryPolicy,
}

impl HttpClient {
    pub fn new(
        timeout: Duration,
        policy: RetryPolicy,
        breaker: Arc<CircuitBreaker>,
    ) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DataError::NetworkUnreachable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            breaker,
            policy,
        })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn is_available(&self) -> bool {
        self.breaker.is_allowed()
    }

    /// Sleep for the configured inter-request pause.
    pub fn pause(&self) {
        if !self.policy.request_pause.is_zero() {
            std::thread::sleep(self.policy.request_pause);
        }
    }

    /// GET `url` with `query` and decode the body as JSON. A body that does
    /// not match `T` is a format error and is not retried.
    pub fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, DataError> {
        let body = self.get_text(url, query)?;
        serde_json::from_str(&body)
            .map_err(|e| DataError::ResponseFormatChanged(format!("failed to parse response from {url}: {e}")))
    }

    fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String, DataError> {
        if !self.breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        let mut last_error: Option<DataError> = None;
        let mut requested_wait = Duration::ZERO;

        for attempt in 0..=self.policy.max_retries {
            if attempt > 0 {
                let delay = self.policy.backoff(attempt).max(requested_wait);
                requested_wait = Duration::ZERO;
                if let Some(err) = &last_error {
                    warn!(url = %url, attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying request");
                }
                std::thread::sleep(delay);
            }

            if !self.breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }

            debug!(url = %url, attempt, "GET");
            match self.client.get(url).query(query).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == StatusCode::FORBIDDEN {
                        self.breaker.trip();
                        return Err(DataError::CircuitBreakerTripped);
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        self.breaker.record_failure();
                        let retry_after = resp
                            .headers()
                            .get(reqwest::header::RETRY_AFTER)
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.trim().parse::<u64>().ok())
                            .unwrap_or(60);
                        requested_wait = Duration::from_secs(retry_after).min(MAX_RETRY_AFTER);
                        last_error = Some(DataError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                        continue;
                    }

                    if status == StatusCode::UNAUTHORIZED {
                        return Err(DataError::AuthenticationRequired(format!(
                            "{url} rejected the request credentials"
                        )));
                    }

                    if !status.is_success() {
                        let err = DataError::HttpStatus {
                            status: status.as_u16(),
                            url: url.to_string(),
                        };
                        if !err.is_transient() {
                            return Err(err);
                        }
                        self.breaker.record_failure();
                        last_error = Some(err);
                        continue;
                    }

                    match resp.text() {
                        Ok(body) => {
                            self.breaker.record_success();
                            return Ok(body);
                        }
                        Err(e) => {
                            self.breaker.record_failure();
                            last_error = Some(DataError::NetworkUnreachable(format!(
                                "reading body from {url}: {e}"
                            )));
                        }
                    }
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() || e.is_request() {
                        self.breaker.record_failure();
                        last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(DataError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| DataError::NetworkUnreachable(format!("{url}: max retries exceeded"))))
    }
}
