//! Bounded exponential backoff for completion requests.

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};

use crate::llm::error::LLMError;

/// How often, and how patiently, a failed request is retried.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial: Duration,
    max: Duration,
    factor: f64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial: Duration, max: Duration, factor: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial,
            max,
            factor,
        }
    }

    /// A policy that sends each request exactly once.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO, 1.0)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base =
            self.initial.as_millis() as f64 * self.factor.powi(attempt.saturating_sub(1) as i32);
        let clamped = base.min(self.max.as_millis() as f64);
        Duration::from_millis(clamped as u64)
    }

    /// Sends the request built by `build`, retrying transport failures,
    /// HTTP 429 and 5xx answers until the policy runs out of attempts.
    pub(crate) async fn send<F>(&self, build: F) -> Result<Response, LLMError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let last_error = match build().send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    if !is_retryable_status(status) {
                        return Err(LLMError::Api {
                            status: status.as_u16(),
                            body,
                        });
                    }
                    format!("HTTP {}: {}", status, body)
                }
                Err(e) if e.is_timeout() || e.is_connect() || e.is_request() => e.to_string(),
                Err(e) => return Err(LLMError::HttpError(e)),
            };

            if attempt >= self.max_attempts {
                return Err(LLMError::RetriesExhausted {
                    attempts: attempt,
                    last_error,
                });
            }

            let delay = self.delay_for(attempt);
            log::warn!(
                "Request attempt {}/{} failed ({}), retrying in {:?}",
                attempt,
                self.max_attempts,
                last_error,
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(4), Duration::from_secs(10), 2.0)
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}
