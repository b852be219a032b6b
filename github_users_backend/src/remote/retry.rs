use crate::config::HttpConfig;
use rand::Rng;
use reqwest::header::RETRY_AFTER;
use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tokio::time::sleep;

/// Exponential backoff for server errors, rate limiting and transient
/// transport failures. Every other outcome is handed back untouched.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(http: &HttpConfig) -> Self {
        Self {
            max_retries: http.max_retries,
            base_delay: http.retry_base_delay,
            max_delay: http.retry_max_delay,
        }
    }

    pub fn should_retry_status(status: StatusCode) -> bool {
        status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
    }

    fn is_transient(err: &reqwest::Error) -> bool {
        err.is_timeout() || err.is_connect()
    }

    /// Delay before retry number `attempt + 1`: `base * 2^attempt`, capped,
    /// plus up to a quarter of that as jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponential = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay);
        let jitter_ms = (exponential.as_millis() / 4) as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
        };
        (exponential + jitter).min(self.max_delay)
    }

    /// Sends the request built by `build`, rebuilding it for every retry.
    pub async fn send<F>(&self, build: F) -> Result<Response, reqwest::Error>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            match build().send().await {
                Ok(response)
                    if attempt < self.max_retries
                        && Self::should_retry_status(response.status()) =>
                {
                    let delay = retry_after(&response)
                        .map(|delay| delay.min(self.max_delay))
                        .unwrap_or_else(|| self.backoff(attempt));
                    tracing::warn!(
                        status = %response.status(),
                        url = %response.url(),
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "retrying GitHub request"
                    );
                    sleep(delay).await;
                }
                Ok(response) => return Ok(response),
                Err(err) if attempt < self.max_retries && Self::is_transient(&err) => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        error = %err,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "retrying GitHub request after transport error"
                    );
                    sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
            attempt += 1;
        }
    }
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
