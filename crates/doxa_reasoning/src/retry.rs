//! Retry with exponential backoff for provider HTTP calls.
//!
//! Retries on 408, 429, 5xx gateway/server errors and network failures.
//! Client errors (400, 401, 403, 404) fail on the first attempt.

use anyhow::Result;
use rand::Rng;
use reqwest::{Response, StatusCode};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on the backoff delay (jitter excluded).
    pub max_delay: Duration,
    pub backoff_factor: f64,
    /// Upper bound of the random extra delay added to each retry.
    pub max_jitter: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
            max_jitter: Duration::from_millis(500),
        }
    }
}

impl RetryConfig {
    /// Backoff before retry number `retry` (1-based), without jitter.
    pub fn backoff(&self, retry: u32) -> Duration {
        let exp = self.backoff_factor.powi(retry.saturating_sub(1) as i32);
        let secs = (self.initial_delay.as_secs_f64() * exp).min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(secs.max(0.0))
    }

    fn jitter(&self) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..max_ms))
    }
}

pub fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::REQUEST_TIMEOUT
            | StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Run `operation` until it yields a successful response, a non-retryable
/// status, or `max_attempts` is exhausted.
pub async fn with_retry<F, Fut>(config: &RetryConfig, provider_name: &str, operation: F) -> Result<Response>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<Response>>,
{
    let mut last_error = None;

    for attempt in 1..=config.max_attempts {
        match operation().await {
            Ok(response) if response.status().is_success() => {
                if attempt > 1 {
                    tracing::info!("{} succeeded on attempt {}", provider_name, attempt);
                }
                return Ok(response);
            }
            Ok(response) => {
                let status = response.status();
                let error_text = response.text().await.unwrap_or_default();
                if !is_retryable_status(status) {
                    anyhow::bail!("{} API error ({}): {}", provider_name, status, error_text);
                }
                tracing::warn!(
                    "{} returned {} on attempt {}/{}: {}",
                    provider_name,
                    status,
                    attempt,
                    config.max_attempts,
                    error_text.chars().take(200).collect::<String>()
                );
                last_error = Some(format!("{} ({}): {}", provider_name, status, error_text));
            }
            Err(e) => {
                tracing::warn!(
                    "{} network error on attempt {}/{}: {}",
                    provider_name,
                    attempt,
                    config.max_attempts,
                    e
                );
                last_error = Some(format!("{}: {}", provider_name, e));
            }
        }

        if attempt < config.max_attempts {
            let sleep_time = config.backoff(attempt) + config.jitter();
            tracing::info!(
                "{} retrying in {:.1}s (attempt {}/{})",
                provider_name,
                sleep_time.as_secs_f64(),
                attempt + 1,
                config.max_attempts
            );
            tokio::time::sleep(sleep_time).await;
        }
    }

    anyhow::bail!(
        "All {} attempts exhausted. Last error: {}",
        config.max_attempts,
        last_error.unwrap_or_else(|| "unknown".to_string())
    )
}
