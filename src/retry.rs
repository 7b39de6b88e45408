//! Retry logic for store operations inside a room transaction:
//! exponential backoff with jitter, bounded attempts, and immediate
//! failure for errors that cannot heal on their own.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

/// Configuration for retry logic with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (first try included)
    pub max_attempts: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Amount of jitter to add (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(25),
            max_delay: Duration::from_millis(1000),
            backoff_multiplier: 2.0,
            jitter_factor: 0.15,
        }
    }
}

impl RetryConfig {
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }
}

/// Execute `operation` with retries on transient failures.
pub async fn retry_storage_operation<T, F, Fut>(
    config: &RetryConfig,
    operation_name: &str,
    operation: F,
) -> Result<T, anyhow::Error>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, anyhow::Error>>,
{
    let mut attempt = 1;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt, "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(error) => {
                if attempt >= config.max_attempts || !is_retryable(&error) {
                    return Err(error);
                }

                warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis(),
                    "Operation failed, retrying after delay: {error}"
                );
                sleep(delay).await;

                let next = Duration::from_millis(
                    (delay.as_millis() as f64 * config.backoff_multiplier) as u64,
                );
                delay = std::cmp::min(next, config.max_delay);
                if config.jitter_factor > 0.0 {
                    let jitter = (delay.as_millis() as f64 * config.jitter_factor) as u64;
                    delay += Duration::from_millis(fastrand::u64(0..=jitter));
                }
                attempt += 1;
            }
        }
    }
}

/// Transient-looking failures worth another attempt: serialization
/// conflicts, unique violations from races, connection hiccups.
fn is_retryable(error: &anyhow::Error) -> bool {
    let message = format!("{error:#}").to_lowercase();
    message.contains("serialization")
        || message.contains("conflict")
        || message.contains("deadlock")
        || message.contains("unique")
        || message.contains("already exists")
        || message.contains("connection")
        || message.contains("timeout")
}
