//! Retry logic with exponential backoff
//!
//! Circuit breaking lives in [`crate::circuit_breaker`]; this module only
//! covers per-call retry policy, used by capability adapters wrapping
//! outbound HTTP to indexers and download clients.

use crate::error::{CoreError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Quick retries for API calls (search, capability status polls).
    pub fn quick() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }

    /// Slow retries for downloader mutation calls (add/remove).
    pub fn slow() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(300),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Retry policy determines which errors should be retried
#[derive(Debug, Clone, Copy)]
pub enum RetryPolicy {
    All,
    Transient,
    Never,
}

/// Execute an async operation with retry logic
pub async fn retry_with_backoff<F, Fut, T>(
    config: RetryConfig,
    policy: RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        attempt += 1;
        debug!(
            "attempting {} (attempt {}/{})",
            operation_name, attempt, config.max_attempts
        );

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", operation_name, attempt);
                }
                return Ok(result);
            }
            Err(err) => {
                if !should_retry(&err, policy) {
                    debug!(
                        "{} failed with non-retryable error: {}",
                        operation_name, err
                    );
                    return Err(err);
                }

                if attempt >= config.max_attempts {
                    error!(
                        "{} failed after {} attempts: {}",
                        operation_name, config.max_attempts, err
                    );
                    return Err(CoreError::RetryExhausted {
                        operation: operation_name.to_string(),
                        attempts: config.max_attempts,
                        last_error: Box::new(err),
                    });
                }

                warn!(
                    "{} failed on attempt {}/{}: {}. retrying in {:?}",
                    operation_name, attempt, config.max_attempts, err, delay
                );

                sleep(delay).await;
                delay = calculate_next_delay(delay, &config);
            }
        }
    }
}

fn should_retry(error: &CoreError, policy: RetryPolicy) -> bool {
    match policy {
        RetryPolicy::Never => false,
        RetryPolicy::All => true,
        RetryPolicy::Transient => matches!(
            error,
            CoreError::NetworkError { .. }
                | CoreError::Timeout { .. }
                | CoreError::ExternalServiceError { .. }
                | CoreError::TemporaryError { .. }
        ),
    }
}

fn calculate_next_delay(current: Duration, config: &RetryConfig) -> Duration {
    let mut next = current.mul_f64(config.backoff_multiplier);

    if next > config.max_delay {
        next = config.max_delay;
    }

    if config.jitter {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let jitter_factor = rng.gen_range(0.5..1.5);
        next = next.mul_f64(jitter_factor);
    }

    next
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn succeeds_on_second_attempt() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;

        let attempt = Arc::new(AtomicU32::new(0));
        let config = RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(10),
            ..Default::default()
        };

        let attempt_clone = attempt.clone();
        let result = retry_with_backoff(config, RetryPolicy::All, "test_operation", move || {
            let attempt = attempt_clone.clone();
            async move {
                let current_attempt = attempt.fetch_add(1, Ordering::SeqCst) + 1;
                if current_attempt == 2 {
                    Ok(42)
                } else {
                    Err(CoreError::TemporaryError {
                        message: "simulated failure".to_string(),
                    })
                }
            }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn exhausts_after_max_attempts() {
        let config = RetryConfig {
            max_attempts: 2,
            initial_delay: Duration::from_millis(10),
            ..Default::default()
        };

        let result: Result<()> =
            retry_with_backoff(config, RetryPolicy::All, "test_operation", || async {
                Err(CoreError::TemporaryError {
                    message: "always fails".to_string(),
                })
            })
            .await;

        assert!(matches!(result, Err(CoreError::RetryExhausted { .. })));
    }

    #[tokio::test]
    async fn never_policy_returns_immediately() {
        let config = RetryConfig::default();
        let mut calls = 0;
        let result: Result<()> =
            retry_with_backoff(config, RetryPolicy::Never, "test_operation", || {
                calls += 1;
                async { Err(CoreError::TemporaryError { message: "x".into() }) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
