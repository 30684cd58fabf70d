use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000))
    }
}

/// Value produced by [`fetch_with_retry`].
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub value: T,
    pub attempts: u32,
    /// True when every attempt failed and `value` is the fallback.
    pub exhausted: bool,
}

/// Runs an async read up to `policy.max_attempts` times, one attempt after the other
///
/// # Parameters
/// - `policy`: Attempt budget and the fixed delay between attempts
/// - `operation`: Closure returning a future
/// - `fallback`: Value returned once every attempt failed
///
/// # Returns
/// The first successful value, or the fallback. Errors are logged, never returned.
pub async fn fetch_with_retry<F, Fut, T, E>(
    policy: RetryPolicy,
    mut operation: F,
    fallback: T,
) -> Fetched<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 0;
    while attempt < policy.max_attempts {
        attempt += 1;
        match operation().await {
            Ok(value) => {
                return Fetched {
                    value,
                    attempts: attempt,
                    exhausted: false,
                };
            }
            Err(err) if attempt < policy.max_attempts => {
                debug!(
                    "Attempt {}/{} failed: {}. Retrying...",
                    attempt, policy.max_attempts, err
                );
                tokio::time::sleep(policy.backoff).await;
            }
            Err(err) => {
                warn!(
                    "All {} attempts failed, using fallback. Last error: {}",
                    policy.max_attempts, err
                );
            }
        }
    }

    Fetched {
        value: fallback,
        attempts: attempt,
        exhausted: true,
    }
}
