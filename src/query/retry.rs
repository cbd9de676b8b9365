use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

/// Decides whether a failed attempt runs again, and after how long.
///
/// `failure_count` is 0-based: it is the number of failures that happened
/// before the one being judged.
pub trait RetryPolicy<E>: Send + Sync {
    fn should_retry(&self, failure_count: u32, error: &E) -> bool;

    fn retry_delay(&self, failure_count: u32) -> Duration;
}

/// Capped exponential schedule: `min(base * 2^n, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    pub fn from_millis(base_ms: u64, max_ms: u64) -> Self {
        Self::new(Duration::from_millis(base_ms), Duration::from_millis(max_ms))
    }

    /// Schedule with no waiting at all.
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn delay(&self, failure_count: u32) -> Duration {
        exponential_delay(self.base, self.max, failure_count)
    }
}

pub fn exponential_delay(base: Duration, max: Duration, failure_count: u32) -> Duration {
    let factor = 2u32.checked_pow(failure_count).unwrap_or(u32::MAX);
    base.checked_mul(factor).unwrap_or(max).min(max)
}

/// Outcome of a retried operation plus the failures it took to get there.
#[derive(Debug)]
pub struct Retried<T, E> {
    pub result: Result<T, E>,
    pub failure_count: u32,
}

/// Runs `op` until it succeeds or `policy` declines another attempt.
pub async fn run_with_retry<T, E, P, F, Fut>(policy: &P, label: &str, mut op: F) -> Retried<T, E>
where
    P: RetryPolicy<E> + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut failure_count = 0u32;
    loop {
        match op().await {
            Ok(value) => {
                if failure_count > 0 {
                    debug!("{} succeeded after {} failure(s)", label, failure_count);
                }
                return Retried {
                    result: Ok(value),
                    failure_count,
                };
            }
            Err(error) => {
                if !policy.should_retry(failure_count, &error) {
                    warn!(
                        "{} failed after {} attempt(s), not retrying: {}",
                        label,
                        failure_count + 1,
                        error
                    );
                    return Retried {
                        result: Err(error),
                        failure_count: failure_count + 1,
                    };
                }
                let delay = policy.retry_delay(failure_count);
                debug!(
                    "{} attempt {} failed, retrying in {:?}: {}",
                    label,
                    failure_count + 1,
                    delay,
                    error
                );
                failure_count += 1;
                sleep(delay).await;
            }
        }
    }
}
