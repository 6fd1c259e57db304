//! Bounded exponential backoff.
//!
//! Retry `n` (0-based) waits `base_delay * 2^n`: with the defaults that is
//! 1 s, 2 s and 4 s before the second, third and fourth attempts. There is
//! no jitter and no deadline across attempts.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::GatewayError;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(0, DEFAULT_BASE_DELAY)
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Sum of every delay the policy can impose.
    pub fn worst_case_backoff(&self) -> Duration {
        (0..self.max_retries).fold(Duration::ZERO, |acc, n| {
            acc.saturating_add(self.delay_for(n))
        })
    }
}

/// Emitted before each retry sleep.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryNotice {
    /// 1-based number of the retry about to happen.
    pub attempt: u32,
    pub max_retries: u32,
    pub delay: Duration,
    pub error: GatewayError,
}

/// Receives retry notices, e.g. to show "retrying..." in a UI.
pub trait RetryObserver: Send + Sync {
    fn on_retry(&self, notice: &RetryNotice);
}

impl<F> RetryObserver for F
where
    F: Fn(&RetryNotice) + Send + Sync,
{
    fn on_retry(&self, notice: &RetryNotice) {
        self(notice)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy's retries are spent. The last error is returned unchanged.
pub async fn run<T, F, Fut>(
    policy: &RetryPolicy,
    observer: Option<&dyn RetryObserver>,
    mut op: F,
) -> Result<T, GatewayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    let mut retries = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.retryable() && retries < policy.max_retries => {
                let delay = policy.delay_for(retries);
                retries += 1;
                warn!(
                    kind = %err.kind,
                    attempt = retries,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "Request failed, retrying"
                );
                if let Some(observer) = observer {
                    observer.on_retry(&RetryNotice {
                        attempt: retries,
                        max_retries: policy.max_retries,
                        delay,
                        error: err,
                    });
                }
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
