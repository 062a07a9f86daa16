//! Exponential backoff for exchange calls.
//!
//! Transient failures are retried up to `max_attempts` in total, sleeping
//! `initial_backoff * 2^n` (capped at `max_backoff`) between attempts.
//! Permanent failures return immediately.

use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

use crate::ports::exchange_port::ExchangeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut call: F,
) -> Result<T, ExchangeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ExchangeError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut retry = 0;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_permanent() => {
                error!(operation, %err, "permanent exchange error");
                return Err(err);
            }
            Err(err) if retry + 1 >= attempts => {
                error!(operation, %err, attempts, "retries exhausted");
                return Err(err);
            }
            Err(err) => {
                let delay = policy.backoff(retry);
                warn!(operation, %err, retry, delay_ms = delay.as_millis() as u64, "retrying");
                tokio::time::sleep(delay).await;
                retry += 1;
            }
        }
    }
}
