//! Exponential backoff for container reads.

use crate::config::RetryPolicy;
use crate::error::Result;
use std::future::Future;
use tracing::{info, warn};

/// Run `operation` until it succeeds, fails fatally or attempts run out.
///
/// Only transient errors are retried. The delay grows by the policy's
/// multiplier after every failure; there is no sleep after the last attempt.
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    info!("Succeeded on attempt {}/{}", attempt, max_attempts);
                }
                return Ok(value);
            }
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let delay = policy.delay_after(attempt);
                warn!(
                    "Attempt {}/{} failed: {}. Retrying in {}ms",
                    attempt,
                    max_attempts,
                    e,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_transient() {
                    warn!("Giving up after {} attempts: {}", attempt, e);
                } else {
                    warn!("Non-retryable failure on attempt {}: {}", attempt, e);
                }
                return Err(e);
            }
        }
    }
}
