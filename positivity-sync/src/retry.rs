//! Bounded retry of backend calls.

use std::future::Future;

use positivity_core::{RetryConfig, SyncResult};
use tracing::warn;

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// configured attempts are spent. Makes at most `policy.attempts()` calls.
pub async fn with_retry<T, F, Fut>(policy: &RetryConfig, operation: &str, mut op: F) -> SyncResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = SyncResult<T>>,
{
    let attempts = policy.attempts();
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < attempts => {
                let delay = policy.backoff_for(attempt);
                warn!(
                    operation,
                    attempt,
                    attempts,
                    error = %err,
                    delay_ms = delay.as_millis() as u64,
                    "Backend call failed, retrying"
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
