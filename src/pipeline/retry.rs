//! Exponential backoff + jitter, hand-rolled for async closures and gated
//! on [`ErrorKind`] rather than matching error strings.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::debug;

use crate::error::CoreError;

const BASE_DELAY_MS: u64 = 200;

/// Run `operation` up to `max_attempts` times. Only
/// [`crate::error::ErrorKind::UpstreamTransient`] failures are retried;
/// every other error kind returns immediately — deterministic errors
/// fail fast rather than retrying.
pub async fn retry_with_backoff<T, F, Fut>(max_attempts: u32, mut operation: F) -> Result<T, CoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CoreError>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.kind.is_retryable() && attempt + 1 < max_attempts => {
                let delay = backoff_delay_ms(attempt);
                debug!(attempt, delay_ms = delay, error = %err, "retrying after transient failure");
                tokio::time::sleep(Duration::from_millis(delay)).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

fn backoff_delay_ms(attempt: u32) -> u64 {
    let exp = BASE_DELAY_MS.saturating_mul(1u64 << attempt.min(10));
    let jitter = rand::thread_rng().gen_range(0..=exp / 4 + 1);
    exp + jitter
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transient_failures_until_success() {
        let attempts = AtomicU32::new(0);
        let result = retry_with_backoff(3, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(CoreError::upstream_transient("simulated"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn never_retries_validation_errors() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), CoreError> = retry_with_backoff(5, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(CoreError::validation("bad input")) }
        })
        .await;
        assert!(matches!(result.unwrap_err().kind, ErrorKind::Validation));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
