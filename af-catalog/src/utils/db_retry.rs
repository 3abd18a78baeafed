//! Database retry logic
//!
//! Exponential backoff for transient lock errors on the catalog store. The
//! total retry window is the configured `max_lock_wait_ms`.

use af_common::{Error, Result};
use std::future::Future;
use std::time::{Duration, Instant};

/// First backoff sleep
const INITIAL_BACKOFF_MS: u64 = 10;
/// Longest single backoff sleep
const MAX_BACKOFF_MS: u64 = 1000;

/// Retry a store operation while it fails with a lock error
///
/// Backoff starts at 10ms and doubles up to 1000ms per sleep. Once
/// `max_wait_ms` has elapsed the lock error is reported as
/// `Error::StoreUnavailable`. Any other error is returned immediately.
pub async fn retry_on_lock<F, Fut, T>(operation_name: &str, max_wait_ms: u64, operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_with_backoff(operation_name, max_wait_ms, Error::is_lock_error, operation).await
}

/// Retry an operation while `is_retryable` accepts its error
async fn retry_with_backoff<F, Fut, T, P>(
    operation_name: &str,
    max_wait_ms: u64,
    is_retryable: P,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&Error) -> bool,
{
    let start_time = Instant::now();
    let max_duration = Duration::from_millis(max_wait_ms);
    let mut attempt = 0u32;
    let mut backoff_ms = INITIAL_BACKOFF_MS;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        "Store operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) if !is_retryable(&err) => return Err(err),
            Err(err) => {
                let elapsed = start_time.elapsed();

                if elapsed >= max_duration {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = elapsed.as_millis() as u64,
                        max_wait_ms,
                        "Store still locked, giving up"
                    );
                    return Err(Error::StoreUnavailable(format!(
                        "{} locked after {} attempts ({} ms elapsed, max {} ms): {}",
                        operation_name,
                        attempt,
                        elapsed.as_millis(),
                        max_wait_ms,
                        err
                    )));
                }

                // Never sleep past the end of the retry window
                let remaining = max_duration.saturating_sub(elapsed);
                let sleep = Duration::from_millis(backoff_ms).min(remaining);

                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms = sleep.as_millis() as u64,
                    remaining_ms = remaining.as_millis() as u64,
                    "Store locked, retrying after backoff"
                );

                tokio::time::sleep(sleep).await;
                backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
            }
        }
    }
}
