use std::fmt::Display;
use std::future::Future;

use crate::data::RetryPolicy;
use crate::error::Transient;

/// Run `op` with bounded retries and exponential backoff.
///
/// Only errors classified [`Transient`] are retried; anything else
/// propagates immediately. Exhausting the attempt budget propagates the
/// last transient error to the caller.
pub async fn with_backoff<T, E, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, E>
where
    E: Transient + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay(attempt);
                tracing::warn!(attempt, "waiting {}s because: {e}", delay.as_secs());
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::error::HttpError;

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_are_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, HttpError> = with_backoff(RetryPolicy::new(3, 2), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(HttpError::Connect("reset".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_delays_grow_exponentially() {
        let calls = AtomicU32::new(0);
        let start = tokio::time::Instant::now();
        let result: Result<(), HttpError> = with_backoff(RetryPolicy::new(3, 2), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(HttpError::Timeout) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Slept 2^1 + 2^2 seconds between the three attempts.
        assert_eq!(start.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_errors_propagate_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), HttpError> = with_backoff(RetryPolicy::new(5, 2), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(HttpError::Status { code: 403 }) }
        })
        .await;
        assert!(matches!(result, Err(HttpError::Status { code: 403 })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_transient_error_propagates_after_budget() {
        let result: Result<(), HttpError> =
            with_backoff(RetryPolicy::new(2, 2), || async {
                Err(HttpError::Connect("refused".into()))
            })
            .await;
        assert!(matches!(result, Err(HttpError::Connect(_))));
    }
}
