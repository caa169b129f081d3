//! Retry with exponential back-off and jitter for outbound HTTP calls.
//!
//! Only transport-level hiccups are retried. Local validation failures and
//! malformed bodies are returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::ApiError;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:** timeouts, connection failures, HTTP 429 and 5xx.
///
/// **Not retriable:** other 4xx, undecodable bodies, invalid base URLs and
/// anything rejected before sending.
pub(crate) fn is_retriable(err: &ApiError) -> bool {
    match err {
        ApiError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        ApiError::UnexpectedStatus { status, .. } => *status == 429 || (500..600).contains(status),
        ApiError::Deserialize { .. }
        | ApiError::InvalidBaseUrl { .. }
        | ApiError::InvalidCoordinate(_)
        | ApiError::MissingCategory
        | ApiError::PaginationLimit { .. } => false,
    }
}

const MAX_DELAY: Duration = Duration::from_secs(30);

/// Rate-limited responses wait at least this long, whatever the base.
const RATE_LIMIT_FLOOR: Duration = Duration::from_secs(1);

/// Delay before retry number `attempt` (1-based): `backoff_base_ms × 2^(attempt-1)`,
/// capped at [`MAX_DELAY`], then scaled by `jitter` (expected in `0.75..1.25`).
fn backoff_delay(attempt: u32, backoff_base_ms: u64, jitter: f64) -> Duration {
    let exponent = attempt.saturating_sub(1).min(10);
    let nominal = Duration::from_millis(backoff_base_ms.saturating_mul(1u64 << exponent));
    nominal.min(MAX_DELAY).mul_f64(jitter)
}

fn is_rate_limited(err: &ApiError) -> bool {
    err.status() == Some(429)
}

/// Runs `operation` once, then up to `max_retries` more times while it fails
/// with a retriable error. Waits grow exponentially with ±25 % jitter.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut last_err = match operation().await {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };

    for attempt in 1..=max_retries {
        if !is_retriable(&last_err) {
            break;
        }
        let jitter = 0.75 + rand::random::<f64>() * 0.5;
        let mut delay = backoff_delay(attempt, backoff_base_ms, jitter);
        if is_rate_limited(&last_err) {
            delay = delay.max(RATE_LIMIT_FLOOR);
        }
        tracing::warn!(
            attempt,
            max_retries,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %last_err,
            "transient HTTP error, retrying after back-off"
        );
        tokio::time::sleep(delay).await;

        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => last_err = err,
        }
    }

    Err(last_err)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn status_err(status: u16) -> ApiError {
        ApiError::UnexpectedStatus {
            status,
            url: "http://localhost/".to_owned(),
        }
    }

    #[test]
    fn server_errors_and_429_are_retriable() {
        assert!(is_retriable(&status_err(500)));
        assert!(is_retriable(&status_err(503)));
        assert!(is_retriable(&status_err(429)));
    }

    #[test]
    fn client_errors_are_not_retriable() {
        assert!(!is_retriable(&status_err(404)));
        assert!(!is_retriable(&status_err(400)));
        assert!(!is_retriable(&ApiError::MissingCategory));
    }

    #[test]
    fn deserialize_error_is_not_retriable() {
        let src = serde_json::from_str::<()>("invalid").unwrap_err();
        assert!(!is_retriable(&ApiError::Deserialize {
            context: "test".to_owned(),
            source: src,
        }));
    }

    #[test]
    fn delay_doubles_per_attempt() {
        assert_eq!(backoff_delay(1, 500, 1.0), Duration::from_millis(500));
        assert_eq!(backoff_delay(2, 500, 1.0), Duration::from_millis(1000));
        assert_eq!(backoff_delay(4, 500, 1.0), Duration::from_millis(4000));
    }

    #[test]
    fn delay_is_capped_before_jitter() {
        assert_eq!(backoff_delay(20, 500, 1.0), MAX_DELAY);
        assert_eq!(backoff_delay(20, 500, 1.25), Duration::from_millis(37_500));
        assert_eq!(backoff_delay(3, u64::MAX, 1.0), MAX_DELAY);
    }

    #[test]
    fn zero_base_means_no_wait() {
        assert_eq!(backoff_delay(3, 0, 1.2), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_retry_waits_at_least_the_floor() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let started = tokio::time::Instant::now();
        let result = retry_with_backoff(1, 0, || {
            let c = Arc::clone(&c);
            async move {
                if c.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(status_err(429))
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert!(started.elapsed() >= RATE_LIMIT_FLOOR);
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, ApiError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                let attempt = c.fetch_add(1, Ordering::SeqCst) + 1;
                if attempt < 3 {
                    Err(status_err(503))
                } else {
                    Ok(99)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(2, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(status_err(500))
            }
        })
        .await;
        assert!(matches!(
            result,
            Err(ApiError::UnexpectedStatus { status: 500, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3, "1 try + 2 retries");
    }

    #[tokio::test]
    async fn does_not_retry_not_found() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(status_err(404))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1, "404 must not be retried");
    }
}
