//! Retry with exponential backoff and jitter
//!
//! Used by storage backends for the request phase of list, head and get.
//! The transfer pipeline itself never retries a job.

use std::future::Future;
use std::time::Duration;

use crate::alias::RetryConfig;
use crate::error::{Error, Result};

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// `config.max_attempts` is reached.
pub async fn retry_with_backoff<T, F, Fut, R>(
    config: &RetryConfig,
    label: &str,
    mut operation: F,
    is_retryable: R,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    R: Fn(&Error) -> bool,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts && is_retryable(&e) => {
                let backoff = backoff_for(config, attempt);
                tracing::debug!(
                    operation = label,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "Transient failure, retrying"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// `initial * 2^(attempt-1)`, capped at `max_backoff_ms`, plus up to the
/// same amount again as jitter.
fn backoff_for(config: &RetryConfig, attempt: u32) -> Duration {
    let shift = attempt.saturating_sub(1).min(16);
    let base = config
        .initial_backoff_ms
        .saturating_mul(1u64 << shift)
        .min(config.max_backoff_ms);
    Duration::from_millis(base + jitter(base))
}

fn jitter(max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or_default();
    nanos % max
}

/// Transient failures worth another attempt
pub fn is_retryable_error(error: &Error) -> bool {
    match error {
        Error::Network(msg) => {
            let msg = msg.to_lowercase();
            [
                "timeout",
                "timed out",
                "connection reset",
                "connection refused",
                "dispatch",
                "503",
                "service unavailable",
                "429",
                "too many requests",
                "slow down",
                "slowdown",
                "internalerror",
            ]
            .iter()
            .any(|needle| msg.contains(needle))
        }
        Error::Io(e) => matches!(
            e.kind(),
            std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::TimedOut
                | std::io::ErrorKind::Interrupted
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 4,
        }
    }

    #[test]
    fn test_backoff_doubles_then_caps() {
        let config = RetryConfig {
            max_attempts: 10,
            initial_backoff_ms: 100,
            max_backoff_ms: 1000,
        };
        let first = backoff_for(&config, 1).as_millis();
        assert!((100..200).contains(&first));
        let third = backoff_for(&config, 3).as_millis();
        assert!((400..800).contains(&third));
        let late = backoff_for(&config, 30).as_millis();
        assert!((1000..2000).contains(&late));
    }

    #[test]
    fn test_classification() {
        assert!(is_retryable_error(&Error::Network("Request timeout".into())));
        assert!(is_retryable_error(&Error::Network(
            "Service error: SlowDown (code: SlowDown)".into()
        )));
        assert!(!is_retryable_error(&Error::Network("bad signature".into())));
        assert!(!is_retryable_error(&Error::NotFound("a/b/c".into())));
        assert!(!is_retryable_error(&Error::AccessDenied("a/b/c".into())));
        assert!(!is_retryable_error(&Error::IsDirectory("a/b/c".into())));
        assert!(is_retryable_error(&Error::Io(std::io::Error::from(
            std::io::ErrorKind::ConnectionReset
        ))));
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let value = retry_with_backoff(
            &fast(),
            "get_object",
            || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(Error::Network("connection reset by peer".into()))
                    } else {
                        Ok("body")
                    }
                }
            },
            is_retryable_error,
        )
        .await
        .unwrap();

        assert_eq!(value, "body");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let mut calls = 0;
        let result: Result<()> = retry_with_backoff(
            &fast(),
            "list_objects",
            || {
                calls += 1;
                async { Err(Error::Network("503 Service Unavailable".into())) }
            },
            is_retryable_error,
        )
        .await;

        assert!(matches!(result, Err(Error::Network(_))));
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let mut calls = 0;
        let result: Result<()> = retry_with_backoff(
            &fast(),
            "head_object",
            || {
                calls += 1;
                async { Err(Error::AccessDenied("play/private/key".into())) }
            },
            is_retryable_error,
        )
        .await;

        assert!(matches!(result, Err(Error::AccessDenied(_))));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let config = RetryConfig {
            max_attempts: 0,
            ..fast()
        };
        let mut calls = 0;
        let result = retry_with_backoff(
            &config,
            "head_object",
            || {
                calls += 1;
                async { Ok::<_, Error>(7) }
            },
            is_retryable_error,
        )
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls, 1);
    }
}
