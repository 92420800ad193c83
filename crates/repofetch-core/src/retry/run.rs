//! Retry loop: run an attempt until success or policy says stop.

use super::classify;
use super::error::{AttemptFailure, FetchError};
use super::policy::{RetryDecision, RetryPolicy};

/// Runs `f` until it succeeds or the retry policy says to stop.
/// `f` receives the 1-based attempt number. On a retryable failure it sleeps
/// for the backoff duration then tries again. A transient failure of an
/// attempt that sat in a soft pause is retried at once without spending budget.
pub fn run_with_retry<T, F>(policy: &RetryPolicy, mut f: F) -> Result<T, FetchError>
where
    F: FnMut(u32) -> Result<T, AttemptFailure>,
{
    let mut attempt = 1u32;
    loop {
        match f(attempt) {
            Ok(v) => return Ok(v),
            Err(AttemptFailure { error, paused }) => {
                let kind = classify::classify(&error);
                if paused && kind.is_transient() {
                    tracing::debug!(attempt, "transfer failed after a pause, retrying: {}", error);
                    continue;
                }
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => return Err(error),
                    RetryDecision::RetryAfter(d) => {
                        tracing::warn!(attempt, delay_ms = d.as_millis() as u64, "retrying: {}", error);
                        std::thread::sleep(d);
                        attempt += 1;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    fn timeout() -> AttemptFailure {
        FetchError::Curl(curl::Error::new(28)).into()
    }

    #[test]
    fn succeeds_on_third_attempt() {
        let mut calls = 0;
        let out = run_with_retry(&fast(), |attempt| {
            calls += 1;
            if attempt < 3 {
                Err(timeout())
            } else {
                Ok(attempt)
            }
        });
        assert_eq!(out.unwrap(), 3);
        assert_eq!(calls, 3);
    }

    #[test]
    fn gives_up_after_budget() {
        let mut calls = 0;
        let out: Result<(), _> = run_with_retry(&fast(), |_| {
            calls += 1;
            Err(timeout())
        });
        assert!(out.is_err());
        assert_eq!(calls, 3);
    }

    #[test]
    fn http_error_is_not_retried() {
        let mut calls = 0;
        let out: Result<(), _> = run_with_retry(&fast(), |_| {
            calls += 1;
            Err(FetchError::Http(500).into())
        });
        assert!(matches!(out, Err(FetchError::Http(500))));
        assert_eq!(calls, 1);
    }

    #[test]
    fn paused_attempt_does_not_spend_budget() {
        let mut calls = 0;
        let out = run_with_retry(&fast(), |attempt| {
            calls += 1;
            match calls {
                1 | 2 => Err(AttemptFailure {
                    error: FetchError::Curl(curl::Error::new(28)),
                    paused: true,
                }),
                _ => Ok(attempt),
            }
        });
        assert_eq!(out.unwrap(), 1);
        assert_eq!(calls, 3);
    }
}
