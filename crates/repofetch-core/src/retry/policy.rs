use std::time::Duration;

/// High-level classification of an error for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation timed out (connect/read).
    Timeout,
    /// Network-level failure (connection reset, DNS, early close).
    Connection,
    /// Server rejected the resume offset (416). Recovered by restarting from zero.
    RangeNotSatisfiable,
    /// Anything else: semantic HTTP failures, storage errors. Never retried.
    Other,
}

impl ErrorKind {
    pub fn is_transient(self) -> bool {
        matches!(self, ErrorKind::Timeout | ErrorKind::Connection)
    }
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Fixed attempt budget with linear backoff (`base_delay * attempt`).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Backoff unit.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Decide what to do after `attempt` (1-based) failed with `kind`.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if !kind.is_transient() || attempt >= self.max_attempts {
            return RetryDecision::NoRetry;
        }
        RetryDecision::RetryAfter(self.base_delay.saturating_mul(attempt))
    }
}
