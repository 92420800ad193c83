//! Retry and backoff policy.
//!
//! This module encapsulates error classification (timeouts, connection
//! failures, range-not-satisfiable, semantic HTTP failures) and the linear
//! backoff decision so the engine and scheduler share one policy.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use error::{AttemptFailure, FetchError};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
