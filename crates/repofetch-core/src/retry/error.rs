//! Transfer error type used for retry classification.

/// Error returned by one transfer attempt (curl failure, HTTP status, or storage failure).
/// Kept concrete so we can classify and decide retries before converting to anyhow.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Curl reported an error (timeout, connection reset, DNS, etc.).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// Server answered with a status other than 200/206.
    #[error("HTTP {0}")]
    Http(u32),
    /// Body ended before the expected size was on disk (server closed early).
    #[error("partial transfer: expected {expected} bytes, have {received}")]
    PartialTransfer { expected: u64, received: u64 },
    /// 206 response whose Content-Range does not start at the requested offset.
    #[error("server resumed at byte {got}, requested {requested}")]
    RangeMismatch { requested: u64, got: u64 },
    /// Resolve URL could not be built.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    /// Local write failed (disk full, permission denied, path too long). Not retried.
    #[error("storage: {0}")]
    Storage(#[source] std::io::Error),
}

/// Failure of one attempt. `paused` is set when the attempt spent time
/// blocked in a soft pause, which makes a following timeout self-inflicted.
#[derive(Debug)]
pub struct AttemptFailure {
    pub error: FetchError,
    pub paused: bool,
}

impl From<FetchError> for AttemptFailure {
    fn from(error: FetchError) -> Self {
        Self {
            error,
            paused: false,
        }
    }
}
