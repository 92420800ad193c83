//! Transfer engine: resumable single-stream fetch of one target.
//!
//! Each target is fetched over one connection. Resume is driven entirely by
//! the on-disk length: a partial file yields `Range: bytes=<len>-`, a 206
//! appends and a 200 overwrites. Failed attempts are retried with the shared
//! policy and every attempt re-derives its offset from disk.

mod attempt;
mod sink;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::control::TransferControl;
use crate::retry::{run_with_retry, AttemptFailure, FetchError, RetryPolicy};
use crate::storage;
use crate::target::DownloadTarget;
use crate::url_model::RepoLocation;

use attempt::{AttemptRequest, AttemptResult};

/// Curl options shared by every attempt.
#[derive(Clone, Debug)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    /// Abort when no byte arrives for this long.
    pub read_timeout: Duration,
    pub user_agent: String,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            user_agent: format!("repofetch/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// What `fetch` did for one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Local length already covered the expected size; no request was made.
    AlreadyComplete { len: u64 },
    /// Body transferred; `len` is the final on-disk length.
    Downloaded { len: u64 },
}

impl FetchOutcome {
    pub fn len(&self) -> u64 {
        match *self {
            FetchOutcome::AlreadyComplete { len } | FetchOutcome::Downloaded { len } => len,
        }
    }
}

/// Fetches targets of one repository into one local directory.
/// Cheap to share between worker threads.
#[derive(Debug, Clone)]
pub struct TransferEngine {
    location: RepoLocation,
    token: Option<String>,
    local_dir: PathBuf,
    policy: RetryPolicy,
    curl: CurlOptions,
    control: Arc<TransferControl>,
}

impl TransferEngine {
    pub fn new(
        location: RepoLocation,
        token: Option<String>,
        local_dir: impl Into<PathBuf>,
        control: Arc<TransferControl>,
    ) -> Self {
        Self {
            location,
            token: token.filter(|t| !t.trim().is_empty()),
            local_dir: local_dir.into(),
            policy: RetryPolicy::default(),
            curl: CurlOptions::default(),
            control,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_curl_options(mut self, curl: CurlOptions) -> Self {
        self.curl = curl;
        self
    }

    pub fn local_dir(&self) -> &Path {
        &self.local_dir
    }

    pub fn control(&self) -> &Arc<TransferControl> {
        &self.control
    }

    /// Brings the local copy of `target` to the remote size, resuming from
    /// whatever is already on disk.
    pub fn fetch(&self, target: &DownloadTarget) -> Result<FetchOutcome, FetchError> {
        let local = target.local_path(&self.local_dir);
        let on_disk = storage::local_len(&local).map_err(FetchError::Storage)?;
        if let Some(expected) = target.expected_size {
            if on_disk >= expected {
                tracing::debug!(path = %target.path, on_disk, expected, "already complete, skipping");
                return Ok(FetchOutcome::AlreadyComplete { len: on_disk });
            }
        }

        let url = self
            .location
            .file_url(&target.path)
            .map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        storage::ensure_parent(&local).map_err(FetchError::Storage)?;

        tracing::info!(path = %target.path, url = %url, resume_from = on_disk, "fetching");
        let len = run_with_retry(&self.policy, |attempt_no| {
            self.fetch_once(url.as_str(), &local, target.expected_size, attempt_no)
        })?;
        tracing::info!(path = %target.path, len, "target complete");
        Ok(FetchOutcome::Downloaded { len })
    }

    /// One retry-loop attempt. A 416 on a ranged request is answered by an
    /// immediate unranged request inside the same attempt.
    fn fetch_once(
        &self,
        url: &str,
        local: &Path,
        expected: Option<u64>,
        attempt_no: u32,
    ) -> Result<u64, AttemptFailure> {
        let mut use_range = true;
        loop {
            let offset = if use_range {
                storage::local_len(local).map_err(FetchError::Storage)?
            } else {
                0
            };
            let req = AttemptRequest {
                url,
                token: self.token.as_deref(),
                path: local,
                offset,
                curl: &self.curl,
                control: &self.control,
            };
            tracing::debug!(attempt = attempt_no, offset, path = %local.display(), "request");
            match attempt::perform(&req)? {
                AttemptResult::RangeNotSatisfiable => {
                    tracing::warn!(
                        offset,
                        path = %local.display(),
                        "server rejected resume offset (416), restarting from zero"
                    );
                    use_range = false;
                }
                AttemptResult::Complete { len, paused } => {
                    return match expected {
                        Some(exp) if len < exp => Err(AttemptFailure {
                            error: FetchError::PartialTransfer {
                                expected: exp,
                                received: len,
                            },
                            paused,
                        }),
                        Some(exp) if len > exp => {
                            tracing::warn!(
                                len,
                                expected = exp,
                                path = %local.display(),
                                "local file larger than listed size"
                            );
                            Ok(len)
                        }
                        _ => Ok(len),
                    };
                }
            }
        }
    }
}
