//! Session ledger types.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{anyhow, Result};

use crate::target::{DownloadTarget, TargetSet};

/// Session identifier: `"{created_unix_secs}-{ordinal}"`.
pub type SessionId = String;

/// Session status stored as a string in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Unfinished,
    Completed,
}

impl SessionStatus {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Unfinished => "unfinished",
            SessionStatus::Completed => "completed",
        }
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "unfinished" => Ok(SessionStatus::Unfinished),
            "completed" => Ok(SessionStatus::Completed),
            other => Err(anyhow!("unknown session status {:?}", other)),
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller knows when a session starts.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub repo_id: String,
    pub dest_root: PathBuf,
    pub dest_folder: String,
    pub targets: TargetSet,
}

impl NewSession {
    pub fn local_dir(&self) -> PathBuf {
        self.dest_root.join(&self.dest_folder)
    }
}

/// Persisted record of one multi-file transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferSession {
    pub id: SessionId,
    pub repo_id: String,
    pub dest_root: PathBuf,
    pub dest_folder: String,
    /// Target paths in download order.
    pub targets: Vec<String>,
    pub sizes: BTreeMap<String, Option<u64>>,
    /// Sum of known sizes.
    pub total_bytes: u64,
    /// Last disk-truth snapshot.
    pub completed_bytes: u64,
    pub status: SessionStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TransferSession {
    /// Directory the files live in: destination root joined with the folder.
    pub fn local_dir(&self) -> PathBuf {
        self.dest_root.join(&self.dest_folder)
    }

    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    /// Targets with their recorded sizes, in download order.
    pub fn download_targets(&self) -> Vec<DownloadTarget> {
        self.targets
            .iter()
            .map(|p| DownloadTarget::new(p.clone(), self.sizes.get(p).copied().flatten()))
            .collect()
    }

    pub fn target_set(&self) -> Result<TargetSet> {
        TargetSet::new(self.download_targets())
    }
}

/// Progress of a stored session measured against the files on disk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionProgress {
    pub completed_bytes: u64,
    pub total_bytes: u64,
    pub remaining_bytes: u64,
    /// `None` when the total is unknown.
    pub percent: Option<f64>,
}

impl SessionProgress {
    pub fn new(completed_bytes: u64, total_bytes: u64) -> Self {
        let percent = (total_bytes > 0)
            .then(|| (completed_bytes as f64 / total_bytes as f64 * 100.0).min(100.0));
        Self {
            completed_bytes,
            total_bytes,
            remaining_bytes: total_bytes.saturating_sub(completed_bytes),
            percent,
        }
    }
}
