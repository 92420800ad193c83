//! Disk truth: progress measured from local file lengths.

use std::path::Path;

use crate::target::DownloadTarget;

/// Length of `path`, 0 when missing or unreadable.
pub async fn on_disk_len(path: &Path) -> u64 {
    tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0)
}

/// Bytes of one file that count toward completion: capped at the expected
/// size when known, raw length otherwise.
pub fn credited(len: u64, expected: Option<u64>) -> u64 {
    match expected {
        Some(e) => len.min(e),
        None => len,
    }
}

/// One pass over the target files.
#[derive(Debug, Clone, Default)]
pub struct DiskMeasure {
    /// Raw on-disk length per target, in target order.
    pub lens: Vec<u64>,
    /// Sum of credited bytes.
    pub completed: u64,
}

pub async fn measure(local_dir: &Path, targets: &[DownloadTarget]) -> DiskMeasure {
    let mut lens = Vec::with_capacity(targets.len());
    let mut completed = 0u64;
    for t in targets {
        let len = on_disk_len(&t.local_path(local_dir)).await;
        completed = completed.saturating_add(credited(len, t.expected_size));
        lens.push(len);
    }
    DiskMeasure { lens, completed }
}

/// Credited bytes for a target set under `local_dir`.
pub async fn completed_bytes(local_dir: &Path, targets: &[DownloadTarget]) -> u64 {
    measure(local_dir, targets).await.completed
}
