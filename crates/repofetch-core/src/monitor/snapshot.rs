//! Progress snapshot published by the monitor (CLI-friendly).

use std::time::Duration;

/// Progress of one in-flight target.
#[derive(Debug, Clone, PartialEq)]
pub struct FileProgress {
    pub path: String,
    pub bytes: u64,
    pub expected: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    /// Credited bytes on disk across all targets.
    pub completed_bytes: u64,
    /// Sum of known expected sizes; 0 when nothing is known.
    pub total_bytes: u64,
    pub files_done: usize,
    pub file_count: usize,
    /// Targets currently in flight.
    pub active: Vec<FileProgress>,
    /// Raw speed of the last interval.
    pub speed_bps: f64,
    /// Speed for display (smoothed over short gaps between chunks).
    pub display_speed_bps: f64,
    pub chunk_size: usize,
    pub paused: bool,
    pub parallel: bool,
    pub elapsed: Duration,
}

impl ProgressSnapshot {
    pub fn remaining_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.completed_bytes)
    }

    /// Estimated seconds remaining (None if total or speed is unknown).
    pub fn eta_secs(&self) -> Option<f64> {
        if self.total_bytes == 0 {
            return None;
        }
        let remaining = self.remaining_bytes();
        if remaining == 0 {
            return Some(0.0);
        }
        if self.display_speed_bps <= 0.0 {
            return None;
        }
        Some(remaining as f64 / self.display_speed_bps)
    }

    /// Fraction complete in [0.0, 1.0]; None when the total is unknown.
    pub fn fraction(&self) -> Option<f64> {
        if self.total_bytes == 0 {
            return None;
        }
        Some((self.completed_bytes as f64 / self.total_bytes as f64).min(1.0))
    }
}
