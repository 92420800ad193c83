//! Stall detection: completed bytes below the known total and no increase
//! for a full window while not paused.
//!
//! Advisory only. The caller logs a warning; transfers are left alone since
//! the per-request read timeout already aborts dead connections.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct StallDetector {
    timeout: Duration,
    last_bytes: u64,
    last_progress_at: Instant,
    warned_at: Option<Instant>,
}

impl StallDetector {
    pub fn new(timeout: Duration, now: Instant) -> Self {
        Self {
            timeout,
            last_bytes: 0,
            last_progress_at: now,
            warned_at: None,
        }
    }

    /// Feeds completed bytes and the known total (0 = unknown). Returns true
    /// when a stall warning is due; at most one warning per window. Only an
    /// increase counts as progress; a drop (restart from zero) is recorded
    /// without resetting the clock.
    pub fn observe(&mut self, bytes: u64, total: u64, paused: bool, now: Instant) -> bool {
        let outstanding = total > 0 && bytes < total;
        let increased = bytes > self.last_bytes;
        self.last_bytes = bytes;
        if increased || paused || !outstanding {
            self.last_progress_at = now;
            self.warned_at = None;
            return false;
        }
        if now.saturating_duration_since(self.last_progress_at) < self.timeout {
            return false;
        }
        match self.warned_at {
            Some(at) if now.saturating_duration_since(at) < self.timeout => false,
            _ => {
                self.warned_at = Some(now);
                true
            }
        }
    }

    /// How long the byte total has been flat.
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_progress_at)
    }
}
