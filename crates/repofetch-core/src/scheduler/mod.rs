//! Parallel scheduler: drives the transfer engine over a target set.
//!
//! Blocking code; the session driver runs it on a blocking thread. Workers
//! share nothing but the pause signal and chunk size inside the engine and
//! the bookkeeping in `RunState`.

mod choose;
mod parallel;
mod sequential;


pub use choose::{choose_mode, ScheduleMode};

use anyhow::Result;

use crate::engine::{FetchOutcome, TransferEngine};
use crate::monitor::RunState;
use crate::retry::FetchError;
use crate::target::DownloadTarget;

/// Fetches one target to completion (with its own retries).
pub trait Fetcher: Sync {
    fn fetch(&self, target: &DownloadTarget) -> Result<FetchOutcome, FetchError>;

    /// Blocks while new targets must not start (soft pause).
    fn wait_ready(&self) {}
}

impl Fetcher for TransferEngine {
    fn fetch(&self, target: &DownloadTarget) -> Result<FetchOutcome, FetchError> {
        TransferEngine::fetch(self, target)
    }

    fn wait_ready(&self) {
        if self.control().pause_signal().wait_while_paused() {
            tracing::debug!("pause lifted, dispatching next target");
        }
    }
}

/// Per-run counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleReport {
    /// Targets that needed a transfer.
    pub downloaded: usize,
    /// Targets already complete on disk.
    pub skipped: usize,
}

impl ScheduleReport {
    fn record(&mut self, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::AlreadyComplete { .. } => self.skipped += 1,
            FetchOutcome::Downloaded { .. } => self.downloaded += 1,
        }
    }
}

/// Runs every target in `mode`. Returns the first failure, with the target
/// path attached, after in-flight work has settled.
pub fn run<F: Fetcher + ?Sized>(
    fetcher: &F,
    targets: &[DownloadTarget],
    mode: ScheduleMode,
    state: &RunState,
) -> Result<ScheduleReport> {
    tracing::debug!(?mode, targets = targets.len(), "scheduling");
    match mode {
        ScheduleMode::Sequential => sequential::run_sequential(fetcher, targets, state),
        ScheduleMode::Parallel { workers } => {
            parallel::run_parallel(fetcher, targets, workers, state)
        }
    }
}
