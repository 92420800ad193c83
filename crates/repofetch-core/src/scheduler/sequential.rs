//! Sequential runner: targets in order, stop at the first failure.

use anyhow::{Context, Result};

use super::{Fetcher, ScheduleReport};
use crate::monitor::RunState;
use crate::target::DownloadTarget;

pub(super) fn run_sequential<F: Fetcher + ?Sized>(
    fetcher: &F,
    targets: &[DownloadTarget],
    state: &RunState,
) -> Result<ScheduleReport> {
    let mut report = ScheduleReport::default();
    for target in targets {
        fetcher.wait_ready();
        state.target_started(&target.path);
        let res = fetcher.fetch(target);
        state.target_finished(&target.path, res.is_ok());
        let outcome = res.with_context(|| format!("download {}", target.path))?;
        report.record(outcome);
    }
    Ok(report)
}
