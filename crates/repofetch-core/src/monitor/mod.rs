//! Progress monitor: a periodic task that reads only file metadata and
//! shared counters, never network state.
//!
//! Each tick it measures completed bytes from disk, derives raw speed on a
//! monotonic clock, adapts the shared chunk size, checks for stalls, pushes
//! a throttled snapshot into the ledger and publishes a `ProgressSnapshot`.

pub mod disk;
mod snapshot;
mod speed;
mod stall;
mod state;
mod tuning;

pub use snapshot::{FileProgress, ProgressSnapshot};
pub use speed::{DisplaySmoother, SpeedSampler};
pub use stall::StallDetector;
pub use state::RunState;
pub use tuning::{recommended_chunk_size, recommended_workers, recommended_workers_for};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::MonitorConfig;
use crate::control::TransferControl;
use crate::ledger::SessionLedger;
use crate::target::DownloadTarget;

/// Ledger record the monitor keeps up to date.
#[derive(Clone, Debug)]
pub struct LedgerLink {
    pub ledger: SessionLedger,
    pub session_id: String,
}

pub struct MonitorContext {
    pub local_dir: PathBuf,
    pub targets: Vec<DownloadTarget>,
    pub control: Arc<TransferControl>,
    pub state: Arc<RunState>,
    pub ledger: Option<LedgerLink>,
    pub snapshots: Option<mpsc::Sender<ProgressSnapshot>>,
    pub config: MonitorConfig,
}

/// What the monitor saw over the whole run.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonitorSummary {
    pub completed_bytes: u64,
    /// Last nonzero raw speed sample; `None` if nothing moved.
    pub last_speed_bps: Option<f64>,
    pub stall_warnings: u32,
}

pub struct MonitorHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<MonitorSummary>,
}

impl MonitorHandle {
    /// Stops the periodic task after its current tick and returns its summary.
    pub async fn stop(self) -> MonitorSummary {
        let _ = self.stop.send(());
        match self.task.await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!("progress monitor task failed: {}", e);
                MonitorSummary::default()
            }
        }
    }
}

/// Spawns the monitor on the current tokio runtime.
pub fn spawn(ctx: MonitorContext) -> MonitorHandle {
    let (stop_tx, stop_rx) = oneshot::channel();
    let task = tokio::spawn(run(ctx, stop_rx));
    MonitorHandle {
        stop: stop_tx,
        task,
    }
}

async fn run(ctx: MonitorContext, mut stop: oneshot::Receiver<()>) -> MonitorSummary {
    let cfg = &ctx.config;
    let started = Instant::now();
    let total_bytes: u64 = ctx.targets.iter().filter_map(|t| t.expected_size).sum();
    let index: HashMap<&str, usize> = ctx
        .targets
        .iter()
        .enumerate()
        .map(|(i, t)| (t.path.as_str(), i))
        .collect();

    let mut sampler = SpeedSampler::new();
    let mut smoother = DisplaySmoother::new(Duration::from_secs(cfg.smoothing_window_secs));
    let mut stall = StallDetector::new(Duration::from_secs(cfg.stall_timeout_secs), started);
    let flush_every = Duration::from_millis(cfg.ledger_flush_ms);
    let mut last_flush: Option<Instant> = None;
    let mut summary = MonitorSummary::default();
    let mut sampled = false;

    let mut ticker = tokio::time::interval(Duration::from_millis(cfg.interval_ms.max(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut stop => break,
        }

        let now = Instant::now();
        let measure = disk::measure(&ctx.local_dir, &ctx.targets).await;
        let paused = ctx.control.is_paused();
        let raw = sampler.sample(measure.completed, now);
        let display = smoother.smooth(raw, now);
        summary.completed_bytes = measure.completed;
        if raw > 0.0 {
            summary.last_speed_bps = Some(raw);
        }

        // The first tick has no interval to measure over.
        if sampled && !paused {
            let chunk = recommended_chunk_size(Some(raw));
            if chunk != ctx.control.chunk_size().get() {
                tracing::debug!(chunk, speed_bps = raw as u64, "chunk size adjusted");
                ctx.control.chunk_size().set(chunk);
            }
        }
        sampled = true;

        if stall.observe(measure.completed, total_bytes, paused, now) {
            summary.stall_warnings += 1;
            tracing::warn!(
                idle_secs = stall.idle_for(now).as_secs(),
                completed = measure.completed,
                "no progress; transfer may be stalled"
            );
        }

        if let Some(link) = &ctx.ledger {
            let due = last_flush.map_or(true, |at| now.saturating_duration_since(at) >= flush_every);
            if due {
                last_flush = Some(now);
                if let Err(e) = link
                    .ledger
                    .update_progress(&link.session_id, measure.completed)
                    .await
                {
                    tracing::warn!(session = %link.session_id, "progress snapshot failed: {}", e);
                }
            }
        }

        if let Some(tx) = &ctx.snapshots {
            let active = ctx
                .state
                .active()
                .into_iter()
                .filter_map(|path| {
                    let i = *index.get(path.as_str())?;
                    Some(FileProgress {
                        bytes: measure.lens[i],
                        expected: ctx.targets[i].expected_size,
                        path,
                    })
                })
                .collect();
            let _ = tx.try_send(ProgressSnapshot {
                completed_bytes: measure.completed,
                total_bytes,
                files_done: ctx.state.finished(),
                file_count: ctx.targets.len(),
                active,
                speed_bps: raw,
                display_speed_bps: display,
                chunk_size: ctx.control.chunk_size().get(),
                paused,
                parallel: ctx.state.is_parallel(),
                elapsed: now.saturating_duration_since(started),
            });
        }
    }

    summary.completed_bytes = disk::completed_bytes(&ctx.local_dir, &ctx.targets).await;
    summary
}
