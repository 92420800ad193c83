//! Session driver: owns one transfer session end to end.
//!
//! ledger start → running flag → monitor task → scheduler on a blocking
//! thread → monitor stop → ledger finish (disk truth) → terminal speed.

use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::{MonitorConfig, RepofetchConfig};
use crate::control::{RunningGuard, TransferControl};
use crate::engine::{CurlOptions, TransferEngine};
use crate::ledger::{NewSession, SessionLedger, TransferSession};
use crate::monitor::{self, LedgerLink, MonitorContext, ProgressSnapshot, RunState};
use crate::retry::RetryPolicy;
use crate::scheduler::{self, ScheduleMode, ScheduleReport};
use crate::target::TargetSet;
use crate::url_model::RepoLocation;

/// Tuning for one run, usually derived from the config file.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub parallel: bool,
    /// `None`: recommended from the previous terminal speed.
    pub max_workers: Option<usize>,
    pub initial_chunk_bytes: usize,
    pub policy: RetryPolicy,
    pub curl: CurlOptions,
    pub monitor: MonitorConfig,
}

impl SessionOptions {
    pub fn from_config(cfg: &RepofetchConfig) -> Self {
        Self {
            parallel: cfg.parallel,
            max_workers: cfg.max_workers,
            initial_chunk_bytes: cfg.initial_chunk_bytes,
            policy: cfg.retry.policy(),
            curl: CurlOptions {
                connect_timeout: Duration::from_secs(cfg.timeouts.connect_secs),
                read_timeout: Duration::from_secs(cfg.timeouts.read_secs),
                ..CurlOptions::default()
            },
            monitor: cfg.monitor.clone(),
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from_config(&RepofetchConfig::default())
    }
}

/// Everything needed to run one session.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub location: RepoLocation,
    pub token: Option<String>,
    pub dest_root: PathBuf,
    pub dest_folder: String,
    pub targets: TargetSet,
}

impl SessionRequest {
    /// Rebuild the request of a stored session, to continue it.
    pub fn from_record(
        record: &TransferSession,
        base_url: &str,
        revision: &str,
        token: Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            location: RepoLocation::new(base_url, record.repo_id.clone(), revision),
            token,
            dest_root: record.dest_root.clone(),
            dest_folder: record.dest_folder.clone(),
            targets: record
                .target_set()
                .with_context(|| format!("stored targets of session {}", record.id))?,
        })
    }

    pub fn local_dir(&self) -> PathBuf {
        self.dest_root.join(&self.dest_folder)
    }
}

/// Successful run.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    /// Ledger record after the disk-truth reconciliation.
    pub session: TransferSession,
    pub report: ScheduleReport,
    pub mode: ScheduleMode,
}

/// Runs sessions against one ledger with one control block.
pub struct SessionRunner {
    ledger: SessionLedger,
    control: Arc<TransferControl>,
    options: SessionOptions,
}

impl SessionRunner {
    pub fn new(ledger: SessionLedger, options: SessionOptions) -> Self {
        let control = Arc::new(TransferControl::new(options.initial_chunk_bytes));
        Self {
            ledger,
            control,
            options,
        }
    }

    /// Pause/resume and graceful stop for the session being run.
    pub fn control(&self) -> Arc<TransferControl> {
        Arc::clone(&self.control)
    }

    pub fn ledger(&self) -> &SessionLedger {
        &self.ledger
    }

    /// Runs `req` to completion or first failure. The ledger is reconciled
    /// with the disk either way; on failure the error names the session.
    pub async fn run(
        &self,
        req: SessionRequest,
        snapshots: Option<mpsc::Sender<ProgressSnapshot>>,
    ) -> Result<SessionOutcome> {
        if self.control.is_running() {
            return Err(anyhow!("a session is already running"));
        }
        let local_dir = req.local_dir();
        let new = NewSession {
            repo_id: req.location.repo_id.clone(),
            dest_root: req.dest_root.clone(),
            dest_folder: req.dest_folder.clone(),
            targets: req.targets.clone(),
        };
        let id = self.ledger.start(&new).await.context("record session start")?;

        let last_speed = match self.ledger.last_terminal_speed().await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("could not read last session speed: {}", e);
                None
            }
        };
        let workers = self
            .options
            .max_workers
            .unwrap_or_else(|| monitor::recommended_workers(last_speed));
        let mode = scheduler::choose_mode(self.options.parallel, req.targets.len(), workers);
        let chunk = match last_speed {
            Some(s) => monitor::recommended_chunk_size(Some(s)),
            None => self.options.initial_chunk_bytes,
        };
        self.control.chunk_size().set(chunk);

        tracing::info!(
            session = %id,
            repo = %req.location.repo_id,
            dir = %local_dir.display(),
            files = req.targets.len(),
            total = req.targets.total_expected_bytes(),
            ?mode,
            chunk,
            "session started"
        );

        self.control.set_running(true);
        let _running = RunningGuard(&self.control);

        let targets = req.targets.as_slice().to_vec();
        let state = Arc::new(RunState::new(mode.is_parallel()));
        let monitor = monitor::spawn(MonitorContext {
            local_dir: local_dir.clone(),
            targets: targets.clone(),
            control: Arc::clone(&self.control),
            state: Arc::clone(&state),
            ledger: Some(LedgerLink {
                ledger: self.ledger.clone(),
                session_id: id.clone(),
            }),
            snapshots,
            config: self.options.monitor.clone(),
        });

        let engine = TransferEngine::new(req.location, req.token, local_dir, self.control())
            .with_policy(self.options.policy)
            .with_curl_options(self.options.curl.clone());
        let result = tokio::task::spawn_blocking(move || {
            scheduler::run(&engine, &targets, mode, &state)
        })
        .await
        .map_err(|e| anyhow!("scheduler task failed: {}", e))
        .and_then(|r| r);

        let summary = monitor.stop().await;
        let session = self
            .ledger
            .finish(&id, result.is_ok())
            .await?
            .ok_or_else(|| anyhow!("session {} disappeared from the ledger", id))?;
        if let Some(speed) = summary.last_speed_bps {
            if let Err(e) = self.ledger.record_terminal_speed(speed).await {
                tracing::warn!("could not record terminal speed: {}", e);
            }
        }

        match result {
            Ok(report) => {
                tracing::info!(
                    session = %id,
                    downloaded = report.downloaded,
                    skipped = report.skipped,
                    status = %session.status,
                    "session done"
                );
                Ok(SessionOutcome {
                    session,
                    report,
                    mode,
                })
            }
            Err(e) => {
                tracing::error!(session = %id, "session failed: {:#}", e);
                Err(e.context(format!("session {}", id)))
            }
        }
    }

    /// Continue a stored session by id.
    pub async fn resume(
        &self,
        id: &str,
        base_url: &str,
        revision: &str,
        token: Option<String>,
        snapshots: Option<mpsc::Sender<ProgressSnapshot>>,
    ) -> Result<SessionOutcome> {
        let record = self
            .ledger
            .get(id)
            .await?
            .ok_or_else(|| anyhow!("no session with id {}", id))?;
        let req = SessionRequest::from_record(&record, base_url, revision, token)?;
        self.run(req, snapshots).await
    }

    /// Reconcile a session with the disk without transferring (used when the
    /// process is about to exit mid-transfer).
    pub async fn abandon(&self, id: &str) -> Result<Option<TransferSession>> {
        self.ledger.finish(id, false).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::DownloadTarget;

    #[tokio::test]
    async fn already_complete_targets_finish_without_network() {
        let state_dir = tempfile::tempdir().unwrap();
        let ledger = SessionLedger::open_at(&state_dir.path().join("s.db"))
            .await
            .unwrap();
        let root = tempfile::tempdir().unwrap();
        let local = root.path().join("model");
        std::fs::create_dir_all(&local).unwrap();
        std::fs::write(local.join("a.bin"), vec![1u8; 10]).unwrap();
        std::fs::write(local.join("b.bin"), vec![2u8; 20]).unwrap();

        let runner = SessionRunner::new(ledger, SessionOptions::default());
        let req = SessionRequest {
            // Nothing listens here; any request would fail.
            location: RepoLocation::new("http://127.0.0.1:1", "org/model", "main"),
            token: None,
            dest_root: root.path().to_path_buf(),
            dest_folder: "model".to_string(),
            targets: TargetSet::new(vec![
                DownloadTarget::new("a.bin", Some(10)),
                DownloadTarget::new("b.bin", Some(20)),
            ])
            .unwrap(),
        };
        let out = runner.run(req, None).await.unwrap();
        assert!(out.session.is_completed());
        assert_eq!(out.session.completed_bytes, 30);
        assert_eq!(out.report.skipped, 2);
        assert!(!runner.control().is_running());
    }

    #[test]
    fn options_follow_config() {
        let mut cfg = RepofetchConfig::default();
        cfg.parallel = true;
        cfg.max_workers = Some(3);
        cfg.timeouts.read_secs = 12;
        let o = SessionOptions::from_config(&cfg);
        assert!(o.parallel);
        assert_eq!(o.max_workers, Some(3));
        assert_eq!(o.curl.read_timeout, Duration::from_secs(12));
        assert_eq!(o.policy.max_attempts, 3);
    }
}
