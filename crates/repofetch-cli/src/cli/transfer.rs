//! Runs one session in the foreground: progress line, interactive
//! pause/resume, and the Ctrl-C exit path (bounded graceful stop, ledger
//! reconciliation, exit code 130).

use anyhow::Result;
use repofetch_core::control::StopOutcome;
use repofetch_core::monitor::ProgressSnapshot;
use repofetch_core::session::{SessionOutcome, SessionRequest, SessionRunner};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::cli::{keys, progress};

pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Enough to find the ledger record of a request that is in flight.
struct RecordKey {
    repo_id: String,
    dest_root: PathBuf,
    dest_folder: String,
    paths: Vec<String>,
}

pub async fn drive(runner: &SessionRunner, req: SessionRequest, grace: Duration) -> Result<i32> {
    let key = RecordKey {
        repo_id: req.location.repo_id.clone(),
        dest_root: req.dest_root.clone(),
        dest_folder: req.dest_folder.clone(),
        paths: req.targets.paths(),
    };
    println!(
        "Downloading {} file(s) of {} into {}  (p + Enter: pause, r + Enter: resume)",
        req.targets.len(),
        req.location.repo_id,
        req.local_dir().display()
    );

    let (tx, rx) = mpsc::channel::<ProgressSnapshot>(16);
    let printer = progress::spawn_printer(rx);
    keys::spawn_stdin_controls(runner.control());

    let run = runner.run(req, Some(tx));
    tokio::pin!(run);

    tokio::select! {
        res = &mut run => {
            let _ = printer.await;
            return res.map(|out| {
                report(&out);
                0
            });
        }
        _ = tokio::signal::ctrl_c() => {}
    }

    eprintln!("\ninterrupted; stopping transfers...");
    let control = runner.control();
    let stop = tokio::task::spawn_blocking(move || control.request_stop(grace));
    // Keep driving the session so it can wind down inside the grace period.
    tokio::select! {
        res = &mut run => {
            if let Err(e) = res {
                tracing::debug!("session ended after interrupt: {:#}", e);
            }
        }
        outcome = stop => {
            if matches!(outcome, Ok(StopOutcome::TimedOut)) {
                tracing::warn!("forcing exit with transfers still in flight");
            }
        }
    }

    let ledger = runner.ledger();
    match ledger
        .find_resumable(&key.repo_id, &key.dest_root, &key.dest_folder, &key.paths)
        .await
    {
        Ok(Some(record)) => match ledger.finish(&record.id, false).await {
            Ok(Some(saved)) => eprintln!(
                "session {} saved at {} / {} bytes; continue with `repofetch resume {}`",
                saved.id, saved.completed_bytes, saved.total_bytes, saved.id
            ),
            Ok(None) => {}
            Err(e) => tracing::warn!(session = %record.id, "could not save progress: {:#}", e),
        },
        Ok(None) => {}
        Err(e) => tracing::warn!("could not look up interrupted session: {:#}", e),
    }
    Ok(INTERRUPTED_EXIT_CODE)
}

fn report(out: &SessionOutcome) {
    let s = &out.session;
    println!(
        "session {}: {} ({} downloaded, {} already present, {} / {} bytes)",
        s.id, s.status, out.report.downloaded, out.report.skipped, s.completed_bytes, s.total_bytes
    );
}
