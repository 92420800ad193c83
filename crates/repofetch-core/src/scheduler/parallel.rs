//! Parallel runner: bounded pool of worker threads pulling from a shared queue.
//!
//! On the first failure the queue is drained so nothing new is dispatched;
//! workers already inside a target finish it. Exactly one error (the first)
//! is returned, later ones are logged.

use anyhow::{anyhow, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Mutex};

use super::{Fetcher, ScheduleReport};
use crate::monitor::RunState;
use crate::target::DownloadTarget;

pub(super) fn run_parallel<F: Fetcher + ?Sized>(
    fetcher: &F,
    targets: &[DownloadTarget],
    workers: usize,
    state: &RunState,
) -> Result<ScheduleReport> {
    let count = targets.len();
    let work: Mutex<VecDeque<&DownloadTarget>> = Mutex::new(targets.iter().collect());
    let abort_requested = AtomicBool::new(false);
    let num_workers = workers.max(1).min(count.max(1));
    let (tx, rx) = mpsc::channel();

    let mut report = ScheduleReport::default();
    let mut first_error: Option<anyhow::Error> = None;

    std::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(num_workers);
        for _ in 0..num_workers {
            let tx = tx.clone();
            let work = &work;
            let abort = &abort_requested;
            handles.push(scope.spawn(move || loop {
                fetcher.wait_ready();
                if abort.load(Ordering::Relaxed) {
                    break;
                }
                let target = match work.lock().unwrap().pop_front() {
                    Some(t) => t,
                    None => break,
                };
                state.target_started(&target.path);
                let res = fetcher.fetch(target);
                state.target_finished(&target.path, res.is_ok());
                if tx.send((target, res)).is_err() {
                    break;
                }
            }));
        }
        drop(tx);

        let mut to_receive = count;
        while to_receive > 0 {
            let (target, res) = match rx.recv() {
                Ok(pair) => pair,
                Err(_) => {
                    if first_error.is_none() {
                        first_error = Some(anyhow!(
                            "worker result channel closed (worker may have panicked)"
                        ));
                    }
                    break;
                }
            };
            to_receive -= 1;
            match res {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    abort_requested.store(true, Ordering::Relaxed);
                    let drained = {
                        let mut q = work.lock().unwrap();
                        let n = q.len();
                        q.clear();
                        n
                    };
                    to_receive = to_receive.saturating_sub(drained);
                    if first_error.is_none() {
                        tracing::error!(path = %target.path, "download failed: {}", e);
                        first_error =
                            Some(anyhow::Error::new(e).context(format!("download {}", target.path)));
                    } else {
                        tracing::warn!(path = %target.path, "another target failed: {}", e);
                    }
                }
            }
        }

        for h in handles {
            if let Err(e) = h.join() {
                if first_error.is_none() {
                    first_error = Some(anyhow!("worker panicked: {:?}", e));
                }
            }
        }
    });

    match first_error {
        Some(e) => Err(e),
        None => Ok(report),
    }
}
