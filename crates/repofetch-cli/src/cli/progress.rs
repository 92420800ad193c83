//! Progress line printer fed by monitor snapshots.

use repofetch_core::monitor::ProgressSnapshot;
use std::io::Write;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const PRINT_INTERVAL: Duration = Duration::from_millis(500);

pub(crate) fn mib(bytes: f64) -> f64 {
    bytes / 1_048_576.0
}

pub(crate) fn format_eta(secs: Option<f64>) -> String {
    match secs {
        None => "?".to_string(),
        Some(s) => {
            let s = s.round() as u64;
            if s >= 3600 {
                format!("{}h{:02}m", s / 3600, (s % 3600) / 60)
            } else if s >= 60 {
                format!("{}m{:02}s", s / 60, s % 60)
            } else {
                format!("{}s", s)
            }
        }
    }
}

/// One status line for a snapshot.
pub(crate) fn format_line(s: &ProgressSnapshot) -> String {
    let done = mib(s.completed_bytes as f64);
    let amount = match s.fraction() {
        Some(f) => format!(
            "{:.1} / {:.1} MiB ({:.1}%)",
            done,
            mib(s.total_bytes as f64),
            f * 100.0
        ),
        None => format!("{:.1} MiB", done),
    };
    let activity = if s.paused {
        "paused".to_string()
    } else if s.parallel {
        format!("{} active", s.active.len())
    } else {
        match s.active.first() {
            Some(f) => f.path.clone(),
            None => "-".to_string(),
        }
    };
    format!(
        "{}  {:.2} MiB/s  ETA {}  [{}/{} files]  {}",
        amount,
        mib(s.display_speed_bps),
        format_eta(s.eta_secs()),
        s.files_done,
        s.file_count,
        activity
    )
}

/// Prints at most one line per interval until the sender side closes.
pub fn spawn_printer(mut rx: mpsc::Receiver<ProgressSnapshot>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last_print: Option<Instant> = None;
        let mut printed = false;
        while let Some(snapshot) = rx.recv().await {
            let now = Instant::now();
            let due = last_print.map_or(true, |at| now.duration_since(at) >= PRINT_INTERVAL);
            if due {
                let mut out = std::io::stdout().lock();
                let _ = write!(out, "\r\x1b[2K  {}", format_line(&snapshot));
                let _ = out.flush();
                last_print = Some(now);
                printed = true;
            }
        }
        if printed {
            println!();
        }
    })
}
