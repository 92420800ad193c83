//! `repofetch sessions` – show recorded sessions with progress measured on disk.

use anyhow::Result;
use repofetch_core::ledger::{SessionLedger, SessionProgress};

pub(crate) fn progress_cell(p: &SessionProgress) -> String {
    match p.percent {
        Some(pct) => format!("{:.1}%", pct),
        None => format!("{}B", p.completed_bytes),
    }
}

pub async fn run_sessions(ledger: &SessionLedger, unfinished_only: bool) -> Result<()> {
    let sessions = if unfinished_only {
        ledger.list_unfinished().await?
    } else {
        ledger.list_sessions().await?
    };
    if sessions.is_empty() {
        println!("No sessions recorded.");
        return Ok(());
    }
    println!(
        "{:<16} {:<11} {:>8} {:>14} {:>6}  {:<30} {}",
        "ID", "STATUS", "DONE", "REMAINING", "FILES", "REPO", "DIR"
    );
    for s in sessions {
        let progress = ledger.session_progress(&s).await;
        println!(
            "{:<16} {:<11} {:>8} {:>14} {:>6}  {:<30} {}",
            s.id,
            s.status.to_string(),
            progress_cell(&progress),
            progress.remaining_bytes,
            s.targets.len(),
            s.repo_id,
            s.local_dir().display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_cell_percent_or_bytes() {
        assert_eq!(progress_cell(&SessionProgress::new(25, 100)), "25.0%");
        assert_eq!(progress_cell(&SessionProgress::new(7, 0)), "7B");
    }
}
