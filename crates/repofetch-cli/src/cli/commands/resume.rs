//! `repofetch resume <id>` – continue a recorded session.

use anyhow::{anyhow, Result};
use repofetch_core::config::RepofetchConfig;
use repofetch_core::ledger::SessionLedger;
use repofetch_core::session::{SessionOptions, SessionRequest, SessionRunner};

use crate::cli::transfer;
use crate::cli::RemoteArgs;

pub async fn run_resume(
    ledger: SessionLedger,
    cfg: &RepofetchConfig,
    id: &str,
    remote: &RemoteArgs,
) -> Result<i32> {
    let cfg = remote.apply(cfg);
    let record = ledger
        .get(id)
        .await?
        .ok_or_else(|| anyhow!("no session with id {}", id))?;
    if record.is_completed() {
        println!("Session {} is already complete; checking files on disk.", id);
    }
    let req = SessionRequest::from_record(
        &record,
        cfg.base_url(),
        &cfg.revision,
        remote.resolve_token(),
    )?;
    let runner = SessionRunner::new(ledger, SessionOptions::from_config(&cfg));
    transfer::drive(&runner, req, cfg.shutdown_grace()).await
}
