//! `repofetch fetch <repo>` – list, select and download repository files.

use anyhow::{anyhow, bail, Context, Result};
use repofetch_core::config::RepofetchConfig;
use repofetch_core::ledger::SessionLedger;
use repofetch_core::session::{SessionOptions, SessionRequest, SessionRunner};
use repofetch_core::target::{default_folder, filter_listing, FileListing, TargetSet};
use repofetch_core::url_model::RepoLocation;

use crate::cli::listing::{HubListing, ListingFile};
use crate::cli::transfer;
use crate::cli::FetchArgs;

/// Config with this invocation's overrides applied.
pub(crate) fn effective_config(cfg: &RepofetchConfig, args: &FetchArgs) -> RepofetchConfig {
    let mut cfg = args.remote.apply(cfg);
    if args.parallel {
        cfg.parallel = true;
    }
    if let Some(n) = args.workers {
        cfg.max_workers = Some(n.max(1));
    }
    cfg
}

pub async fn run_fetch(ledger: SessionLedger, cfg: &RepofetchConfig, args: FetchArgs) -> Result<i32> {
    let cfg = effective_config(cfg, &args);
    let repo_id = args.repo.trim().trim_matches('/').to_string();
    if repo_id.is_empty() {
        bail!("repository id is empty");
    }
    let token = args.remote.resolve_token();

    let listing = match &args.listing {
        Some(path) => ListingFile { path: path.clone() }.list()?,
        None => {
            let hub = HubListing {
                endpoint: cfg.base_url().to_string(),
                repo_id: repo_id.clone(),
                revision: cfg.revision.clone(),
                token: token.clone(),
            };
            tokio::task::spawn_blocking(move || hub.list())
                .await
                .map_err(|e| anyhow!("listing task failed: {}", e))??
        }
    };
    let listing = filter_listing(listing);
    let targets = if args.include.is_empty() {
        TargetSet::from_listing(&listing)?
    } else {
        TargetSet::select(&listing, &args.include)?
    };
    if targets.is_empty() {
        bail!("nothing to download from {}", repo_id);
    }

    let dest_root = match args.dest {
        Some(dir) => dir,
        None => std::env::current_dir().context("current directory")?,
    };
    let dest_folder = args
        .folder
        .map(|f| f.trim().to_string())
        .unwrap_or_else(|| default_folder(&repo_id));
    if dest_folder.is_empty() {
        bail!("destination folder is empty");
    }

    let req = SessionRequest {
        location: RepoLocation::new(cfg.base_url(), repo_id, cfg.revision.clone()),
        token,
        dest_root,
        dest_folder,
        targets,
    };
    let runner = SessionRunner::new(ledger, SessionOptions::from_config(&cfg));
    transfer::drive(&runner, req, cfg.shutdown_grace()).await
}
