//! Logging setup: `tracing` events go to a file in the XDG state dir, or to
//! stderr when that file cannot be opened.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Used when `RUST_LOG` is unset or invalid.
const DEFAULT_FILTER: &str = "info,repofetch=debug,repofetch_core=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// `$XDG_STATE_HOME/repofetch/repofetch.log`.
pub fn log_file_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("repofetch")?;
    Ok(xdg_dirs.get_state_home().join("repofetch.log"))
}

fn open_append(path: &Path) -> Result<fs::File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))
}

/// Installs the global subscriber writing to [`log_file_path`].
/// Errors leave no subscriber installed so the caller can fall back to
/// [`init_logging_stderr`].
pub fn init_logging() -> Result<PathBuf> {
    let path = log_file_path()?;
    let file = open_append(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("install subscriber: {}", e))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "repofetch logging to {}",
        path.display()
    );
    Ok(path)
}

/// Stderr-only logging. Never fails; a second init is ignored.
pub fn init_logging_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}
