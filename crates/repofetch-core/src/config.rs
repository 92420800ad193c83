use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per target (including the first).
    pub max_attempts: u32,
    /// Linear backoff unit in seconds: the n-th retry waits `base_delay_secs * n`.
    pub base_delay_secs: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 1.0,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_secs_f64(self.base_delay_secs.max(0.0)),
        }
    }
}

/// Network timeouts applied to every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    pub connect_secs: u64,
    /// A transfer that receives no bytes for this long is aborted (and retried).
    pub read_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            read_secs: 30,
        }
    }
}

/// Progress monitor tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub interval_ms: u64,
    pub stall_timeout_secs: u64,
    /// Minimum spacing between ledger snapshots.
    pub ledger_flush_ms: u64,
    /// How long a zero sample may be replaced by the last nonzero speed for display.
    pub smoothing_window_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_ms: 300,
            stall_timeout_secs: 30,
            ledger_flush_ms: 1000,
            smoothing_window_secs: 3,
        }
    }
}

/// Global configuration loaded from `~/.config/repofetch/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepofetchConfig {
    /// Base URL of the hub (`{endpoint}/{repo}/resolve/{revision}/{path}`).
    pub endpoint: String,
    /// Alternate base URL, used instead of `endpoint` when `use_mirror` is set.
    #[serde(default)]
    pub mirror_endpoint: Option<String>,
    #[serde(default)]
    pub use_mirror: bool,
    /// Revision segment of resolve URLs.
    #[serde(default = "default_revision")]
    pub revision: String,
    /// Parallel mode requested by the user (still needs >1 target and >1 worker).
    #[serde(default)]
    pub parallel: bool,
    /// Worker pool size for parallel mode. Unset: recommended from the
    /// previous session's terminal speed and the CPU count.
    #[serde(default)]
    pub max_workers: Option<usize>,
    /// Chunk size used until the monitor has a speed sample.
    pub initial_chunk_bytes: usize,
    /// Bounded wait for workers to go idle when the application exits.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

fn default_revision() -> String {
    "main".to_string()
}

fn default_shutdown_grace() -> u64 {
    5
}

impl Default for RepofetchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://huggingface.co".to_string(),
            mirror_endpoint: None,
            use_mirror: false,
            revision: default_revision(),
            parallel: false,
            max_workers: None,
            initial_chunk_bytes: 512 * 1024,
            shutdown_grace_secs: default_shutdown_grace(),
            retry: RetryConfig::default(),
            timeouts: TimeoutConfig::default(),
            monitor: MonitorConfig::default(),
        }
    }
}

impl RepofetchConfig {
    /// Base URL actually used for transfers: the mirror when selected and set.
    pub fn base_url(&self) -> &str {
        match (&self.mirror_endpoint, self.use_mirror) {
            (Some(mirror), true) if !mirror.trim().is_empty() => mirror.trim(),
            _ => self.endpoint.trim(),
        }
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("repofetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<RepofetchConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = RepofetchConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: RepofetchConfig = toml::from_str(&data)?;
    Ok(cfg)
}
