//! SQLite pool, schema and helpers for the session ledger.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use super::types::{SessionStatus, TransferSession};

/// Handle to the SQLite-backed session ledger.
///
/// The database file is stored under the XDG state directory:
/// `~/.local/state/repofetch/sessions.db`.
#[derive(Clone, Debug)]
pub struct SessionLedger {
    pub(super) pool: Pool<Sqlite>,
}

impl SessionLedger {
    /// Open (or create) the default ledger and run migrations.
    pub async fn open_default() -> Result<Self> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("repofetch")?;
        let state_dir = xdg_dirs.get_state_home();
        Self::open_at(&state_dir.join("sessions.db")).await
    }

    /// Open (or create) a ledger at `db_path`.
    pub async fn open_at(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .with_context(|| format!("open session ledger {}", db_path.display()))?;
        let db = SessionLedger { pool };
        db.migrate().await?;
        Ok(db)
    }

    pub(super) async fn migrate(&self) -> Result<()> {
        // targets_json keeps download order; sizes_json maps path -> size|null.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                repo_id TEXT NOT NULL,
                dest_root TEXT NOT NULL,
                dest_folder TEXT NOT NULL,
                targets_json TEXT NOT NULL,
                sizes_json TEXT NOT NULL,
                total_bytes INTEGER NOT NULL DEFAULT 0,
                completed_bytes INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

pub(super) fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

pub(super) fn session_from_row(row: &SqliteRow) -> Result<TransferSession> {
    let targets_json: String = row.get("targets_json");
    let sizes_json: String = row.get("sizes_json");
    let targets: Vec<String> =
        serde_json::from_str(&targets_json).context("decode session targets")?;
    let sizes: BTreeMap<String, Option<u64>> =
        serde_json::from_str(&sizes_json).context("decode session sizes")?;
    let dest_root: String = row.get("dest_root");
    let status: String = row.get("status");
    let total_bytes: i64 = row.get("total_bytes");
    let completed_bytes: i64 = row.get("completed_bytes");

    Ok(TransferSession {
        id: row.get("id"),
        repo_id: row.get("repo_id"),
        dest_root: PathBuf::from(dest_root),
        dest_folder: row.get("dest_folder"),
        targets,
        sizes,
        total_bytes: total_bytes.max(0) as u64,
        completed_bytes: completed_bytes.max(0) as u64,
        status: status.parse::<SessionStatus>().context("decode session status")?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// Open an in-memory ledger for tests (no disk I/O).
#[cfg(test)]
pub(crate) async fn open_memory() -> Result<SessionLedger> {
    // Single connection to avoid in-memory pool handing back a different empty DB.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    let db = SessionLedger { pool };
    db.migrate().await?;
    Ok(db)
}
