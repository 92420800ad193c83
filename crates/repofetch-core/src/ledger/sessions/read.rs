//! Session read operations: list, get, resume lookup, progress.

use anyhow::Result;
use sqlx::Row;
use std::collections::BTreeSet;
use std::path::Path;

use super::super::db::{session_from_row, SessionLedger};
use super::super::types::{SessionProgress, SessionStatus, TransferSession};
use crate::monitor::disk;

const SPEED_KEY: &str = "last_speed_bps";

impl SessionLedger {
    /// List all sessions, newest first.
    pub async fn list_sessions(&self) -> Result<Vec<TransferSession>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM sessions
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(session_from_row).collect()
    }

    /// Unfinished sessions, most recently updated first.
    pub async fn list_unfinished(&self) -> Result<Vec<TransferSession>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM sessions
            WHERE status = ?1
            ORDER BY updated_at DESC, created_at DESC, id DESC
            "#,
        )
        .bind(SessionStatus::Unfinished.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(session_from_row).collect()
    }

    pub async fn get(&self, id: &str) -> Result<Option<TransferSession>> {
        let row = sqlx::query(r#"SELECT * FROM sessions WHERE id = ?1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(session_from_row).transpose()
    }

    /// Unfinished session for the same repository, destination and folder
    /// whose target paths are exactly `paths` (order ignored).
    pub async fn find_resumable(
        &self,
        repo_id: &str,
        dest_root: &Path,
        dest_folder: &str,
        paths: &[String],
    ) -> Result<Option<TransferSession>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM sessions
            WHERE status = ?1 AND repo_id = ?2 AND dest_root = ?3 AND dest_folder = ?4
            ORDER BY updated_at DESC, created_at DESC, id DESC
            "#,
        )
        .bind(SessionStatus::Unfinished.as_str())
        .bind(repo_id)
        .bind(dest_root.to_string_lossy().as_ref())
        .bind(dest_folder)
        .fetch_all(&self.pool)
        .await?;

        let wanted: BTreeSet<&str> = paths.iter().map(String::as_str).collect();
        for row in &rows {
            let session = session_from_row(row)?;
            let have: BTreeSet<&str> = session.targets.iter().map(String::as_str).collect();
            if have == wanted {
                return Ok(Some(session));
            }
        }
        Ok(None)
    }

    /// Progress of a stored session measured from the files on disk now.
    pub async fn session_progress(&self, session: &TransferSession) -> SessionProgress {
        let completed =
            disk::completed_bytes(&session.local_dir(), &session.download_targets()).await;
        SessionProgress::new(completed, session.total_bytes)
    }

    /// Speed recorded at the end of the most recent session.
    pub async fn last_terminal_speed(&self) -> Result<Option<f64>> {
        let row = sqlx::query(r#"SELECT value FROM meta WHERE key = ?1"#)
            .bind(SPEED_KEY)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row
            .map(|r| r.get::<String, _>("value"))
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v >= 0.0))
    }

    pub(crate) fn speed_key() -> &'static str {
        SPEED_KEY
    }
}
