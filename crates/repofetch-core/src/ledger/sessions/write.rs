//! Session write operations: start, progress, finish, delete.

use anyhow::{Context, Result};
use sqlx::Row;

use super::super::db::{unix_timestamp, SessionLedger};
use super::super::types::{NewSession, SessionId, SessionStatus, TransferSession};
use crate::monitor::disk;

impl SessionLedger {
    /// Record the start of a transfer. An unfinished session with the same
    /// repository, destination, folder and target-path set is reused (its
    /// id is returned); otherwise a new record is created.
    pub async fn start(&self, new: &NewSession) -> Result<SessionId> {
        let now = unix_timestamp();
        let paths = new.targets.paths();
        let targets_json = serde_json::to_string(&paths)?;
        let sizes_json = serde_json::to_string(&new.targets.size_map())?;
        let total = new.targets.total_expected_bytes() as i64;
        let completed =
            disk::completed_bytes(&new.local_dir(), new.targets.as_slice()).await as i64;

        if let Some(existing) = self
            .find_resumable(&new.repo_id, &new.dest_root, &new.dest_folder, &paths)
            .await?
        {
            sqlx::query(
                r#"
                UPDATE sessions
                SET targets_json = ?1,
                    sizes_json = ?2,
                    total_bytes = ?3,
                    completed_bytes = ?4,
                    updated_at = ?5
                WHERE id = ?6
                "#,
            )
            .bind(&targets_json)
            .bind(&sizes_json)
            .bind(total)
            .bind(completed)
            .bind(now)
            .bind(&existing.id)
            .execute(&self.pool)
            .await?;
            tracing::info!(session = %existing.id, repo = %new.repo_id, "resuming session");
            return Ok(existing.id);
        }

        let mut tx = self.pool.begin().await?;
        let count: i64 = sqlx::query(r#"SELECT COUNT(*) AS n FROM sessions"#)
            .fetch_one(&mut *tx)
            .await?
            .get("n");
        let mut ordinal = count;
        let id = loop {
            let candidate = format!("{}-{}", now, ordinal);
            let taken = sqlx::query(r#"SELECT 1 FROM sessions WHERE id = ?1"#)
                .bind(&candidate)
                .fetch_optional(&mut *tx)
                .await?
                .is_some();
            if !taken {
                break candidate;
            }
            ordinal += 1;
        };

        sqlx::query(
            r#"
            INSERT INTO sessions (
                id, repo_id, dest_root, dest_folder, targets_json, sizes_json,
                total_bytes, completed_bytes, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&id)
        .bind(&new.repo_id)
        .bind(new.dest_root.to_string_lossy().as_ref())
        .bind(&new.dest_folder)
        .bind(&targets_json)
        .bind(&sizes_json)
        .bind(total)
        .bind(completed)
        .bind(SessionStatus::Unfinished.as_str())
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(session = %id, repo = %new.repo_id, files = paths.len(), "new session");
        Ok(id)
    }

    /// Overwrite the stored completed-bytes snapshot. Unknown ids are ignored.
    pub async fn update_progress(&self, id: &str, completed_bytes: u64) -> Result<()> {
        let done = sqlx::query(
            r#"
            UPDATE sessions
            SET completed_bytes = ?1,
                updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(completed_bytes as i64)
        .bind(unix_timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;
        if done.rows_affected() == 0 {
            tracing::debug!(session = %id, "progress for unknown session ignored");
        }
        Ok(())
    }

    /// Close a session. Completed bytes are recomputed from disk whatever
    /// the caller claims; the session is `completed` only when the disk
    /// covers a known positive total. With no known total the claim decides.
    pub async fn finish(&self, id: &str, claimed_success: bool) -> Result<Option<TransferSession>> {
        let Some(mut session) = self.get(id).await? else {
            tracing::debug!(session = %id, "finish for unknown session ignored");
            return Ok(None);
        };
        let completed =
            disk::completed_bytes(&session.local_dir(), &session.download_targets()).await;
        let status = if session.total_bytes > 0 {
            if completed >= session.total_bytes {
                SessionStatus::Completed
            } else {
                SessionStatus::Unfinished
            }
        } else if claimed_success {
            SessionStatus::Completed
        } else {
            SessionStatus::Unfinished
        };
        if claimed_success && status == SessionStatus::Unfinished {
            tracing::warn!(
                session = %id,
                completed,
                total = session.total_bytes,
                "reported success but files on disk are incomplete"
            );
        }

        let now = unix_timestamp();
        sqlx::query(
            r#"
            UPDATE sessions
            SET completed_bytes = ?1,
                status = ?2,
                updated_at = ?3
            WHERE id = ?4
            "#,
        )
        .bind(completed as i64)
        .bind(status.as_str())
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .with_context(|| format!("finish session {}", id))?;

        tracing::info!(session = %id, completed, total = session.total_bytes, status = %status, "session finished");
        session.completed_bytes = completed;
        session.status = status;
        session.updated_at = now;
        Ok(Some(session))
    }

    /// Remove a session record. Files are never touched. Returns whether a
    /// record existed.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let done = sqlx::query(r#"DELETE FROM sessions WHERE id = ?1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    /// Store the speed measured at the end of a session.
    pub async fn record_terminal_speed(&self, speed_bps: f64) -> Result<()> {
        if !speed_bps.is_finite() || speed_bps < 0.0 {
            return Ok(());
        }
        sqlx::query(
            r#"
            INSERT INTO meta (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(Self::speed_key())
        .bind(speed_bps.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
