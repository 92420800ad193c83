//! `repofetch remove <id>` – forget a session; optionally delete its files with --delete-files.

use anyhow::{anyhow, Result};
use repofetch_core::ledger::{SessionLedger, TransferSession};

/// Deletes the session's target files under its destination folder, then
/// empty directories the targets lived in. Returns the number of files removed.
pub(crate) async fn delete_session_files(session: &TransferSession) -> usize {
    let local_dir = session.local_dir();
    let mut removed = 0;
    for target in session.download_targets() {
        let path = target.local_path(&local_dir);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "deleted file");
                removed += 1;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %path.display(), "could not delete file: {}", e),
        }
        // Nested targets: drop directories left empty, below the folder itself.
        let mut dir = path.parent().map(|p| p.to_path_buf());
        while let Some(d) = dir {
            if d == local_dir || !d.starts_with(&local_dir) || tokio::fs::remove_dir(&d).await.is_err() {
                break;
            }
            dir = d.parent().map(|p| p.to_path_buf());
        }
    }
    removed
}

pub async fn run_remove(ledger: &SessionLedger, id: &str, delete_files: bool) -> Result<()> {
    let session = ledger
        .get(id)
        .await?
        .ok_or_else(|| anyhow!("no session with id {}", id))?;
    if delete_files {
        let n = delete_session_files(&session).await;
        println!("Deleted {} file(s) from {}", n, session.local_dir().display());
    }
    ledger.delete(id).await?;
    println!("Removed session {id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use repofetch_core::ledger::NewSession;
    use repofetch_core::target::{DownloadTarget, TargetSet};

    #[tokio::test]
    async fn delete_files_stays_inside_the_session_folder() {
        let root = tempfile::tempdir().unwrap();
        let local = root.path().join("model");
        std::fs::create_dir_all(local.join("sub")).unwrap();
        std::fs::write(local.join("a.bin"), b"a").unwrap();
        std::fs::write(local.join("sub/b.bin"), b"b").unwrap();
        std::fs::write(local.join("keep.txt"), b"k").unwrap();

        let state = tempfile::tempdir().unwrap();
        let ledger = SessionLedger::open_at(&state.path().join("s.db")).await.unwrap();
        let id = ledger
            .start(&NewSession {
                repo_id: "org/model".to_string(),
                dest_root: root.path().to_path_buf(),
                dest_folder: "model".to_string(),
                targets: TargetSet::new(vec![
                    DownloadTarget::new("a.bin", Some(1)),
                    DownloadTarget::new("sub/b.bin", Some(1)),
                    DownloadTarget::new("missing.bin", Some(1)),
                ])
                .unwrap(),
            })
            .await
            .unwrap();
        let session = ledger.get(&id).await.unwrap().unwrap();

        assert_eq!(delete_session_files(&session).await, 2);
        assert!(!local.join("a.bin").exists());
        assert!(!local.join("sub").exists());
        assert!(local.join("keep.txt").exists());

        run_remove(&ledger, &id, false).await.unwrap();
        assert!(ledger.get(&id).await.unwrap().is_none());
    }
}
