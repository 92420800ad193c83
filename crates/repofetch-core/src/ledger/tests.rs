//! Tests for the session ledger (in-memory DB, scratch directories for files).

use std::path::Path;

use crate::ledger::db::open_memory;
use crate::ledger::{NewSession, SessionStatus};
use crate::target::{DownloadTarget, TargetSet};

fn new_session(root: &Path, files: &[(&str, Option<u64>)]) -> NewSession {
    NewSession {
        repo_id: "org/model".to_string(),
        dest_root: root.to_path_buf(),
        dest_folder: "model".to_string(),
        targets: TargetSet::new(
            files
                .iter()
                .map(|(p, s)| DownloadTarget::new(*p, *s))
                .collect(),
        )
        .unwrap(),
    }
}

#[tokio::test]
async fn start_creates_then_reuses_matching_unfinished() {
    let db = open_memory().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let s = new_session(dir.path(), &[("a.bin", Some(10)), ("b.bin", Some(20))]);

    let id = db.start(&s).await.unwrap();
    let again = db.start(&s).await.unwrap();
    assert_eq!(id, again);
    assert_eq!(db.list_sessions().await.unwrap().len(), 1);

    // Same paths in another order still match.
    let reordered = new_session(dir.path(), &[("b.bin", Some(20)), ("a.bin", Some(10))]);
    assert_eq!(db.start(&reordered).await.unwrap(), id);
    let stored = db.get(&id).await.unwrap().unwrap();
    assert_eq!(stored.targets, vec!["b.bin", "a.bin"]);
    assert_eq!(stored.total_bytes, 30);
    assert_eq!(stored.status, SessionStatus::Unfinished);
}

#[tokio::test]
async fn different_target_set_gets_new_id() {
    let db = open_memory().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let id1 = db
        .start(&new_session(dir.path(), &[("a.bin", Some(10))]))
        .await
        .unwrap();
    let id2 = db
        .start(&new_session(dir.path(), &[("a.bin", Some(10)), ("c.bin", None)]))
        .await
        .unwrap();
    assert_ne!(id1, id2);
    assert!(id2.contains('-'));
    let all = db.list_sessions().await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, id2);
}

#[tokio::test]
async fn completed_session_is_not_reused() {
    let db = open_memory().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let s = new_session(dir.path(), &[("a.bin", Some(4))]);
    std::fs::create_dir_all(dir.path().join("model")).unwrap();
    std::fs::write(dir.path().join("model/a.bin"), b"abcd").unwrap();

    let id = db.start(&s).await.unwrap();
    let done = db.finish(&id, true).await.unwrap().unwrap();
    assert_eq!(done.status, SessionStatus::Completed);
    let next = db.start(&s).await.unwrap();
    assert_ne!(next, id);
}

#[tokio::test]
async fn finish_trusts_disk_not_claim() {
    let db = open_memory().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("model");
    std::fs::create_dir_all(&local).unwrap();
    std::fs::write(local.join("a.bin"), vec![0u8; 3500]).unwrap();

    let s = new_session(dir.path(), &[("a.bin", Some(3500)), ("b.bin", Some(1500))]);
    let id = db.start(&s).await.unwrap();
    db.update_progress(&id, 4999).await.unwrap();

    let rec = db.finish(&id, true).await.unwrap().unwrap();
    assert_eq!(rec.completed_bytes, 3500);
    assert_eq!(rec.status, SessionStatus::Unfinished);
    assert_eq!(db.get(&id).await.unwrap().unwrap().completed_bytes, 3500);

    std::fs::write(local.join("b.bin"), vec![0u8; 1500]).unwrap();
    let rec = db.finish(&id, false).await.unwrap().unwrap();
    assert_eq!(rec.completed_bytes, 5000);
    assert_eq!(rec.status, SessionStatus::Completed);
}

#[tokio::test]
async fn finish_with_unknown_total_uses_claim() {
    let db = open_memory().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let s = new_session(dir.path(), &[("notes.txt", None)]);
    let id = db.start(&s).await.unwrap();
    assert_eq!(
        db.finish(&id, false).await.unwrap().unwrap().status,
        SessionStatus::Unfinished
    );
    assert_eq!(
        db.finish(&id, true).await.unwrap().unwrap().status,
        SessionStatus::Completed
    );
}

#[tokio::test]
async fn update_and_finish_unknown_id_are_noops() {
    let db = open_memory().await.unwrap();
    db.update_progress("nope", 10).await.unwrap();
    assert!(db.finish("nope", true).await.unwrap().is_none());
    assert!(!db.delete("nope").await.unwrap());
}

#[tokio::test]
async fn delete_keeps_files_and_exposes_local_dir() {
    let db = open_memory().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("model");
    std::fs::create_dir_all(&local).unwrap();
    std::fs::write(local.join("a.bin"), b"xy").unwrap();

    let id = db
        .start(&new_session(dir.path(), &[("a.bin", Some(10))]))
        .await
        .unwrap();
    let rec = db.get(&id).await.unwrap().unwrap();
    assert_eq!(rec.local_dir(), local);
    assert_eq!(rec.completed_bytes, 2);

    let progress = db.session_progress(&rec).await;
    assert_eq!(progress.remaining_bytes, 8);
    assert_eq!(progress.percent, Some(20.0));

    assert!(db.delete(&id).await.unwrap());
    assert!(db.get(&id).await.unwrap().is_none());
    assert!(local.join("a.bin").exists());
}

#[tokio::test]
async fn unfinished_listing_and_terminal_speed() {
    let db = open_memory().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let id = db
        .start(&new_session(dir.path(), &[("a.bin", Some(10))]))
        .await
        .unwrap();
    assert_eq!(db.list_unfinished().await.unwrap()[0].id, id);

    assert_eq!(db.last_terminal_speed().await.unwrap(), None);
    db.record_terminal_speed(1_500_000.0).await.unwrap();
    db.record_terminal_speed(2_000_000.0).await.unwrap();
    assert_eq!(db.last_terminal_speed().await.unwrap(), Some(2_000_000.0));
    db.record_terminal_speed(f64::NAN).await.unwrap();
    assert_eq!(db.last_terminal_speed().await.unwrap(), Some(2_000_000.0));
}

#[tokio::test]
async fn open_at_persists_across_handles() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("state/sessions.db");
    let files = tempfile::tempdir().unwrap();
    let id = {
        let db = crate::ledger::SessionLedger::open_at(&db_path).await.unwrap();
        db.start(&new_session(files.path(), &[("a.bin", Some(10))]))
            .await
            .unwrap()
    };
    let db = crate::ledger::SessionLedger::open_at(&db_path).await.unwrap();
    assert!(db.get(&id).await.unwrap().is_some());
}
