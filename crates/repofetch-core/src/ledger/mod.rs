//! Session ledger (SQLite via sqlx).
//!
//! One record per multi-file transfer so an interrupted session can be found
//! and continued after a restart. Completed bytes are always a disk-truth
//! measurement; the ledger never deletes files.

mod db;
mod sessions;
mod types;

#[cfg(test)]
mod tests;

pub use db::SessionLedger;
pub use types::{NewSession, SessionId, SessionProgress, SessionStatus, TransferSession};
