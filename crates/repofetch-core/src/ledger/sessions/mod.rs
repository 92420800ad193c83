//! Session read/write operations on the ledger.

mod read;
mod write;
