pub mod config;
pub mod logging;

// Core transfer pipeline
pub mod control;
pub mod engine;
pub mod ledger;
pub mod monitor;
pub mod retry;
pub mod scheduler;
pub mod session;
pub mod storage;
pub mod target;
pub mod url_model;
