//! CLI command handlers, one per file.

mod completions;
pub(crate) mod fetch;
mod remove;
mod resume;
mod sessions;

pub use completions::{run_completions, run_man};
pub use fetch::run_fetch;
pub use remove::run_remove;
pub use resume::run_resume;
pub use sessions::run_sessions;
