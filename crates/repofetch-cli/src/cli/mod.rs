//! CLI for repofetch.

mod commands;
mod keys;
mod listing;
mod progress;
mod transfer;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use repofetch_core::config;
use repofetch_core::ledger::SessionLedger;
use std::path::PathBuf;

use commands::{run_completions, run_fetch, run_man, run_remove, run_resume, run_sessions};

/// Top-level CLI for repofetch.
#[derive(Debug, Parser)]
#[command(name = "repofetch")]
#[command(about = "repofetch: resumable multi-file downloads from model repositories", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download files of a repository into a local folder.
    Fetch(FetchArgs),

    /// List recorded transfer sessions.
    Sessions {
        /// Only sessions that did not complete.
        #[arg(long)]
        unfinished: bool,
    },

    /// Continue a recorded session by its ID.
    Resume {
        /// Session identifier (see `repofetch sessions`).
        id: String,

        #[command(flatten)]
        remote: RemoteArgs,
    },

    /// Forget a session; optionally delete its downloaded files.
    Remove {
        /// Session identifier.
        id: String,

        /// Also delete the session's files from its destination folder.
        #[arg(long)]
        delete_files: bool,
    },

    /// Print a shell completion script to stdout.
    Completions {
        /// Target shell.
        shell: Shell,
    },

    /// Print the man page (roff) to stdout.
    Man,
}

/// Where and how to reach the hub.
#[derive(Debug, Clone, Default, Args)]
pub struct RemoteArgs {
    /// Bearer token (defaults to $HF_TOKEN).
    #[arg(long)]
    pub token: Option<String>,

    /// Use the configured mirror endpoint instead of the hub.
    #[arg(long)]
    pub mirror: bool,

    /// Revision to download from (default from config, usually `main`).
    #[arg(long)]
    pub revision: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct FetchArgs {
    /// Repository id, e.g. `owner/name`.
    pub repo: String,

    /// Only these repository paths (repeatable). Default: every file.
    #[arg(short, long = "include", value_name = "PATH")]
    pub include: Vec<String>,

    /// Destination root (default: current directory).
    #[arg(long, value_name = "DIR")]
    pub dest: Option<PathBuf>,

    /// Folder under the destination root (default: last segment of the repo id).
    #[arg(long)]
    pub folder: Option<String>,

    /// Download several files at once.
    #[arg(long)]
    pub parallel: bool,

    /// Worker count in parallel mode (default: recommended from the last session's speed).
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Read the file listing from FILE (`path<TAB>size` per line, `-` = unknown size)
    /// instead of asking the hub.
    #[arg(long, value_name = "FILE")]
    pub listing: Option<PathBuf>,

    #[command(flatten)]
    pub remote: RemoteArgs,
}

impl RemoteArgs {
    /// Token from `--token`, else `$HF_TOKEN`. Blank values count as none.
    pub fn resolve_token(&self) -> Option<String> {
        self.token
            .clone()
            .or_else(|| std::env::var("HF_TOKEN").ok())
            .filter(|t| !t.trim().is_empty())
    }

    /// Config with this invocation's mirror choice applied.
    pub fn apply(&self, cfg: &config::RepofetchConfig) -> config::RepofetchConfig {
        let mut cfg = cfg.clone();
        if self.mirror {
            cfg.use_mirror = true;
        }
        if let Some(rev) = &self.revision {
            cfg.revision = rev.clone();
        }
        cfg
    }
}

impl CliCommand {
    /// Parses arguments and runs the command. Returns the process exit code.
    pub async fn run_from_args() -> Result<i32> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Completions { shell } => {
                run_completions(shell);
                return Ok(0);
            }
            CliCommand::Man => {
                run_man()?;
                return Ok(0);
            }
            _ => {}
        }

        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let ledger = SessionLedger::open_default().await?;

        let code = match cli.command {
            CliCommand::Fetch(args) => run_fetch(ledger, &cfg, args).await?,
            CliCommand::Sessions { unfinished } => {
                run_sessions(&ledger, unfinished).await?;
                0
            }
            CliCommand::Resume { id, remote } => run_resume(ledger, &cfg, &id, &remote).await?,
            CliCommand::Remove { id, delete_files } => {
                run_remove(&ledger, &id, delete_files).await?;
                0
            }
            CliCommand::Completions { .. } | CliCommand::Man => 0,
        };
        Ok(code)
    }
}

#[cfg(test)]
mod tests;
