// src/cli/mod.rs — CLI definition (clap derive)

pub mod migrate;
pub mod reap;
pub mod serve;
pub mod status;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tweetpurge",
    about = "Authorize an account and bulk-delete its recent posts",
    version
)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API, background runner and stall watchdog
    Serve {
        /// Override [api].port
        #[arg(long)]
        port: Option<u16>,
        /// Override [api].bind
        #[arg(long)]
        bind: Option<String>,
    },
    /// Show a session's status and progress
    Status {
        /// Session ID
        session_id: String,
        /// Print the JSON projection served by the API
        #[arg(long)]
        json: bool,
    },
    /// Mark stalled processing sessions as failed (one sweep)
    Reap {
        /// Override [watchdog].stale_after_secs
        #[arg(long)]
        older_than_secs: Option<u64>,
    },
    /// Show migration status or roll back the last migration
    Migrate {
        /// Show current migration status
        #[arg(long)]
        status: bool,
        /// Roll back the last migration
        #[arg(long)]
        rollback: bool,
    },
}
