// src/main.rs — tweetpurge entry point

use clap::Parser;

use tweetpurge::cli::{Cli, Commands};
use tweetpurge::infra::config::Config;
use tweetpurge::infra::logger;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config (falls back to defaults if no config.toml)
    let config = if let Some(ref path) = cli.config {
        Config::load_from(std::path::Path::new(path))?
    } else {
        Config::load()?
    };

    // Initialize logging (RUST_LOG overrides the configured level)
    logger::init_logging(&config.logging.level);

    match cli.command {
        Commands::Serve { port, bind } => tweetpurge::cli::serve::run_serve(config, port, bind).await,
        Commands::Status { session_id, json } => {
            tweetpurge::cli::status::show_status(&config, &session_id, json).await
        }
        Commands::Reap { older_than_secs } => {
            tweetpurge::cli::reap::run_reap(&config, older_than_secs).await
        }
        Commands::Migrate { status, rollback } => {
            tweetpurge::cli::migrate::run_migrate(&config, status, rollback).await
        }
    }
}
