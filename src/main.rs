//! Precache - Offline cache controller
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use precache::cli::{Cli, Commands};
use precache::config::ConfigManager;
use precache::error::PrecacheResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> PrecacheResult<()> {
    let cli = Cli::parse();

    let manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = manager.load().await?;

    // 0 = warn (spinners only), 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("precache=warn"),
        1 => EnvFilter::new("precache=info"),
        _ => EnvFilter::new("precache=debug"),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if config.general.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.without_time().init();
    }
    debug!("Using config {}", manager.path().display());

    match cli.command {
        Commands::Update(args) => precache::cli::commands::update(args, &config, &manager).await,
        Commands::Fetch(args) => precache::cli::commands::fetch(args, &config, &manager).await,
        Commands::Status => precache::cli::commands::status(&config, &manager).await,
        Commands::Cache(args) => precache::cli::commands::cache(args, &config).await,
        Commands::Watch => precache::cli::commands::watch(&config, &manager).await,
        Commands::Push(args) => precache::cli::commands::push(args, &config, &manager).await,
        Commands::Config(args) => precache::cli::commands::config(args, &config, &manager).await,
    }
}
