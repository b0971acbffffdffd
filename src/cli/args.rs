//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Precache - Offline cache controller
///
/// Precaches a site's assets into versioned cache generations and serves
/// requests network-first, falling back to the cache when offline.
#[derive(Parser, Debug)]
#[command(name = "precache")]
#[command(author, version, about = "Precache - Offline cache controller", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "PRECACHE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check for a new version and install it
    Update(UpdateArgs),

    /// Fetch a URL through the active controller
    Fetch(FetchArgs),

    /// Show registration and cache status
    Status,

    /// Inspect or clear cache generations
    Cache(CacheArgs),

    /// Keep a page open and reload it when a new version takes over
    Watch,

    /// Deliver a push message and show the resulting notification
    Push(PushArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Arguments for the update command
#[derive(Parser, Debug)]
pub struct UpdateArgs {
    /// Activate a waiting controller right away
    #[arg(long)]
    pub skip_waiting: bool,
}

/// Arguments for the fetch command
#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// Root-relative URL to request (e.g. /index.html)
    pub url: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// Treat the request as a page navigation
    #[arg(short, long)]
    pub navigate: bool,

    /// Write the response body to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the push command
#[derive(Parser, Debug)]
pub struct PushArgs {
    /// Message text carried by the push (default body if omitted)
    pub message: Option<String>,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., controller.generation)
        key: String,
        /// Value to set
        value: String,
    },
}

/// Output format for listings
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List cache generations
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// List the entries of one generation
    Show {
        /// Generation name (defaults to the active one)
        generation: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Delete all cache generations and the registration
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}
