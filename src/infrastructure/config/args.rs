//! Command-line arguments.

use super::app_config::LogLevel;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments. Flags override the configuration file.
#[derive(Debug, Parser)]
#[command(
    name = "eventpix",
    version,
    about = "Inspect and maintain the on-device event photo cache",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log file path. Logs go to stderr when unset.
    #[arg(long, value_name = "PATH", global = true)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum, global = true)]
    pub log_level: Option<LogLevel>,

    /// Cache directory.
    #[arg(long, value_name = "PATH", env = "EVENTPIX_CACHE_DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Entry lifetime in seconds.
    #[arg(long, value_name = "SECONDS", global = true)]
    pub max_age_secs: Option<u64>,

    /// Maximum URLs kept in the memory index.
    #[arg(long, value_name = "COUNT", global = true)]
    pub max_memory_entries: Option<usize>,

    /// Network request timeout in seconds.
    #[arg(long, value_name = "SECONDS", global = true)]
    pub request_timeout_secs: Option<u64>,

    /// Skip the expired-file sweep at startup.
    #[arg(long, global = true)]
    pub no_sweep: bool,

    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Cache maintenance commands.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Print what a view should display for a URL, caching it in the background.
    Source {
        /// Image URL.
        url: String,
        /// Reference printed when the URL is empty.
        #[arg(long, default_value = "placeholder.png")]
        fallback: String,
    },
    /// Download a URL into the cache and print its local path.
    Fetch {
        /// Image URLs.
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Report whether a URL is cached.
    Status {
        /// Image URL.
        url: String,
        /// Print JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print the total size of the cache directory.
    Size {
        /// Print JSON.
        #[arg(long)]
        json: bool,
    },
    /// Delete expired files.
    Sweep,
    /// Delete everything in the cache.
    Clear,
}
