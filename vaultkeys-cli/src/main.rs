//! Vaultkeys CLI - inspect and follow vault account directories
//!
//! Opens a live account cache over one directory (or every directory named
//! in a vault client config file) and queries it.

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vaultkeys_cache::{CacheOptions, WatchMode};

mod commands;

#[derive(Parser)]
#[command(name = "vaultkeys")]
#[command(author = "Vaultkeys Contributors")]
#[command(version)]
#[command(about = "Live view of vault-backed account directories", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    source: SourceArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Where the account files live.
#[derive(Args)]
struct SourceArgs {
    /// Vault client config file (JSON)
    #[arg(short, long, global = true, conflicts_with = "dir")]
    config: Option<PathBuf>,

    /// Account directory
    #[arg(short, long, global = true)]
    dir: Option<PathBuf>,

    /// Vault server the account files refer to
    #[arg(long, global = true, default_value = "http://localhost:8200")]
    vault: String,

    /// Minimum milliseconds between rescans when not watching
    #[arg(long, global = true, default_value = "2000")]
    reload_ms: u64,

    /// Never use native change notifications
    #[arg(long, global = true)]
    poll: bool,
}

impl SourceArgs {
    fn options(&self) -> CacheOptions {
        CacheOptions {
            min_reload_interval: Duration::from_millis(self.reload_ms),
            watch: if self.poll {
                WatchMode::PollOnly
            } else {
                WatchMode::Native
            },
            ..CacheOptions::default()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List every account
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Resolve one account
    Find {
        /// Address or account URL
        target: String,
    },

    /// Show the metadata file an account was read from
    ConfigFile {
        /// Account address
        address: String,

        /// Account URL. Without it the address must resolve to a single account
        #[arg(long)]
        url: Option<String>,
    },

    /// Print the account list whenever the directory changes
    Watch,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let options = cli.source.options();
    let result = match commands::open(
        cli.source.config.as_deref(),
        cli.source.dir.as_deref(),
        &cli.source.vault,
        options,
    ) {
        Ok(sources) => match cli.command {
            Commands::List { json } => commands::list(&sources, json),
            Commands::Find { target } => commands::find(&sources, &target),
            Commands::ConfigFile { address, url } => {
                commands::config_file(&sources, &address, url.as_deref())
            }
            Commands::Watch => commands::watch(sources, options.min_reload_interval).await,
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
