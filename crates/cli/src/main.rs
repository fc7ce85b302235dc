//! mpoll - watch a catalog feed for new items

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;
mod system_config;

/// mpoll - Get notified once about every new catalog item
#[derive(Parser)]
#[command(name = "mpoll")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll a feed and print newly added items
    Watch {
        /// Feed file to poll (default: poller.endpoint from config)
        #[arg(long)]
        feed: Option<PathBuf>,
        /// Seconds between polls (default: poller.interval_secs)
        #[arg(long)]
        interval: Option<i64>,
        /// Start from this RFC 3339 timestamp instead of the saved watermark
        #[arg(long)]
        since: Option<String>,
        /// Poll once and exit
        #[arg(long)]
        once: bool,
        /// Write logs to a daily rolling file in this directory
        #[arg(long)]
        log_dir: Option<PathBuf>,
    },
    /// Print every item in the feed
    Fetch {
        /// Feed file (default: poller.endpoint from config)
        #[arg(long)]
        feed: Option<PathBuf>,
    },
    /// View or edit configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// List all configuration values
    List,
    /// Print one configuration value
    Get {
        /// Key, e.g. poller.interval_secs
        key: String,
    },
    /// Set one configuration value
    Set { key: String, value: String },
    /// Show the config file location
    Path {
        /// Create the file with defaults if missing
        #[arg(long)]
        create: bool,
    },
    /// Print an example configuration
    Example,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Held for the lifetime of the process so buffered log lines get flushed
    let _log_guard = match &cli.command {
        Commands::Watch { log_dir: Some(dir), .. } => {
            let appender = tracing_appender::rolling::daily(dir, "mpoll.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        _ => {
            tracing_subscriber::fmt::init();
            None
        }
    };

    match cli.command {
        Commands::Watch { feed, interval, since, once, .. } => {
            cmd::watch::run(feed, interval, since, once).await
        }
        Commands::Fetch { feed } => cmd::fetch::run(feed).await,
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::List => cmd::config::run_list().await,
            ConfigCommands::Get { key } => cmd::config::run_get(&key).await,
            ConfigCommands::Set { key, value } => cmd::config::run_set(&key, &value).await,
            ConfigCommands::Path { create } => cmd::config::run_path(create).await,
            ConfigCommands::Example => cmd::config::run_example().await,
        },
    }
}
