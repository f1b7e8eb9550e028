//! FeedSync CLI
//!
//! Command-line runner for FeedSync installations.
//!
//! # Commands
//!
//! - `sync` - Pull the feed into the installation's store
//! - `cursor` - Print the committed cursor
//! - `inspect` - List stored records
//! - `version` - Show version information

mod client;
mod commands;
mod config;
mod log_sink;

use clap::{Parser, Subcommand};
use config::{Overrides, Settings};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// FeedSync command-line tools.
#[derive(Parser)]
#[command(name = "feedsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the installation config file
    #[arg(global = true, short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull new feed events into the installation's store
    Sync {
        /// Events requested per page (overrides the config file)
        #[arg(short, long)]
        limit: Option<u32>,

        /// Stop after this many pages (overrides the config file)
        #[arg(short, long)]
        max_pages: Option<u32>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print the committed cursor
    Cursor,

    /// List stored records with their last action IDs
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Sync {
            limit,
            max_pages,
            format,
        } => {
            let path = cli.config.ok_or("Config file required for sync")?;
            let settings = Settings::load(
                &path,
                &Overrides {
                    page_limit: limit,
                    max_pages,
                },
            )?;
            commands::sync::run(&settings, &format)?;
        }
        Commands::Cursor => {
            let path = cli.config.ok_or("Config file required for cursor")?;
            let settings = Settings::load(&path, &Overrides::default())?;
            commands::cursor::run(&settings)?;
        }
        Commands::Inspect { format } => {
            let path = cli.config.ok_or("Config file required for inspect")?;
            let settings = Settings::load(&path, &Overrides::default())?;
            commands::inspect::run(&settings, &format)?;
        }
        Commands::Version => {
            println!("FeedSync CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
