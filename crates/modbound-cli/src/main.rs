//! modbound CLI tool.
//!
//! Usage:
//! ```bash
//! modbound check [OPTIONS] [PATH]
//! modbound sync [OPTIONS] [PATH]
//! modbound init
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

/// Module-boundary checker for Rust projects
#[derive(Parser)]
#[command(name = "modbound")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check imports against the declared module contracts
    Check {
        /// Project root (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Skip the result cache for this run
        #[arg(long)]
        no_cache: bool,

        /// Project-relative file known to have changed (repeatable)
        #[arg(long = "changed", value_name = "FILE")]
        changed: Vec<PathBuf>,
    },

    /// Rewrite depends-on declarations to match the observed imports
    Sync {
        /// Project root (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Also drop declarations no import backs
        #[arg(long)]
        prune: bool,

        /// Print the updated configuration instead of writing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Initialize a configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

/// Output format for check results.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
    /// One-line-per-violation compact format.
    Compact,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Check {
            path,
            format,
            no_cache,
            changed,
        } => commands::check::run(&path, format, no_cache, changed),
        Commands::Sync {
            path,
            prune,
            dry_run,
        } => commands::sync::run(&path, prune, dry_run),
        Commands::Init { force } => commands::init::run(force),
    }
}
