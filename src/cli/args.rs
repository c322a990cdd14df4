//! Command-line argument parsing for shmupfetch
//!
//! This module defines the CLI structure using clap derive macros: catalog
//! discovery, fetching, local inventory and record generation.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::app::FetchOptions;

/// shmupfetch - Fetch arcade shoot-'em-up ROM sets
#[derive(Parser, Debug)]
#[command(
    name = "shmupfetch",
    version,
    about = "Discover, reconcile and download arcade shoot-'em-up ROM sets",
    long_about = "Lists shoot-'em-up games per developer from a remote arcade catalog, compares them
against a local ROM directory and downloads the missing sets with retries, size checks
and atomic placement."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the configured developers
    Developers,

    /// Refresh the catalog, reconcile and download
    Fetch(FetchArgs),

    /// Show local inventory and catalog store statistics
    Scan(ScanArgs),

    /// Emit records for owned games known to the catalog store
    Generate(GenerateArgs),
}

/// Record output format
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable, grouped by developer
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Arguments for the fetch command
#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// Developer to fetch (see `shmupfetch developers`)
    #[arg(value_name = "DEVELOPER", required_unless_present = "all")]
    pub developer: Option<String>,

    /// Fetch every configured developer
    #[arg(long, conflicts_with = "developer")]
    pub all: bool,

    /// Only select games missing from the destination
    #[arg(long)]
    pub missing_only: bool,

    /// Show the selection without downloading
    #[arg(long)]
    pub dry_run: bool,

    /// Use the catalog store only, no listing requests
    #[arg(long)]
    pub offline: bool,

    /// Restrict to these identifiers
    #[arg(long, value_name = "ID", num_args = 1..)]
    pub only: Vec<String>,

    /// Maximum number of games to select per developer
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Destination directory (overrides configuration)
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Number of concurrent downloads (overrides configuration)
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Record output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Arguments for the scan command
#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Directory to scan (overrides configuration)
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,
}

/// Arguments for the generate command
#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Directory to scan (overrides configuration)
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Record output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Logging level from the verbosity flags, if any was given
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::ERROR)
        } else if self.global.very_verbose {
            Some(tracing::Level::DEBUG)
        } else if self.global.verbose {
            Some(tracing::Level::INFO)
        } else {
            None
        }
    }
}

impl FetchArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == Some(0) {
            return Err("Number of workers must be greater than 0".to_string());
        }
        if self.limit == Some(0) {
            return Err("Limit must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn options(&self) -> FetchOptions {
        FetchOptions {
            missing_only: self.missing_only,
            only: self.only.clone(),
            limit: self.limit,
            offline: self.offline,
            dry_run: self.dry_run,
        }
    }
}
