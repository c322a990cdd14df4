//! shmupfetch CLI application
//!
//! Command-line interface for discovering and downloading arcade shoot-'em-up
//! ROM sets from a remote catalog.

use std::process;

use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use shmupfetch::cli::{
    handle_developers, handle_fetch, handle_generate, handle_scan, Cli, Commands,
};
use shmupfetch::config::{AppConfig, LoggingConfig};
use shmupfetch::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();

    let first_run = if cli.global.config.is_none() {
        AppConfig::initialize_first_run().await
    } else {
        Ok(None)
    };
    let config = AppConfig::load(cli.global.config.clone()).await?;

    init_logging(&cli, &config.logging);

    info!("shmupfetch v{} starting", env!("CARGO_PKG_VERSION"));
    match first_run {
        Ok(Some(path)) => info!("Created default configuration at {}", path.display()),
        Ok(None) => {}
        Err(e) => warn!("Could not write default configuration: {}", e),
    }

    match cli.command {
        Commands::Developers => handle_developers(&config).await,
        Commands::Fetch(args) => {
            info!("Executing fetch command");
            handle_fetch(args, config).await
        }
        Commands::Scan(args) => {
            info!("Executing scan command");
            handle_scan(args, config).await
        }
        Commands::Generate(args) => {
            info!("Executing generate command");
            handle_generate(args, config).await
        }
    }
}

/// Initialize logging from CLI verbosity, falling back to the configured level
fn init_logging(cli: &Cli, logging: &LoggingConfig) {
    let level = cli
        .log_level()
        .map(|level| level.to_string().to_lowercase())
        .unwrap_or_else(|| logging.level.clone());

    let mut filter = EnvFilter::from_default_env();
    match format!("shmupfetch={}", level).parse() {
        Ok(directive) => filter = filter.add_directive(directive),
        Err(e) => eprintln!("Ignoring log level '{}': {}", level, e),
    }

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose) // Show levels only in very verbose mode
        .with_writer(std::io::stderr)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
