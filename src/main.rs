//! Blob Fetcher CLI application
//!
//! Command-line interface for mirroring dataset assets from Azure Blob
//! Storage into a local cache directory.

use std::process;

use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

use blob_fetcher::cli::{handle_download, handle_list, Cli, Commands};
use blob_fetcher::config::AppConfig;
use blob_fetcher::errors::Result;

#[tokio::main]
async fn main() {
    // Initialize program
    let result = run().await;

    // Handle any errors that occurred
    if let Err(e) = result {
        debug!("Exiting after {} error", e.category());
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    // Parse command line arguments
    let cli = Cli::parse_args();

    let config = AppConfig::load(cli.global.config.as_deref()).await?;

    // Initialize logging based on verbosity, falling back to the config file
    init_logging(&cli, &config);

    info!("Blob Fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    // Execute the appropriate command
    match cli.command {
        Commands::Download(args) => {
            info!("Executing download command");
            handle_download(args, config).await
        }
        Commands::List(args) => {
            info!("Executing list command");
            handle_list(args, config).await
        }
    }
}

/// Initialize logging based on CLI verbosity settings
fn init_logging(cli: &Cli, config: &AppConfig) {
    let log_level = cli
        .log_level()
        .or_else(|| config.logging.level().ok())
        .unwrap_or(tracing::Level::WARN);

    // Create environment filter
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("blob_fetcher={}", log_level).parse() {
        filter = filter.add_directive(directive);
    }

    // Initialize subscriber
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_level(cli.global.very_verbose) // Show levels only in very verbose mode
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
