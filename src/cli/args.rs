//! Command-line argument parsing for Blob Fetcher
//!
//! This module defines the CLI structure using clap derive macros. Every flag
//! that mirrors a config file setting is optional so that, when omitted, the
//! value from the config file (or its default) is used.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::auth::credential_from_env;
use crate::config::AppConfig;
use crate::errors::{CredentialError, CredentialResult};

/// Blob Fetcher - Mirror remote dataset assets into a local cache
#[derive(Parser, Debug)]
#[command(
    name = "blob_fetcher",
    version,
    about = "Download dataset assets from Azure Blob Storage into a local cache",
    long_about = "Enumerates the objects below a remote directory (or takes an explicit list), \
then downloads every object that is not already cached using a bounded pool of workers. \
Individual failures are reported at the end without stopping the run."
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
    /// Download objects into the local cache
    Download(DownloadArgs),

    /// Print the objects a download would fetch, without fetching
    List(ListArgs),
}

/// Where the objects come from; shared by `download` and `list`
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// SAS URL, or a file containing it [env: BLOB_FETCHER_CREDENTIAL]
    #[arg(long, value_name = "URL_OR_FILE")]
    pub credential: Option<String>,

    /// Remote directory to walk, e.g. az://./train_features
    #[arg(long, value_name = "URI")]
    pub remote_root: Option<String>,

    /// File listing object identifiers, one per line (skips discovery)
    #[arg(long, value_name = "FILE")]
    pub explicit_list: Option<PathBuf>,

    /// File suffix to keep during discovery (repeatable)
    #[arg(long = "suffix", value_name = "EXT")]
    pub suffixes: Vec<String>,
}

impl SourceArgs {
    /// Credential input from the flag, falling back to the environment
    pub fn credential_input(&self) -> CredentialResult<String> {
        self.credential
            .clone()
            .filter(|value| !value.trim().is_empty())
            .or_else(credential_from_env)
            .ok_or(CredentialError::Empty)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.explicit_list.is_some() && self.remote_root.is_some() {
            return Err(
                "--explicit-list bypasses discovery and cannot be combined with --remote-root"
                    .to_string(),
            );
        }

        if self.explicit_list.is_some() && !self.suffixes.is_empty() {
            return Err("--suffix only applies to discovery, not to --explicit-list".to_string());
        }

        Ok(())
    }

    /// Override config file values with the flags that were given
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(root) = &self.remote_root {
            config.discovery.remote_root = root.clone();
        }
        if !self.suffixes.is_empty() {
            config.discovery.suffixes = self.suffixes.clone();
        }
    }
}

/// Arguments for the download command
#[derive(Args, Debug, Clone, Default)]
pub struct DownloadArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Local cache directory
    #[arg(long, value_name = "DIR")]
    pub local_dir: Option<PathBuf>,

    /// Number of concurrent download workers
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Objects handed to a worker at a time
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Retries for transient failures (default: no retries)
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Abandon a single download after this many seconds
    #[arg(long, value_name = "SECS")]
    pub download_timeout: Option<u64>,

    /// Write a JSON report of every outcome to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Exit with status 2 if any object failed
    #[arg(long)]
    pub fail_on_error: bool,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl DownloadArgs {
    pub fn validate(&self) -> Result<(), String> {
        self.source.validate()?;

        if self.workers == Some(0) {
            return Err("Number of workers must be greater than 0".to_string());
        }

        if self.chunk_size == Some(0) {
            return Err("Chunk size must be greater than 0".to_string());
        }

        if self.download_timeout == Some(0) {
            return Err("Download timeout must be greater than 0 seconds".to_string());
        }

        Ok(())
    }

    /// Override config file values with the flags that were given
    pub fn apply_to(&self, config: &mut AppConfig) {
        self.source.apply_to(config);

        if let Some(dir) = &self.local_dir {
            config.discovery.local_dir = dir.clone();
        }
        if let Some(workers) = self.workers {
            config.fetch.worker_count = workers;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.fetch.chunk_size = chunk_size;
        }
        if let Some(max_retries) = self.max_retries {
            config.fetch.retry.max_retries = max_retries;
        }
        if let Some(secs) = self.download_timeout {
            config.fetch.download_timeout = Some(Duration::from_secs(secs));
        }
    }
}

/// Arguments for the list command
#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Logging level requested by flags, if any
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
