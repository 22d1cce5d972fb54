//! Command-line interface components
//!
//! This module contains CLI-specific code for the Blob Fetcher application,
//! including argument parsing, command handlers and progress display.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{Cli, Commands, DownloadArgs, GlobalArgs, ListArgs, SourceArgs};
pub use commands::{handle_download, handle_list};
pub use progress::{ProgressConfig, ProgressDisplay};
