//! Blob Fetcher Library
//!
//! A Rust library for mirroring a filtered subset of an Azure Blob Storage
//! container into a local cache directory. Provides concurrent, bounded
//! downloading where individual failures are reported without aborting the
//! batch.

pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
