//! Error types for Blob Fetcher
//!
//! This module defines the error taxonomy for every stage of a sync run.
//! Credential and enumeration errors are fatal and abort the run before any
//! download starts; fetch errors are per-object and only ever surface as a
//! failed outcome in the run summary.

use std::path::PathBuf;
use thiserror::Error;

/// Credential resolution errors
#[derive(Error, Debug)]
pub enum CredentialError {
    /// Resolved credential string is empty
    #[error(
        "Missing SAS URL. Pass --credential with the URL or a file containing it, or set BLOB_FETCHER_CREDENTIAL"
    )]
    Empty,

    /// Credential file exists but could not be read
    #[error("Failed to read credential file: {path}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Credential is not an absolute http(s) URL
    #[error("Invalid SAS URL: {reason}")]
    InvalidUrl { reason: String },
}

/// Remote tree enumeration errors (fatal for the whole run)
#[derive(Error, Debug)]
pub enum EnumerationError {
    /// Root directory does not exist in the store
    #[error("Remote directory not found: {uri}")]
    RootNotFound { uri: String },

    /// Malformed object URI
    #[error("Invalid object URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    /// Store rejected the credential for listing
    #[error("Permission denied listing {uri}. The SAS URL may be expired or lack list permission")]
    PermissionDenied { uri: String },

    /// Store answered with an unexpected status
    #[error("Store returned HTTP {status} while listing {uri}")]
    ServerError { uri: String, status: u16 },

    /// Store unreachable
    #[error("Object store unreachable: {0}")]
    Http(reqwest::Error),

    /// Listing response could not be parsed
    #[error("Malformed listing response: {reason}")]
    InvalidListing { reason: String },

    /// Explicit object list could not be read
    #[error("Failed to read explicit object list: {path}")]
    ExplicitList {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Per-object download errors
#[derive(Error, Debug)]
pub enum FetchError {
    /// Object does not exist in the store
    #[error("Object not found: {uri}")]
    NotFound { uri: String },

    /// Store rejected the credential for this object
    #[error("Permission denied: {uri}")]
    PermissionDenied { uri: String },

    /// Store returned an error status
    #[error("Server error: HTTP {status}")]
    ServerError { status: u16 },

    /// HTTP transport error
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),

    /// I/O error writing the cache file
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Download exceeded the configured timeout
    #[error("Download timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// Object key cannot be mapped to a cache path
    #[error("Object key cannot be cached safely: {key}")]
    InvalidPath { key: String },

    /// Temp file could not be moved into place
    #[error("Atomic file operation failed: could not rename {temp_path} to {final_path}")]
    AtomicOperationFailed {
        temp_path: PathBuf,
        final_path: PathBuf,
    },

    /// Run was cancelled before the download finished
    #[error("Download cancelled")]
    Cancelled,

    /// Anything else reported by a store client
    #[error("{0}")]
    Other(String),
}

impl FetchError {
    /// Whether a retry could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Http(_) | FetchError::Timeout { .. } => true,
            FetchError::ServerError { status } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

// Request URLs carry the SAS signature, so it is stripped before the error
// can reach a log line, an outcome message or a report.
impl From<reqwest::Error> for EnumerationError {
    fn from(e: reqwest::Error) -> Self {
        EnumerationError::Http(e.without_url())
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Http(e.without_url())
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Configuration file could not be read
    #[error("Failed to read configuration file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration format
    #[error("Invalid configuration format: {0}")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Credential error
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Enumeration error
    #[error(transparent)]
    Enumeration(#[from] EnumerationError),

    /// Fetch error outside of the worker pool (e.g. store construction)
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Run completed with failures and the caller asked for a failing exit
    #[error("{failed} of {total} files failed to download")]
    FailedDownloads { failed: usize, total: usize },

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Whether the error aborted the run before any download was attempted
    pub fn is_fatal(&self) -> bool {
        !matches!(self, AppError::FailedDownloads { .. })
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::FailedDownloads { .. } => 2,
            _ => 1,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Credential(_) => "credential",
            AppError::Enumeration(_) => "enumeration",
            AppError::Fetch(_) => "fetch",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::FailedDownloads { .. } => "partial-failure",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Credential result type alias
pub type CredentialResult<T> = std::result::Result<T, CredentialError>;

/// Enumeration result type alias
pub type EnumerationResult<T> = std::result::Result<T, EnumerationError>;

/// Fetch result type alias
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
