//! Application constants for Blob Fetcher
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain.

use std::time::Duration;

/// Environment variable names
pub mod env {
    /// Fallback source for the SAS URL (or a path to a file holding it)
    pub const CREDENTIAL: &str = "BLOB_FETCHER_CREDENTIAL";
}

/// Object store addressing
pub mod store {
    /// URI scheme for remote objects
    pub const URI_SCHEME: &str = "az";

    /// Container placeholder meaning "the container the SAS URL is scoped to"
    pub const CURRENT_CONTAINER: &str = ".";

    /// Default remote root: the whole container
    pub const DEFAULT_REMOTE_ROOT: &str = "az://.";

    /// Suffixes fetched in discovery mode when none are configured
    pub const DEFAULT_SUFFIXES: &[&str] = &[".tif", ".geojson"];

    /// Azure Storage REST API version sent with every request
    pub const AZURE_API_VERSION: &str = "2021-08-06";

    /// Page size requested from List Blobs
    pub const LIST_PAGE_SIZE: u32 = 5000;

    /// Path separator inside blob names
    pub const DELIMITER: &str = "/";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = "Blob-Fetcher/0.1.0 (Dataset Download Tool)";

    /// Timeout for one listing page; blob downloads are not capped here
    pub const LIST_TIMEOUT: Duration = Duration::from_secs(300);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum idle connections per host in pool
    pub const POOL_MAX_PER_HOST: usize = 32;
}

/// Local file handling
pub mod files {
    /// Default local cache directory
    pub const DEFAULT_LOCAL_DIR: &str = "data";

    /// Suffix for in-progress downloads
    pub const TEMP_FILE_SUFFIX: &str = ".part";

    /// Project-local configuration file name
    pub const CONFIG_FILE_NAME: &str = "blob-fetcher.toml";

    /// Directory name under the user config dir
    pub const CONFIG_DIR_NAME: &str = "blob-fetcher";
}

/// Worker pool configuration
pub mod workers {
    use super::Duration;

    /// Default number of fetch workers
    pub const DEFAULT_WORKER_COUNT: usize = 8;

    /// Upper bound accepted for the worker count
    pub const MAX_WORKER_COUNT: usize = 128;

    /// Refs handed to a worker per scheduling round
    pub const DEFAULT_CHUNK_SIZE: usize = 10;

    /// Retries are disabled unless configured
    pub const DEFAULT_MAX_RETRIES: u32 = 0;

    /// Base delay between retries
    pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

    /// Jitter fraction applied to retry delays (0.0-1.0)
    pub const RETRY_JITTER: f64 = 0.2;
}

/// Logging constants
pub mod logging {
    /// Default log level
    pub const DEFAULT_LOG_LEVEL: &str = "warn";
}

// Re-export commonly used constants for convenience
pub use env::CREDENTIAL as ENV_CREDENTIAL;
pub use files::DEFAULT_LOCAL_DIR;
pub use http::USER_AGENT;
pub use store::{DEFAULT_REMOTE_ROOT, DEFAULT_SUFFIXES};
pub use workers::{DEFAULT_CHUNK_SIZE, DEFAULT_WORKER_COUNT};
