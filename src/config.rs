//! Configuration management for Blob Fetcher
//!
//! Settings come from, in increasing precedence: built-in defaults, a TOML
//! file and command-line flags. Every section and field is optional in the
//! file; missing values keep their defaults.
//!
//! ```toml
//! [store]
//! list_timeout = "5m"
//! rate_limit_rps = 0
//!
//! [fetch]
//! worker_count = 8
//! chunk_size = 10
//! download_timeout = "10m"
//!
//! [fetch.retry]
//! max_retries = 0
//! retry_delay = "1s"
//!
//! [discovery]
//! remote_root = "az://."
//! local_dir = "data"
//! suffixes = [".tif", ".geojson"]
//!
//! [logging]
//! level = "warn"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::enumerator::SuffixFilter;
use crate::app::executor::ExecutorConfig;
use crate::app::store::ClientConfig;
use crate::constants::{files, logging, store};
use crate::errors::{ConfigError, ConfigResult};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP client settings for the object store
    pub store: ClientConfig,
    /// Worker pool settings
    pub fetch: ExecutorConfig,
    /// What to fetch and where to put it
    pub discovery: DiscoveryConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Source and destination of a sync
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Directory URI to walk in discovery mode
    pub remote_root: String,
    /// Local cache directory
    pub local_dir: PathBuf,
    /// File suffixes to keep (empty = everything)
    pub suffixes: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            remote_root: store::DEFAULT_REMOTE_ROOT.to_string(),
            local_dir: PathBuf::from(files::DEFAULT_LOCAL_DIR),
            suffixes: store::DEFAULT_SUFFIXES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl DiscoveryConfig {
    pub fn suffix_filter(&self) -> SuffixFilter {
        SuffixFilter::new(&self.suffixes)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level used when no verbosity flag is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: logging::DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl LoggingConfig {
    /// Parsed log level
    pub fn level(&self) -> ConfigResult<tracing::Level> {
        self.level
            .parse::<tracing::Level>()
            .map_err(|_| ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                value: self.level.clone(),
                reason: "Expected one of error, warn, info, debug, trace".to_string(),
            })
    }
}

impl AppConfig {
    /// Load configuration with precedence:
    /// 1. Default values
    /// 2. Config file (explicit path, or the first one found)
    ///
    /// CLI flags are applied afterwards by the command handlers.
    pub async fn load(config_file_override: Option<&Path>) -> ConfigResult<Self> {
        let config_path = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound {
                        path: path.to_path_buf(),
                    });
                }
                Some(path.to_path_buf())
            }
            None => Self::find_config_file(),
        };

        let config = match config_path {
            Some(path) => Self::load_from_file(&path).await?,
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> ConfigResult<()> {
        self.fetch.validate()?;

        if self.discovery.remote_root.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "discovery.remote_root".to_string(),
                value: String::new(),
                reason: "Remote root cannot be empty".to_string(),
            });
        }

        self.logging.level()?;
        Ok(())
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(".").join(files::CONFIG_FILE_NAME)];
        if let Some(path) = Self::default_config_path() {
            search_paths.push(path);
        }

        for path in search_paths {
            if path.exists() {
                debug!("Found config file: {}", path.display());
                return Some(path);
            }
        }

        debug!("No config file found in standard locations");
        None
    }

    /// Per-user config file path, if the platform has a config directory
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(files::CONFIG_DIR_NAME).join("config.toml"))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let config: AppConfig = toml::from_str(&content)?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::workers;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.fetch.worker_count, workers::DEFAULT_WORKER_COUNT);
        assert_eq!(config.fetch.chunk_size, workers::DEFAULT_CHUNK_SIZE);
        assert_eq!(config.fetch.retry.max_retries, 0);
        assert_eq!(config.discovery.remote_root, "az://.");
        assert_eq!(config.discovery.local_dir, PathBuf::from("data"));
        assert_eq!(config.discovery.suffix_filter(), SuffixFilter::default());
        assert_eq!(config.logging.level, logging::DEFAULT_LOG_LEVEL);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_round_trip_through_toml() {
        let config = AppConfig::default();
        let content = toml::to_string(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed, config);
    }

    #[tokio::test]
    async fn test_config_loading_nonexistent_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let result = AppConfig::load(Some(&config_path)).await;
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_config_loading_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("blob-fetcher.toml");

        let content = r#"
[fetch]
worker_count = 16
download_timeout = "2m"

[fetch.retry]
max_retries = 2
retry_delay = "500ms"

[discovery]
suffixes = ["tif"]

[logging]
level = "debug"
"#;
        tokio::fs::write(&config_path, content).await.unwrap();

        let config = AppConfig::load(Some(&config_path)).await.unwrap();

        assert_eq!(config.fetch.worker_count, 16);
        assert_eq!(config.fetch.download_timeout, Some(Duration::from_secs(120)));
        assert_eq!(config.fetch.retry.max_retries, 2);
        assert_eq!(config.fetch.retry.retry_delay, Duration::from_millis(500));
        assert!(config.discovery.suffix_filter().matches(".TIF"));
        assert!(!config.discovery.suffix_filter().matches(".geojson"));
        assert_eq!(config.logging.level, "debug");

        // Unspecified values keep their defaults
        assert_eq!(config.fetch.chunk_size, workers::DEFAULT_CHUNK_SIZE);
        assert_eq!(config.discovery.local_dir, PathBuf::from("data"));
    }

    #[tokio::test]
    async fn test_config_rejects_invalid_values() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bad.toml");

        tokio::fs::write(&config_path, "[fetch]\nworker_count = 0\n")
            .await
            .unwrap();
        assert!(matches!(
            AppConfig::load(Some(&config_path)).await,
            Err(ConfigError::InvalidValue { .. })
        ));

        tokio::fs::write(&config_path, "[fetch\nworker_count = ")
            .await
            .unwrap();
        assert!(matches!(
            AppConfig::load(Some(&config_path)).await,
            Err(ConfigError::InvalidFormat(_))
        ));
    }
}
