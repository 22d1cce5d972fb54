//! Fetch executor configuration
//!
//! This module provides the configuration for the fetch worker pool: the
//! concurrency bound, the chunk size used when dispatching work, the retry
//! policy and an optional per-download timeout.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::workers;
use crate::errors::{ConfigError, ConfigResult};

/// Retry behaviour for transient per-object failures
///
/// The default performs no retries: a failed object is reported once and
/// left for the operator to re-run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Extra attempts after the first one (0 = never retry)
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,
    /// Random jitter applied to each delay, as a fraction (0.0-1.0)
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    /// Report failures immediately
    pub fn none() -> Self {
        Self {
            max_retries: workers::DEFAULT_MAX_RETRIES,
            retry_delay: workers::DEFAULT_RETRY_DELAY,
            jitter: workers::RETRY_JITTER,
        }
    }

    /// Retry transient failures up to `max_retries` times
    pub fn with_retries(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay,
            ..Self::none()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_retries > 0
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let base = self.retry_delay.saturating_mul(1u32 << exponent);

        if self.jitter <= 0.0 {
            return base;
        }

        let spread = base.as_secs_f64() * self.jitter;
        let offset = (fastrand::f64() * 2.0 - 1.0) * spread;
        // Near Duration::MAX the jittered value may not be representable
        Duration::try_from_secs_f64((base.as_secs_f64() + offset).max(0.0)).unwrap_or(base)
    }
}

/// Configuration for the fetch worker pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Number of concurrent workers (the in-flight bound)
    pub worker_count: usize,
    /// Refs handed to a worker per scheduling round
    pub chunk_size: usize,
    /// Retry policy for transient failures
    pub retry: RetryPolicy,
    /// Abandon a single download after this long
    #[serde(with = "humantime_serde")]
    pub download_timeout: Option<Duration>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            worker_count: workers::DEFAULT_WORKER_COUNT,
            chunk_size: workers::DEFAULT_CHUNK_SIZE,
            retry: RetryPolicy::none(),
            download_timeout: None,
        }
    }
}

impl ExecutorConfig {
    /// Validate configuration values and return errors for invalid settings
    pub fn validate(&self) -> ConfigResult<()> {
        if self.worker_count == 0 {
            return Err(invalid("worker_count", self.worker_count, "Worker count cannot be zero"));
        }

        if self.worker_count > workers::MAX_WORKER_COUNT {
            return Err(invalid(
                "worker_count",
                self.worker_count,
                &format!("Worker count exceeds maximum ({})", workers::MAX_WORKER_COUNT),
            ));
        }

        if self.chunk_size == 0 {
            return Err(invalid("chunk_size", self.chunk_size, "Chunk size cannot be zero"));
        }

        if !(0.0..=1.0).contains(&self.retry.jitter) {
            return Err(invalid(
                "retry.jitter",
                self.retry.jitter,
                "Jitter must be between 0.0 and 1.0",
            ));
        }

        if matches!(self.download_timeout, Some(timeout) if timeout.is_zero()) {
            return Err(invalid(
                "download_timeout",
                "0s",
                "Download timeout cannot be zero; omit it to disable",
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Builder for ExecutorConfig
#[derive(Debug, Default)]
pub struct ExecutorConfigBuilder {
    config: ExecutorConfig,
}

impl ExecutorConfigBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of workers
    pub fn worker_count(mut self, count: usize) -> Self {
        self.config.worker_count = count;
        self
    }

    /// Set the dispatch chunk size
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the retry policy
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    /// Set the per-download timeout
    pub fn download_timeout(mut self, timeout: Duration) -> Self {
        self.config.download_timeout = Some(timeout);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> ConfigResult<ExecutorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
