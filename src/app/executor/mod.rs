//! Concurrent fetch execution
//!
//! The executor takes the enumerated refs and fetches each into the local
//! cache with at most `worker_count` downloads in flight. Individual failures
//! are captured as [`FetchOutcome::Failure`](crate::app::models::FetchOutcome)
//! values and never abort the batch.
//!
//! # Module Organization
//!
//! - [`config`] - Pool size, chunk size, retry policy and timeout
//! - [`cancel`] - Cancellation token shared by producer and workers
//! - [`worker`] - Per-ref processing: skip rule, fetch, retry
//! - [`pool`] - Per-run pool with chunked dispatch and the outcome barrier
//!
//! # Basic Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use blob_fetcher::app::executor::{ExecutorConfigBuilder, FetchExecutor};
//! use blob_fetcher::app::store::{MemoryStore, ObjectStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new("data").with_object("a.tif", "a"));
//! let refs = vec![store.resolve("a.tif")?];
//!
//! let config = ExecutorConfigBuilder::new().worker_count(4).build()?;
//! let executor = FetchExecutor::new(config, store, "cache")?;
//!
//! let outcomes = executor.run(refs).await;
//! assert_eq!(outcomes.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod cancel;
pub mod config;
pub mod pool;
pub mod worker;

pub use cancel::CancelToken;
pub use config::{ExecutorConfig, ExecutorConfigBuilder, RetryPolicy};
pub use pool::FetchExecutor;
pub use worker::{FetchWorker, WorkUnit};
