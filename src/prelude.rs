//! Prelude module for Blob Fetcher Library
//!
//! This module re-exports the most commonly used items from the library,
//! providing a convenient way to import everything needed for typical usage
//! with a single `use blob_fetcher::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use blob_fetcher::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let store: Arc<dyn ObjectStore> = Arc::new(MemoryStore::new("data"));
//!     let refs = ObjectEnumerator::new(store.clone(), SuffixFilter::default())
//!         .collect_discovered("az://.")
//!         .await?;
//!
//!     let executor = FetchExecutor::new(ExecutorConfig::default(), store, "data")?;
//!     let summary = ResultAggregator::aggregate(executor.run(refs).await, chrono::Utc::now());
//!     summary.report();
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

// Essential app components that are used in most integrations
pub use crate::app::{
    // Store clients
    AzureBlobStore,
    MemoryStore,
    ObjectStore,

    // Enumeration
    ObjectEnumerator,
    SuffixFilter,

    // Execution
    CancelToken,
    ExecutorConfig,
    FetchExecutor,
    RetryPolicy,

    // Orchestration
    ObjectSource,
    Orchestrator,
    SyncObserver,

    // Data and result types
    FetchOutcome,
    RemoteObjectRef,
    ResultAggregator,
    RunSummary,
};

pub use crate::auth::{resolve_credential, Credential};
pub use crate::config::AppConfig;
