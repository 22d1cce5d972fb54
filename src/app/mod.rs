//! Core application logic for Blob Fetcher
//!
//! This module contains the object store clients, the enumerator, the
//! concurrent fetch executor, result aggregation and the orchestration that
//! ties them together.
//!
//! # Examples
//!
//! ```rust,no_run
//! use blob_fetcher::app::{
//!     connect, CancelToken, ExecutorConfig, ObjectSource, Orchestrator, SuffixFilter,
//! };
//! use blob_fetcher::app::store::ClientConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = connect("sas_url.txt", &ClientConfig::default())?;
//! let orchestrator = Orchestrator::new(
//!     store,
//!     ExecutorConfig::default(),
//!     "data",
//!     SuffixFilter::default(),
//!     CancelToken::new(),
//! )?;
//!
//! let source = ObjectSource::Discover { root: "az://.".to_string() };
//! let summary = orchestrator.sync(&source, &mut ()).await?;
//! println!("{}", summary.render());
//! # Ok(())
//! # }
//! ```

pub mod enumerator;
pub mod executor;
pub mod models;
pub mod orchestrator;
pub mod store;
pub mod summary;

// Re-export main public API
pub use enumerator::{read_explicit_list, ObjectEnumerator, SuffixFilter};
pub use executor::{CancelToken, ExecutorConfig, ExecutorConfigBuilder, FetchExecutor, RetryPolicy};
pub use models::{FetchOutcome, FetchSource, ObjectKind, RemoteObjectRef};
pub use orchestrator::{
    connect, orchestrator_for, run_sync, ObjectSource, Orchestrator, RunRequest, SyncObserver,
};
pub use store::{AzureBlobStore, ClientConfig, MemoryStore, ObjectStore};
pub use summary::{ResultAggregator, RunSummary};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_structure() {
        // Ensure public API is accessible
        let config = ExecutorConfig::default();
        assert!(config.validate().is_ok());
        assert!(SuffixFilter::default().matches(".tif"));
    }
}
