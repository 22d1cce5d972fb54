//! Individual fetch worker
//!
//! A worker repeatedly takes the next chunk of work units from the shared
//! dispatch channel and processes its refs one at a time. Every unit it takes
//! produces exactly one outcome on the outcome channel, whatever happens to
//! the fetch itself.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, trace};

use super::cancel::CancelToken;
use super::config::ExecutorConfig;
use crate::app::models::{FetchOutcome, RemoteObjectRef};
use crate::app::store::ObjectStore;
use crate::errors::{FetchError, FetchResult};

/// One ref to process, tagged with its position in the run input
#[derive(Debug, Clone)]
pub struct WorkUnit {
    pub index: usize,
    pub object: RemoteObjectRef,
}

/// Receiver end of the chunk dispatch channel, shared by all workers
pub type ChunkReceiver = Arc<Mutex<mpsc::Receiver<Vec<WorkUnit>>>>;

/// Sender end of the outcome channel
pub type OutcomeSender = mpsc::UnboundedSender<(usize, FetchOutcome)>;

/// A single fetch worker
#[derive(Debug)]
pub struct FetchWorker {
    id: usize,
    config: ExecutorConfig,
    store: Arc<dyn ObjectStore>,
    cache_dir: PathBuf,
    cancel: CancelToken,
}

impl FetchWorker {
    pub fn new(
        id: usize,
        config: ExecutorConfig,
        store: Arc<dyn ObjectStore>,
        cache_dir: PathBuf,
        cancel: CancelToken,
    ) -> Self {
        Self {
            id,
            config,
            store,
            cache_dir,
            cancel,
        }
    }

    /// Process chunks until the dispatch channel is closed and drained
    ///
    /// Returns the number of units processed.
    pub async fn run(self, chunks: ChunkReceiver, outcomes: OutcomeSender) -> usize {
        debug!("Worker {} starting", self.id);
        let mut processed = 0;

        loop {
            let chunk = {
                let mut receiver = chunks.lock().await;
                receiver.recv().await
            };

            let Some(chunk) = chunk else {
                break;
            };

            trace!("Worker {} took a chunk of {} refs", self.id, chunk.len());

            for unit in chunk {
                let outcome = self.process(unit.object).await;
                processed += 1;

                if outcomes.send((unit.index, outcome)).is_err() {
                    debug!("Worker {}: outcome channel closed, stopping", self.id);
                    return processed;
                }
            }
        }

        debug!("Worker {} finished after {} refs", self.id, processed);
        processed
    }

    /// Produce the outcome for one ref
    pub async fn process(&self, object: RemoteObjectRef) -> FetchOutcome {
        if self.cancel.is_cancelled() {
            return FetchOutcome::failure(object, FetchError::Cancelled.to_string());
        }

        let destination = match self.store.cache_path(&object, &self.cache_dir) {
            Ok(destination) => destination,
            Err(e) => {
                debug!("Failed to download {}. {}", object, e);
                return FetchOutcome::failure(object, e.to_string());
            }
        };

        if is_cached(&destination).await {
            trace!("Worker {}: {} already cached", self.id, object);
            return FetchOutcome::cached(object, destination);
        }

        let retry = &self.config.retry;
        let mut attempt = 0;

        loop {
            match self.attempt(&object).await {
                Ok(path) => {
                    trace!("Worker {}: fetched {}", self.id, object);
                    return FetchOutcome::downloaded(object, path);
                }
                Err(e) if e.is_transient() && attempt < retry.max_retries => {
                    attempt += 1;
                    let delay = retry.delay_for(attempt);
                    debug!(
                        "Retrying {} in {:?} (attempt {}/{}): {}",
                        object, delay, attempt, retry.max_retries, e
                    );

                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = self.cancel.cancelled() => {
                            return FetchOutcome::failure(object, FetchError::Cancelled.to_string());
                        }
                    }
                }
                Err(e) => {
                    debug!("Failed to download {}. {}", object, e);
                    return FetchOutcome::failure(object, e.to_string());
                }
            }
        }
    }

    /// One fetch call, bounded by the timeout and the cancel token
    async fn attempt(&self, object: &RemoteObjectRef) -> FetchResult<PathBuf> {
        let fetch = async {
            match self.config.download_timeout {
                Some(limit) => {
                    match tokio::time::timeout(limit, self.store.fetch(object, &self.cache_dir)).await
                    {
                        Ok(result) => result,
                        Err(_) => Err(FetchError::Timeout {
                            seconds: limit.as_secs(),
                        }),
                    }
                }
                None => self.store.fetch(object, &self.cache_dir).await,
            }
        };

        tokio::select! {
            result = fetch => result,
            _ = self.cancel.cancelled() => Err(FetchError::Cancelled),
        }
    }
}

/// Skip rule: a regular file already at the destination counts as fetched
async fn is_cached(destination: &Path) -> bool {
    tokio::fs::metadata(destination)
        .await
        .map(|metadata| metadata.is_file())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::executor::config::RetryPolicy;
    use crate::app::store::MemoryStore;
    use std::time::Duration;
    use tempfile::TempDir;

    fn worker(store: Arc<dyn ObjectStore>, cache_dir: &Path, config: ExecutorConfig) -> FetchWorker {
        FetchWorker::new(0, config, store, cache_dir.to_path_buf(), CancelToken::new())
    }

    #[tokio::test]
    async fn test_process_downloads_then_skips() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new("data").with_object("a.tif", "a"));
        let worker = worker(store.clone(), temp_dir.path(), ExecutorConfig::default());
        let object = store.resolve("a.tif").unwrap();

        let first = worker.process(object.clone()).await;
        assert!(first.is_success());
        assert!(!first.is_cached());

        let second = worker.process(object).await;
        assert!(second.is_cached());
        assert_eq!(store.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_process_reports_failure_message() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new("data").with_failure("b.tif", "boom"));
        let worker = worker(store.clone(), temp_dir.path(), ExecutorConfig::default());

        let outcome = worker.process(store.resolve("b.tif").unwrap()).await;
        assert_eq!(outcome.message(), Some("boom"));
    }

    #[tokio::test]
    async fn test_non_transient_errors_are_not_retried() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new("data"));
        let config = ExecutorConfig {
            retry: RetryPolicy::with_retries(3, Duration::from_millis(1)),
            ..ExecutorConfig::default()
        };
        let worker = worker(store.clone(), temp_dir.path(), config);

        let outcome = worker.process(store.resolve("missing.tif").unwrap()).await;
        assert!(outcome.is_failure());
        assert_eq!(store.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_timeout_is_retried() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(
            MemoryStore::new("data")
                .with_object("slow.tif", "s")
                .with_fetch_delay(Duration::from_millis(200)),
        );
        let config = ExecutorConfig {
            retry: RetryPolicy::with_retries(2, Duration::from_millis(1)),
            download_timeout: Some(Duration::from_millis(10)),
            ..ExecutorConfig::default()
        };
        let worker = worker(store.clone(), temp_dir.path(), config);

        let outcome = worker.process(store.resolve("slow.tif").unwrap()).await;
        assert!(outcome.message().unwrap().contains("timed out"));
        assert_eq!(store.fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_token_short_circuits() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new("data").with_object("a.tif", "a"));
        let worker = worker(store.clone(), temp_dir.path(), ExecutorConfig::default());
        worker.cancel.cancel();

        let outcome = worker.process(store.resolve("a.tif").unwrap()).await;
        assert_eq!(outcome.message(), Some("Download cancelled"));
        assert_eq!(store.fetch_count(), 0);
    }
}
