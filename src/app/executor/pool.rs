//! Fetch executor: a bounded worker pool built per run
//!
//! A producer task splits the input into chunks and feeds them through a
//! bounded channel to `worker_count` workers. Outcomes flow back over a single
//! channel to the caller. `run` is a barrier: it returns after every worker
//! has exited, with exactly one outcome per input ref.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::cancel::CancelToken;
use super::config::ExecutorConfig;
use super::worker::{FetchWorker, WorkUnit};
use crate::app::models::{FetchOutcome, RemoteObjectRef};
use crate::app::store::ObjectStore;
use crate::errors::ConfigResult;

/// Runs fetches for a batch of refs with bounded parallelism
#[derive(Debug, Clone)]
pub struct FetchExecutor {
    config: ExecutorConfig,
    store: Arc<dyn ObjectStore>,
    cache_dir: PathBuf,
    cancel: CancelToken,
}

impl FetchExecutor {
    /// Create an executor with its own cancel token
    pub fn new(
        config: ExecutorConfig,
        store: Arc<dyn ObjectStore>,
        cache_dir: impl Into<PathBuf>,
    ) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            cache_dir: cache_dir.into(),
            cancel: CancelToken::new(),
        })
    }

    /// Use a caller-owned cancel token
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Fetch every ref, returning one outcome per ref
    pub async fn run(&self, objects: Vec<RemoteObjectRef>) -> Vec<FetchOutcome> {
        self.run_with_observer(objects, |_| {}).await
    }

    /// Like [`run`](Self::run), calling `observer` as each outcome arrives
    pub async fn run_with_observer<F>(
        &self,
        objects: Vec<RemoteObjectRef>,
        mut observer: F,
    ) -> Vec<FetchOutcome>
    where
        F: FnMut(&FetchOutcome),
    {
        let total = objects.len();
        if total == 0 {
            return Vec::new();
        }

        let chunk_size = self.config.chunk_size;
        let chunk_count = (total + chunk_size - 1) / chunk_size;
        let worker_count = self.config.worker_count.min(chunk_count);

        info!(
            "Starting {} fetch workers for {} objects (chunk size {})",
            worker_count, total, chunk_size
        );

        let (chunk_tx, chunk_rx) = mpsc::channel::<Vec<WorkUnit>>(worker_count);
        let chunk_rx = Arc::new(Mutex::new(chunk_rx));
        let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();

        let producer = spawn_producer(objects.clone(), chunk_size, chunk_tx, self.cancel.clone());

        let workers: Vec<JoinHandle<usize>> = (0..worker_count)
            .map(|id| {
                let worker = FetchWorker::new(
                    id,
                    self.config.clone(),
                    self.store.clone(),
                    self.cache_dir.clone(),
                    self.cancel.clone(),
                );
                tokio::spawn(worker.run(chunk_rx.clone(), outcome_tx.clone()))
            })
            .collect();

        // Only workers hold senders now, so the loop ends when they all exit
        drop(outcome_tx);

        let mut reported = vec![false; total];
        let mut outcomes = Vec::with_capacity(total);

        while let Some((index, outcome)) = outcome_rx.recv().await {
            match reported.get_mut(index) {
                Some(seen) if !*seen => *seen = true,
                _ => {
                    warn!("Ignoring unexpected outcome for {}", outcome.object());
                    continue;
                }
            }
            observer(&outcome);
            outcomes.push(outcome);
        }

        if let Err(e) = producer.await {
            warn!("Chunk producer terminated abnormally: {}", e);
        }

        let mut worker_failures = 0;
        for handle in workers {
            match handle.await {
                Ok(processed) => debug!("Worker joined after {} refs", processed),
                Err(e) => {
                    warn!("Fetch worker terminated abnormally: {}", e);
                    worker_failures += 1;
                }
            }
        }

        // Anything still unreported was never dispatched or was lost with a worker
        let cancelled = self.cancel.is_cancelled();
        let mut unreported = 0;
        for (object, _) in objects
            .into_iter()
            .zip(reported)
            .filter(|(_, seen)| !seen)
        {
            let message = if cancelled {
                "Download cancelled before it started"
            } else {
                "Fetch worker terminated before reporting an outcome"
            };
            let outcome = FetchOutcome::failure(object, message);
            observer(&outcome);
            outcomes.push(outcome);
            unreported += 1;
        }

        if unreported > 0 {
            debug!(
                "{} refs had no outcome from a worker ({} worker failures, cancelled: {})",
                unreported, worker_failures, cancelled
            );
        }

        outcomes
    }
}

/// Feed the input to the workers in chunks, stopping early on cancellation
fn spawn_producer(
    objects: Vec<RemoteObjectRef>,
    chunk_size: usize,
    chunk_tx: mpsc::Sender<Vec<WorkUnit>>,
    cancel: CancelToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut chunk = Vec::with_capacity(chunk_size);

        for (index, object) in objects.into_iter().enumerate() {
            chunk.push(WorkUnit { index, object });
            if chunk.len() < chunk_size {
                continue;
            }

            let full = std::mem::replace(&mut chunk, Vec::with_capacity(chunk_size));
            if !dispatch(&chunk_tx, full, &cancel).await {
                return;
            }
        }

        if !chunk.is_empty() {
            dispatch(&chunk_tx, chunk, &cancel).await;
        }
    })
}

/// Send one chunk, returning false once no more chunks should be sent
async fn dispatch(
    chunk_tx: &mpsc::Sender<Vec<WorkUnit>>,
    chunk: Vec<WorkUnit>,
    cancel: &CancelToken,
) -> bool {
    if cancel.is_cancelled() {
        return false;
    }

    tokio::select! {
        sent = chunk_tx.send(chunk) => sent.is_ok(),
        _ = cancel.cancelled() => false,
    }
}
