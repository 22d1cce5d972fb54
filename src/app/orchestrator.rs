//! Entry orchestration for a sync run
//!
//! Sequences the stages of a run: resolve the credential, enumerate the
//! objects, fetch them with the worker pool, then aggregate and report.
//! Credential and enumeration errors abort the run; fetch failures only show
//! up in the summary.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::app::enumerator::{ObjectEnumerator, SuffixFilter};
use crate::app::executor::{CancelToken, ExecutorConfig, FetchExecutor};
use crate::app::models::{FetchOutcome, RemoteObjectRef};
use crate::app::store::{AzureBlobStore, ClientConfig, ObjectStore};
use crate::app::summary::{ResultAggregator, RunSummary};
use crate::auth::resolve_credential;
use crate::config::AppConfig;
use crate::errors::{EnumerationResult, Result};

/// Where the refs for a run come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectSource {
    /// Walk the tree below `root` and keep matching leaves
    Discover { root: String },
    /// Fetch exactly these identifiers, in order
    Explicit(Vec<String>),
}

/// Receives progress callbacks during [`Orchestrator::sync`]
pub trait SyncObserver {
    /// Enumeration finished; `total` refs will be fetched
    fn on_start(&mut self, _total: usize) {}

    /// One ref finished
    fn on_outcome(&mut self, _outcome: &FetchOutcome) {}

    /// All refs finished
    fn on_finish(&mut self, _summary: &RunSummary) {}
}

/// Observer that ignores every event
impl SyncObserver for () {}

/// Drives one sync against a store
#[derive(Debug, Clone)]
pub struct Orchestrator {
    enumerator: ObjectEnumerator,
    executor: FetchExecutor,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        executor_config: ExecutorConfig,
        cache_dir: impl Into<PathBuf>,
        filter: SuffixFilter,
        cancel: CancelToken,
    ) -> Result<Self> {
        let executor =
            FetchExecutor::new(executor_config, store.clone(), cache_dir)?.with_cancel_token(cancel);

        Ok(Self {
            enumerator: ObjectEnumerator::new(store, filter),
            executor,
        })
    }

    pub fn enumerator(&self) -> &ObjectEnumerator {
        &self.enumerator
    }

    pub fn executor(&self) -> &FetchExecutor {
        &self.executor
    }

    /// Refs a sync of `source` would fetch
    pub async fn enumerate(&self, source: &ObjectSource) -> EnumerationResult<Vec<RemoteObjectRef>> {
        match source {
            ObjectSource::Discover { root } => {
                info!("Retrieving path list.");
                self.enumerator.collect_discovered(root).await
            }
            ObjectSource::Explicit(identifiers) => {
                debug!("Using {} explicit identifiers", identifiers.len());
                self.enumerator.explicit(identifiers)
            }
        }
    }

    /// Enumerate, fetch, aggregate and report
    pub async fn sync<O>(&self, source: &ObjectSource, observer: &mut O) -> Result<RunSummary>
    where
        O: SyncObserver + ?Sized,
    {
        let started_at = Utc::now();
        let objects = self.enumerate(source).await?;

        info!("Downloading {} files.", objects.len());
        observer.on_start(objects.len());

        let outcomes = self
            .executor
            .run_with_observer(objects, |outcome| observer.on_outcome(outcome))
            .await;

        let summary = ResultAggregator::aggregate(outcomes, started_at);
        observer.on_finish(&summary);
        summary.report();
        Ok(summary)
    }
}

/// Inputs of one run that are not part of the config file
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// SAS URL, or a path to a file containing it
    pub credential: String,
    pub source: ObjectSource,
}

/// Build a store client from a credential string or file
pub fn connect(credential_input: &str, client: &ClientConfig) -> Result<Arc<dyn ObjectStore>> {
    let credential = resolve_credential(credential_input)?;
    let store = AzureBlobStore::new(credential, client)?;
    Ok(Arc::new(store))
}

/// Build an orchestrator for a remote store from loaded configuration
pub fn orchestrator_for(
    credential_input: &str,
    config: &AppConfig,
    cancel: CancelToken,
) -> Result<Orchestrator> {
    let store = connect(credential_input, &config.store)?;
    Orchestrator::new(
        store,
        config.fetch.clone(),
        config.discovery.local_dir.clone(),
        config.discovery.suffix_filter(),
        cancel,
    )
}

/// Run a complete sync against the remote store
pub async fn run_sync<O>(
    request: &RunRequest,
    config: &AppConfig,
    cancel: CancelToken,
    observer: &mut O,
) -> Result<RunSummary>
where
    O: SyncObserver + ?Sized,
{
    let orchestrator = orchestrator_for(&request.credential, config, cancel)?;
    orchestrator.sync(&request.source, observer).await
}
