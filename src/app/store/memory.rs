//! In-memory object store
//!
//! A single-container store backed by a map of blob names to bytes. It
//! supports failure injection and an artificial fetch delay, and keeps
//! counters (fetch calls, list calls, peak concurrent fetches) so tests can
//! observe how the executor drives a store.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{resolve_identifier, CacheFile, ObjectStore};
use crate::app::models::{ObjectKind, RemoteObjectRef};
use crate::errors::{EnumerationError, EnumerationResult, FetchError, FetchResult};

/// Store that serves objects from memory
#[derive(Debug)]
pub struct MemoryStore {
    container: String,
    objects: BTreeMap<String, Vec<u8>>,
    failures: HashMap<String, String>,
    fetch_delay: Duration,
    fetch_calls: AtomicUsize,
    list_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store for one container
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            objects: BTreeMap::new(),
            failures: HashMap::new(),
            fetch_delay: Duration::ZERO,
            fetch_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Add an object
    pub fn with_object(mut self, key: &str, content: impl Into<Vec<u8>>) -> Self {
        let key = RemoteObjectRef::new(self.container.as_str(), key, ObjectKind::Leaf)
            .key()
            .to_string();
        self.objects.insert(key, content.into());
        self
    }

    /// Make every fetch of `key` fail with `message`
    pub fn with_failure(mut self, key: &str, message: impl Into<String>) -> Self {
        self.failures.insert(key.to_string(), message.into());
        self
    }

    /// Sleep this long inside every fetch
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    /// Container name served by this store
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Number of `fetch` calls so far
    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Number of `list` calls so far
    pub fn list_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Highest number of fetches observed running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn children(&self, directory: &RemoteObjectRef) -> Vec<RemoteObjectRef> {
        let prefix = if directory.key().is_empty() {
            String::new()
        } else {
            format!("{}/", directory.key())
        };

        let mut leaves = Vec::new();
        let mut directories = BTreeSet::new();

        for key in self.objects.keys() {
            let Some(rest) = key.strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((dir, _)) => {
                    directories.insert(dir.to_string());
                }
                None => leaves.push(directory.child(rest, ObjectKind::Leaf)),
            }
        }

        leaves.extend(
            directories
                .into_iter()
                .map(|dir| directory.child(&dir, ObjectKind::Directory)),
        );
        leaves
    }
}

/// Decrements the in-flight counter even if the fetch future is dropped
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn resolve(&self, uri: &str) -> EnumerationResult<RemoteObjectRef> {
        resolve_identifier(uri, Some(&self.container))
    }

    async fn list(&self, directory: &RemoteObjectRef) -> EnumerationResult<Vec<RemoteObjectRef>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        if directory.container() != self.container {
            return Err(EnumerationError::RootNotFound {
                uri: directory.uri(),
            });
        }

        let children = self.children(directory);
        if children.is_empty() && !directory.key().is_empty() {
            return Err(EnumerationError::RootNotFound {
                uri: directory.uri(),
            });
        }

        Ok(children)
    }

    async fn fetch(&self, object: &RemoteObjectRef, dest_dir: &Path) -> FetchResult<PathBuf> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }

        if let Some(message) = self.failures.get(object.key()) {
            debug!("Injected failure for {}", object);
            return Err(FetchError::Other(message.clone()));
        }

        let content = match self.objects.get(object.key()) {
            Some(content) if object.container() == self.container => content,
            _ => {
                return Err(FetchError::NotFound { uri: object.uri() });
            }
        };

        let destination = self.cache_path(object, dest_dir)?;
        CacheFile::write_all(&destination, content).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_store() -> MemoryStore {
        MemoryStore::new("data")
            .with_object("train/a.tif", "a")
            .with_object("train/chips/b.tif", "b")
            .with_object("readme.txt", "r")
    }

    #[tokio::test]
    async fn test_list_root_and_subdirectory() {
        let store = sample_store();
        let root = store.resolve("az://.").unwrap();

        let children = store.list(&root).await.unwrap();
        let uris: Vec<_> = children.iter().map(|c| c.uri()).collect();
        assert_eq!(uris, vec!["az://data/readme.txt", "az://data/train"]);
        assert!(store.is_leaf(&children[0]));
        assert!(!store.is_leaf(&children[1]));

        let train = store.list(&children[1]).await.unwrap();
        let uris: Vec<_> = train.iter().map(|c| c.uri()).collect();
        assert_eq!(uris, vec!["az://data/train/a.tif", "az://data/train/chips"]);
        assert_eq!(store.list_count(), 2);
    }

    #[tokio::test]
    async fn test_list_missing_directory() {
        let store = sample_store();
        let missing = store.resolve("az://./nope").unwrap();
        assert!(matches!(
            store.list(&missing).await,
            Err(EnumerationError::RootNotFound { .. })
        ));

        let other_container = store.resolve("az://other/").unwrap();
        assert!(store.list(&other_container).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_writes_cache_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = sample_store();
        let object = store.resolve("train/a.tif").unwrap();

        let path = store.fetch(&object, temp_dir.path()).await.unwrap();
        assert_eq!(path, temp_dir.path().join("data/train/a.tif"));
        assert_eq!(std::fs::read(&path).unwrap(), b"a");
        assert_eq!(store.fetch_count(), 1);
        assert_eq!(store.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failures() {
        let temp_dir = TempDir::new().unwrap();
        let store = sample_store().with_failure("train/a.tif", "connection reset");

        let failing = store.resolve("train/a.tif").unwrap();
        let err = store.fetch(&failing, temp_dir.path()).await.unwrap_err();
        assert_eq!(err.to_string(), "connection reset");

        let missing = store.resolve("train/missing.tif").unwrap();
        assert!(matches!(
            store.fetch(&missing, temp_dir.path()).await,
            Err(FetchError::NotFound { .. })
        ));
    }
}
