//! Object enumeration
//!
//! Produces the list of objects a run should fetch, either by walking the
//! remote tree from a root URI and filtering leaves by file suffix
//! (discovery mode) or by resolving caller-supplied identifiers (explicit
//! mode).

use std::collections::{BTreeSet, VecDeque};
use std::path::Path;
use std::sync::Arc;

use futures::stream::{self, Stream, TryStreamExt};
use tracing::{debug, info};

use crate::app::models::{ObjectKind, RemoteObjectRef};
use crate::app::store::ObjectStore;
use crate::constants::store;
use crate::errors::{EnumerationError, EnumerationResult};

/// Case-insensitive allow-set of file suffixes
///
/// Entries are normalised to lower case with a leading dot, so `TIF`, `.tif`
/// and `.TIF` are the same entry. An empty set accepts every leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuffixFilter {
    suffixes: BTreeSet<String>,
}

impl Default for SuffixFilter {
    fn default() -> Self {
        Self::new(store::DEFAULT_SUFFIXES.iter().copied())
    }
}

impl SuffixFilter {
    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let suffixes = suffixes
            .into_iter()
            .filter_map(|suffix| normalize_suffix(suffix.as_ref()))
            .collect();
        Self { suffixes }
    }

    /// Filter that accepts every leaf
    pub fn any() -> Self {
        Self {
            suffixes: BTreeSet::new(),
        }
    }

    pub fn accepts_all(&self) -> bool {
        self.suffixes.is_empty()
    }

    /// Whether a suffix (with leading dot, any case) is allowed
    pub fn matches(&self, suffix: &str) -> bool {
        if self.accepts_all() {
            return true;
        }
        !suffix.is_empty() && self.suffixes.contains(&suffix.to_lowercase())
    }

    pub fn suffixes(&self) -> impl Iterator<Item = &str> {
        self.suffixes.iter().map(String::as_str)
    }
}

fn normalize_suffix(suffix: &str) -> Option<String> {
    let suffix = suffix.trim().trim_start_matches('.').to_lowercase();
    if suffix.is_empty() {
        None
    } else {
        Some(format!(".{}", suffix))
    }
}

/// Walk state carried between stream items
struct WalkState {
    start: Option<EnumerationResult<RemoteObjectRef>>,
    directories: Vec<RemoteObjectRef>,
    ready: VecDeque<RemoteObjectRef>,
}

/// Finds the objects to fetch
#[derive(Debug, Clone)]
pub struct ObjectEnumerator {
    store: Arc<dyn ObjectStore>,
    filter: SuffixFilter,
}

impl ObjectEnumerator {
    pub fn new(store: Arc<dyn ObjectStore>, filter: SuffixFilter) -> Self {
        Self { store, filter }
    }

    pub fn filter(&self) -> &SuffixFilter {
        &self.filter
    }

    /// Lazily walk the tree below `root_uri`, yielding matching leaves
    ///
    /// The walk is depth-first and each directory is listed only when the
    /// stream is polled past the leaves already found. Every call starts a
    /// fresh walk. The first error ends the stream.
    pub fn discover(
        &self,
        root_uri: &str,
    ) -> impl Stream<Item = EnumerationResult<RemoteObjectRef>> + Send + '_ {
        let start = self
            .store
            .resolve(root_uri)
            .map(|root| root.with_kind(ObjectKind::Directory));

        let state = WalkState {
            start: Some(start),
            directories: Vec::new(),
            ready: VecDeque::new(),
        };

        stream::try_unfold(state, move |state| self.next_object(state))
    }

    async fn next_object(
        &self,
        mut state: WalkState,
    ) -> EnumerationResult<Option<(RemoteObjectRef, WalkState)>> {
        if let Some(start) = state.start.take() {
            let root = start?;
            debug!("Walking {}", root);
            state.directories.push(root);
        }

        loop {
            if let Some(object) = state.ready.pop_front() {
                return Ok(Some((object, state)));
            }

            let Some(directory) = state.directories.pop() else {
                return Ok(None);
            };

            let mut subdirectories = Vec::new();
            for child in self.store.list(&directory).await? {
                if self.store.is_leaf(&child) {
                    if self.filter.matches(&self.store.suffix(&child)) {
                        state.ready.push_back(child);
                    }
                } else {
                    subdirectories.push(child);
                }
            }

            // Pushed in reverse so the first listed directory is walked next
            state.directories.extend(subdirectories.into_iter().rev());
        }
    }

    /// Run discovery to completion
    pub async fn collect_discovered(&self, root_uri: &str) -> EnumerationResult<Vec<RemoteObjectRef>> {
        let objects: Vec<RemoteObjectRef> = self.discover(root_uri).try_collect().await?;
        info!("Discovered {} objects under {}", objects.len(), root_uri);
        Ok(objects)
    }

    /// Resolve caller-supplied identifiers without listing, keeping their order
    pub fn explicit<I, S>(&self, identifiers: I) -> EnumerationResult<Vec<RemoteObjectRef>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        identifiers
            .into_iter()
            .map(|identifier| {
                let identifier = identifier.as_ref();
                let object = self.store.resolve(identifier)?;
                if object.key().is_empty() {
                    return Err(EnumerationError::InvalidUri {
                        uri: identifier.to_string(),
                        reason: "identifier names a container, not an object".to_string(),
                    });
                }
                Ok(object)
            })
            .collect()
    }
}

/// Read identifiers from a file, one per line
///
/// Blank lines and lines starting with `#` are skipped.
pub async fn read_explicit_list(path: &Path) -> EnumerationResult<Vec<String>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| EnumerationError::ExplicitList {
            path: path.to_path_buf(),
            source,
        })?;

    let identifiers: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();

    debug!("Read {} identifiers from {}", identifiers.len(), path.display());
    Ok(identifiers)
}
