//! Object store client abstraction
//!
//! The orchestration layer only ever talks to an [`ObjectStore`]: a capability
//! set of `resolve`, `list`, `is_leaf`, `suffix` and `fetch`. Concrete clients
//! own the wire protocol and credential handling.
//!
//! - [`azure`] - Azure Blob Storage over REST with a SAS URL
//! - [`memory`] - in-memory store with failure injection, used in tests
//! - [`cache_file`] - atomic temp-file-then-rename writes into the cache

pub mod azure;
pub mod cache_file;
pub mod config;
pub mod http;
pub mod listing;
pub mod memory;

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::app::models::{ObjectKind, RemoteObjectRef};
use crate::constants::store;
use crate::errors::{EnumerationError, EnumerationResult, FetchResult};

pub use azure::AzureBlobStore;
pub use cache_file::CacheFile;
pub use config::ClientConfig;
pub use http::HttpHandler;
pub use listing::ListingPage;
pub use memory::MemoryStore;

/// Capability set required from a remote object store client
#[async_trait]
pub trait ObjectStore: Send + Sync + Debug {
    /// Turn an identifier into a reference without querying the store
    ///
    /// Accepts `az://<container>/<key>` URIs and bare keys, which are taken
    /// relative to the store's default container.
    fn resolve(&self, uri: &str) -> EnumerationResult<RemoteObjectRef>;

    /// Immediate children of a directory
    async fn list(&self, directory: &RemoteObjectRef) -> EnumerationResult<Vec<RemoteObjectRef>>;

    /// Whether a reference names a downloadable object
    fn is_leaf(&self, object: &RemoteObjectRef) -> bool {
        object.kind() == ObjectKind::Leaf
    }

    /// File extension of a reference, including the leading dot
    fn suffix(&self, object: &RemoteObjectRef) -> String {
        object.suffix().to_string()
    }

    /// Download an object below `dest_dir`, returning the cached path
    async fn fetch(&self, object: &RemoteObjectRef, dest_dir: &Path) -> FetchResult<PathBuf>;

    /// Where `fetch` stores an object below `dest_dir`
    fn cache_path(&self, object: &RemoteObjectRef, dest_dir: &Path) -> FetchResult<PathBuf> {
        object.cache_path(dest_dir)
    }
}

/// Shared `resolve` logic: parse the identifier and fill in the `.` container
pub fn resolve_identifier(
    identifier: &str,
    default_container: Option<&str>,
) -> EnumerationResult<RemoteObjectRef> {
    let identifier = identifier.trim();
    let scheme = format!("{}://", store::URI_SCHEME);

    let object = if identifier.starts_with(&scheme) {
        RemoteObjectRef::parse(identifier)?
    } else {
        RemoteObjectRef::new(store::CURRENT_CONTAINER, identifier, ObjectKind::Unknown)
    };

    if !object.has_placeholder_container() {
        return Ok(object);
    }

    match default_container {
        Some(container) => Ok(object.with_container(container)),
        None => Err(EnumerationError::InvalidUri {
            uri: identifier.to_string(),
            reason: "the credential is not scoped to a container; use az://<container>/<path>"
                .to_string(),
        }),
    }
}
