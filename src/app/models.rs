//! Data models for Blob Fetcher
//!
//! This module defines the core data structures shared by the enumerator, the
//! fetch executor and the result aggregator: remote object references and the
//! per-object fetch outcome.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::constants::store;
use crate::errors::{EnumerationError, EnumerationResult, FetchError, FetchResult};

/// What an object reference is known to point at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// A blob that can be downloaded
    Leaf,
    /// A virtual directory (blob name prefix)
    Directory,
    /// Resolved from a URI without asking the store
    Unknown,
}

/// Reference to one object in the remote store
///
/// Equality, hashing and ordering consider only the path
/// (`container` and `key`); the kind is metadata learned from listing.
#[derive(Debug, Clone, Serialize)]
pub struct RemoteObjectRef {
    /// Container (bucket) name
    container: String,
    /// Blob name inside the container, without leading or trailing `/`
    key: String,
    /// Kind learned from the store
    #[serde(skip)]
    kind: ObjectKind,
}

impl RemoteObjectRef {
    /// Create a reference from its parts
    pub fn new(container: impl Into<String>, key: &str, kind: ObjectKind) -> Self {
        Self {
            container: container.into(),
            key: normalize_key(key),
            kind,
        }
    }

    /// Parse an `az://<container>/<key>` URI
    ///
    /// The container may be `.`, meaning the container the credential is
    /// scoped to; stores replace it when resolving.
    pub fn parse(uri: &str) -> EnumerationResult<Self> {
        let prefix = format!("{}://", store::URI_SCHEME);
        let rest = uri
            .strip_prefix(&prefix)
            .ok_or_else(|| EnumerationError::InvalidUri {
                uri: uri.to_string(),
                reason: format!("expected a URI starting with '{}'", prefix),
            })?;

        let (container, key) = match rest.split_once('/') {
            Some((container, key)) => (container, key),
            None => (rest, ""),
        };

        if container.is_empty() {
            return Err(EnumerationError::InvalidUri {
                uri: uri.to_string(),
                reason: "missing container name".to_string(),
            });
        }

        Ok(Self::new(container, key, ObjectKind::Unknown))
    }

    /// Container name
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Blob name inside the container
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Kind learned from the store
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Whether the container is still the `.` placeholder
    pub fn has_placeholder_container(&self) -> bool {
        self.container == store::CURRENT_CONTAINER
    }

    /// Copy of this reference in another container
    pub fn with_container(&self, container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            key: self.key.clone(),
            kind: self.kind,
        }
    }

    /// Copy of this reference with a different kind
    pub fn with_kind(&self, kind: ObjectKind) -> Self {
        Self {
            container: self.container.clone(),
            key: self.key.clone(),
            kind,
        }
    }

    /// Reference to a child of this directory
    pub fn child(&self, name: &str, kind: ObjectKind) -> Self {
        let key = if self.key.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.key, name)
        };
        Self::new(self.container.clone(), &key, kind)
    }

    /// Canonical `az://` URI
    pub fn uri(&self) -> String {
        format!("{}://{}/{}", store::URI_SCHEME, self.container, self.key)
    }

    /// Last path segment of the key
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }

    /// Extension of the file name including the leading dot, or `""`
    ///
    /// Dot-files such as `.gitkeep` have no suffix.
    pub fn suffix(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(idx) if idx > 0 && idx < name.len() - 1 => &name[idx..],
            _ => "",
        }
    }

    /// Local cache destination: `<dest_dir>/<container>/<key>`
    ///
    /// Keys that would escape `dest_dir` are rejected.
    pub fn cache_path(&self, dest_dir: &Path) -> FetchResult<PathBuf> {
        let invalid = || FetchError::InvalidPath { key: self.uri() };

        if self.key.is_empty() || self.has_placeholder_container() {
            return Err(invalid());
        }

        let mut path = dest_dir.to_path_buf();
        for segment in std::iter::once(self.container.as_str()).chain(self.key.split('/')) {
            let mut components = Path::new(segment).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(part)), None) => path.push(part),
                _ => return Err(invalid()),
            }
        }

        Ok(path)
    }
}

fn normalize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

impl PartialEq for RemoteObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.container == other.container && self.key == other.key
    }
}

impl Eq for RemoteObjectRef {}

impl Hash for RemoteObjectRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.container.hash(state);
        self.key.hash(state);
    }
}

impl PartialOrd for RemoteObjectRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RemoteObjectRef {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.container, &self.key).cmp(&(&other.container, &other.key))
    }
}

impl fmt::Display for RemoteObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

/// How a successful object ended up in the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchSource {
    /// Downloaded during this run
    Downloaded,
    /// Already present at its cache path; nothing was fetched
    Cached,
}

/// Result of processing exactly one object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchOutcome {
    /// Object is present in the local cache
    Success {
        object: RemoteObjectRef,
        path: PathBuf,
        source: FetchSource,
    },
    /// Object could not be fetched
    Failure {
        object: RemoteObjectRef,
        message: String,
    },
}

impl FetchOutcome {
    /// Outcome for an object fetched during this run
    pub fn downloaded(object: RemoteObjectRef, path: PathBuf) -> Self {
        Self::Success {
            object,
            path,
            source: FetchSource::Downloaded,
        }
    }

    /// Outcome for an object that was already cached
    pub fn cached(object: RemoteObjectRef, path: PathBuf) -> Self {
        Self::Success {
            object,
            path,
            source: FetchSource::Cached,
        }
    }

    /// Outcome for a failed object
    pub fn failure(object: RemoteObjectRef, message: impl Into<String>) -> Self {
        Self::Failure {
            object,
            message: message.into(),
        }
    }

    /// The object this outcome belongs to
    pub fn object(&self) -> &RemoteObjectRef {
        match self {
            Self::Success { object, .. } | Self::Failure { object, .. } => object,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    /// Whether the skip rule satisfied this object
    pub fn is_cached(&self) -> bool {
        matches!(
            self,
            Self::Success {
                source: FetchSource::Cached,
                ..
            }
        )
    }

    /// Failure message, if any
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Failure { message, .. } => Some(message),
            Self::Success { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uri() {
        let object = RemoteObjectRef::parse("az://container/train/chips/a.tif").unwrap();
        assert_eq!(object.container(), "container");
        assert_eq!(object.key(), "train/chips/a.tif");
        assert_eq!(object.kind(), ObjectKind::Unknown);
        assert_eq!(object.uri(), "az://container/train/chips/a.tif");
        assert_eq!(object.file_name(), "a.tif");
    }

    #[test]
    fn test_parse_placeholder_root() {
        let root = RemoteObjectRef::parse("az://.").unwrap();
        assert!(root.has_placeholder_container());
        assert_eq!(root.key(), "");

        let nested = RemoteObjectRef::parse("az://./train_features/").unwrap();
        assert_eq!(nested.key(), "train_features");
        assert_eq!(nested.with_container("data").uri(), "az://data/train_features");
    }

    #[test]
    fn test_parse_rejects_bad_uris() {
        assert!(RemoteObjectRef::parse("s3://bucket/key").is_err());
        assert!(RemoteObjectRef::parse("az:///key").is_err());
        assert!(RemoteObjectRef::parse("train/a.tif").is_err());
    }

    #[test]
    fn test_suffix() {
        let tif = RemoteObjectRef::new("c", "a/B01.TIF", ObjectKind::Leaf);
        assert_eq!(tif.suffix(), ".TIF");

        let geojson = RemoteObjectRef::new("c", "labels/x.tar.geojson", ObjectKind::Leaf);
        assert_eq!(geojson.suffix(), ".geojson");

        assert_eq!(RemoteObjectRef::new("c", "a/.keep", ObjectKind::Leaf).suffix(), "");
        assert_eq!(RemoteObjectRef::new("c", "a/README", ObjectKind::Leaf).suffix(), "");
        assert_eq!(RemoteObjectRef::new("c", "a/trailing.", ObjectKind::Leaf).suffix(), "");
    }

    #[test]
    fn test_equality_ignores_kind() {
        let leaf = RemoteObjectRef::new("c", "a/b.tif", ObjectKind::Leaf);
        let unknown = RemoteObjectRef::new("c", "/a//b.tif", ObjectKind::Unknown);
        assert_eq!(leaf, unknown);

        let other = RemoteObjectRef::new("c", "a/c.tif", ObjectKind::Leaf);
        assert!(leaf < other);
    }

    #[test]
    fn test_cache_path_mirrors_identity() {
        let object = RemoteObjectRef::new("data", "train/a.tif", ObjectKind::Leaf);
        let path = object.cache_path(Path::new("/tmp/cache")).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/cache/data/train/a.tif"));
    }

    #[test]
    fn test_cache_path_rejects_traversal() {
        let dest = Path::new("/tmp/cache");
        let escaping = RemoteObjectRef::new("data", "../../etc/passwd", ObjectKind::Leaf);
        assert!(matches!(
            escaping.cache_path(dest),
            Err(FetchError::InvalidPath { .. })
        ));

        let root = RemoteObjectRef::new("data", "", ObjectKind::Directory);
        assert!(root.cache_path(dest).is_err());

        let unresolved = RemoteObjectRef::new(".", "a.tif", ObjectKind::Unknown);
        assert!(unresolved.cache_path(dest).is_err());
    }

    #[test]
    fn test_outcome_accessors() {
        let object = RemoteObjectRef::new("c", "a.tif", ObjectKind::Leaf);
        let cached = FetchOutcome::cached(object.clone(), PathBuf::from("x"));
        assert!(cached.is_success());
        assert!(cached.is_cached());
        assert_eq!(cached.object(), &object);

        let failed = FetchOutcome::failure(object, "boom");
        assert!(failed.is_failure());
        assert_eq!(failed.message(), Some("boom"));
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let object = RemoteObjectRef::new("c", "a.tif", ObjectKind::Leaf);
        let json = serde_json::to_value(FetchOutcome::failure(object, "boom")).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["object"]["key"], "a.tif");
        assert_eq!(json["message"], "boom");
    }
}
