//! Azure Blob Storage client authorised by a SAS URL
//!
//! Directories are virtual: listing a directory is a hierarchical "List
//! Blobs" call with the directory key as prefix and `/` as delimiter.
//! Downloads are plain "Get Blob" requests streamed into the cache.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;
use url::Url;

use super::{resolve_identifier, CacheFile, ClientConfig, HttpHandler, ListingPage, ObjectStore};
use crate::app::models::{ObjectKind, RemoteObjectRef};
use crate::auth::Credential;
use crate::constants::store;
use crate::errors::{EnumerationError, EnumerationResult, FetchError, FetchResult};

/// Object store client for one storage account
#[derive(Debug)]
pub struct AzureBlobStore {
    credential: Credential,
    http: HttpHandler,
    list_timeout: Duration,
}

impl AzureBlobStore {
    /// Create a client for the account the credential points at
    pub fn new(credential: Credential, config: &ClientConfig) -> EnumerationResult<Self> {
        let client = config.build_http_client()?;
        Ok(Self {
            credential,
            http: HttpHandler::new(client, config.rate_limit_rps),
            list_timeout: config.list_timeout,
        })
    }

    /// Credential this client signs requests with
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// URL of the container, optionally extended with path segments
    fn container_url<'a>(
        &self,
        container: &str,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> Option<Url> {
        let mut url = self.credential.account_url();
        {
            let mut path = url.path_segments_mut().ok()?;
            path.clear().push(container).extend(segments);
        }
        Some(url)
    }

    /// Append the SAS token to a request URL
    fn sign(&self, mut url: Url) -> Url {
        if let Some(token) = self.credential.token() {
            let query = match url.query() {
                Some(existing) if !existing.is_empty() => format!("{}&{}", existing, token),
                _ => token.to_string(),
            };
            url.set_query(Some(&query));
        }
        url
    }

    /// Signed URL for downloading one blob
    pub fn blob_url(&self, object: &RemoteObjectRef) -> Option<Url> {
        let url = self.container_url(object.container(), object.key().split('/'))?;
        Some(self.sign(url))
    }

    /// Signed URL for one page of a hierarchical listing
    pub fn list_url(&self, container: &str, prefix: &str, marker: Option<&str>) -> Option<Url> {
        let mut url = self.container_url(container, std::iter::empty())?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("restype", "container")
                .append_pair("comp", "list")
                .append_pair("delimiter", store::DELIMITER)
                .append_pair("maxresults", &store::LIST_PAGE_SIZE.to_string());
            if !prefix.is_empty() {
                query.append_pair("prefix", prefix);
            }
            if let Some(marker) = marker {
                query.append_pair("marker", marker);
            }
        }
        Some(self.sign(url))
    }

    async fn list_page(
        &self,
        directory: &RemoteObjectRef,
        prefix: &str,
        marker: Option<&str>,
    ) -> EnumerationResult<ListingPage> {
        let url = self
            .list_url(directory.container(), prefix, marker)
            .ok_or_else(|| EnumerationError::InvalidUri {
                uri: directory.uri(),
                reason: "cannot build a listing URL from the SAS endpoint".to_string(),
            })?;

        let response = self.http.get(&url, Some(self.list_timeout)).await?;
        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(EnumerationError::RootNotFound {
                    uri: directory.uri(),
                })
            }
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
                return Err(EnumerationError::PermissionDenied {
                    uri: directory.uri(),
                })
            }
            status => {
                return Err(EnumerationError::ServerError {
                    uri: directory.uri(),
                    status: status.as_u16(),
                })
            }
        }

        let body = response.text().await?;
        ListingPage::parse(&body)
    }
}

#[async_trait]
impl ObjectStore for AzureBlobStore {
    fn resolve(&self, uri: &str) -> EnumerationResult<RemoteObjectRef> {
        resolve_identifier(uri, self.credential.container())
    }

    async fn list(&self, directory: &RemoteObjectRef) -> EnumerationResult<Vec<RemoteObjectRef>> {
        let prefix = if directory.key().is_empty() {
            String::new()
        } else {
            format!("{}{}", directory.key(), store::DELIMITER)
        };

        let mut children = Vec::new();
        let mut marker: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self.list_page(directory, &prefix, marker.as_deref()).await?;
            pages += 1;

            children.extend(
                page.blobs
                    .iter()
                    .map(|name| RemoteObjectRef::new(directory.container(), name, ObjectKind::Leaf)),
            );
            children.extend(page.prefixes.iter().map(|name| {
                RemoteObjectRef::new(directory.container(), name, ObjectKind::Directory)
            }));

            match page.next_marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        debug!(
            "Listed {} children of {} in {} page(s)",
            children.len(),
            directory,
            pages
        );

        // A prefix with nothing under it does not exist
        if children.is_empty() && !directory.key().is_empty() {
            return Err(EnumerationError::RootNotFound {
                uri: directory.uri(),
            });
        }

        Ok(children)
    }

    async fn fetch(&self, object: &RemoteObjectRef, dest_dir: &Path) -> FetchResult<PathBuf> {
        let destination = self.cache_path(object, dest_dir)?;
        let url = self
            .blob_url(object)
            .ok_or_else(|| FetchError::InvalidPath { key: object.uri() })?;

        let mut response = self.http.get(&url, None).await?;
        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => return Err(FetchError::NotFound { uri: object.uri() }),
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
                return Err(FetchError::PermissionDenied { uri: object.uri() })
            }
            status => {
                return Err(FetchError::ServerError {
                    status: status.as_u16(),
                })
            }
        }

        let mut file = CacheFile::create(&destination).await?;
        while let Some(chunk) = response.chunk().await? {
            file.write_chunk(&chunk).await?;
        }

        debug!("Fetched {} ({} bytes)", object, file.bytes_written());
        file.commit().await
    }
}
