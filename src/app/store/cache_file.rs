//! Atomic writes into the local cache
//!
//! Downloads are streamed into a uniquely named temporary file next to the
//! destination and renamed into place on commit. A partially written file
//! never appears at the destination path, so the cache skip rule can trust
//! that anything present is complete.

use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::constants::files;
use crate::errors::{FetchError, FetchResult};

/// In-progress cache file; dropped without `commit` it is removed
#[derive(Debug)]
pub struct CacheFile {
    file: File,
    temp_path: TempPath,
    destination: PathBuf,
    bytes_written: u64,
}

impl CacheFile {
    /// Start writing a file that will end up at `destination`
    pub async fn create(destination: &Path) -> FetchResult<Self> {
        let parent = destination
            .parent()
            .ok_or_else(|| FetchError::InvalidPath {
                key: destination.display().to_string(),
            })?;
        tokio::fs::create_dir_all(parent).await?;

        let named = tempfile::Builder::new()
            .prefix(".")
            .suffix(files::TEMP_FILE_SUFFIX)
            .tempfile_in(parent)?;
        let (file, temp_path) = named.into_parts();

        Ok(Self {
            file: File::from_std(file),
            temp_path,
            destination: destination.to_path_buf(),
            bytes_written: 0,
        })
    }

    /// Append a chunk of content
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> FetchResult<()> {
        self.file.write_all(chunk).await?;
        self.bytes_written += chunk.len() as u64;
        Ok(())
    }

    /// Bytes written so far
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Flush and move the file into place
    pub async fn commit(self) -> FetchResult<PathBuf> {
        let Self {
            mut file,
            temp_path,
            destination,
            ..
        } = self;

        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        let temp_display = temp_path.to_path_buf();
        temp_path
            .persist(&destination)
            .map_err(|_| FetchError::AtomicOperationFailed {
                temp_path: temp_display,
                final_path: destination.clone(),
            })?;

        Ok(destination)
    }

    /// Write a complete buffer and commit it
    pub async fn write_all(destination: &Path, content: &[u8]) -> FetchResult<PathBuf> {
        let mut file = Self::create(destination).await?;
        file.write_chunk(content).await?;
        file.commit().await
    }
}
