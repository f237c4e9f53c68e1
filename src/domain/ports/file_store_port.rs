//! Persistent file store port definition.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::CacheResult;

/// Metadata reported for a path in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileInfo {
    /// Whether anything exists at the path.
    pub exists: bool,
    /// Last modification time, when known.
    pub modified: Option<DateTime<Utc>>,
    /// Size in bytes, when known.
    pub size: Option<u64>,
}

impl FileInfo {
    /// Info for a path with nothing behind it.
    #[must_use]
    pub const fn missing() -> Self {
        Self {
            exists: false,
            modified: None,
            size: None,
        }
    }

    /// Info for an existing file.
    #[must_use]
    pub const fn file(modified: DateTime<Utc>, size: u64) -> Self {
        Self {
            exists: true,
            modified: Some(modified),
            size: Some(size),
        }
    }
}

/// Result of a download-to-file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// HTTP status code of the fetch.
    pub status: u16,
}

impl DownloadOutcome {
    /// Returns true for a 2xx status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Port for durable key to bytes storage with directory semantics.
/// Implementations must be thread-safe.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileStorePort: Send + Sync {
    /// Reports existence, modification time and size of a path.
    async fn exists(&self, path: &Path) -> CacheResult<FileInfo>;

    /// Creates a directory.
    async fn make_directory(&self, path: &Path, recursive: bool) -> CacheResult<()>;

    /// Downloads `url` into `destination`. A non-success status must leave
    /// nothing at `destination`.
    async fn download(&self, url: &str, destination: &Path) -> CacheResult<DownloadOutcome>;

    /// Deletes a file, or a directory together with its contents.
    /// Deleting a missing path succeeds.
    async fn delete(&self, path: &Path) -> CacheResult<()>;

    /// Lists the entry names inside a directory.
    async fn list_directory(&self, path: &Path) -> CacheResult<Vec<String>>;
}
