//! Local filesystem store for cached image files.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace, warn};

use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::ports::{DownloadOutcome, FileInfo, FileStorePort, NetworkFetcherPort};

use super::http_fetcher::HttpFetcher;

/// `FileStorePort` over the local filesystem. Downloads go through a
/// `NetworkFetcherPort` and land in place with a rename, so a failed
/// transfer never leaves a file at the destination.
pub struct LocalFileStore {
    fetcher: Arc<dyn NetworkFetcherPort>,
}

impl LocalFileStore {
    /// Creates a store that downloads through `fetcher`.
    #[must_use]
    pub fn new(fetcher: Arc<dyn NetworkFetcherPort>) -> Self {
        Self { fetcher }
    }

    /// Creates a store backed by an [`HttpFetcher`].
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn with_http(timeout: Option<Duration>) -> CacheResult<Self> {
        Ok(Self::new(Arc::new(HttpFetcher::new(timeout)?)))
    }

    async fn write_atomically(destination: &Path, bytes: &[u8]) -> CacheResult<()> {
        let temp_path = temp_path_for(destination);

        let result = async {
            let mut file = fs::File::create(&temp_path)
                .await
                .map_err(|e| CacheError::io("Failed to create cache file", &e))?;
            file.write_all(bytes)
                .await
                .map_err(|e| CacheError::io("Failed to write cache file", &e))?;
            file.flush()
                .await
                .map_err(|e| CacheError::io("Failed to flush cache file", &e))?;
            drop(file);
            fs::rename(&temp_path, destination)
                .await
                .map_err(|e| CacheError::io("Failed to move cache file into place", &e))
        }
        .await;

        if result.is_err()
            && let Err(e) = fs::remove_file(&temp_path).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = %temp_path.display(), error = %e, "Failed to remove partial download");
        }
        result
    }
}

impl std::fmt::Debug for LocalFileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalFileStore").finish_non_exhaustive()
    }
}

/// Hidden sibling path a download is staged at before the rename.
fn temp_path_for(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map_or_else(|| "download".into(), |n| n.to_string_lossy());
    destination.with_file_name(format!(".{name}.{}.part", uuid::Uuid::new_v4().simple()))
}

/// Logs when the bytes behind a `.jpg` key are something else.
fn inspect_format(url: &str, declared: Option<&str>, bytes: &[u8]) {
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Jpeg) => {}
        Ok(format) => debug!(
            url = %url,
            format = ?format,
            content_type = declared.unwrap_or("unknown"),
            "Cached image is not JPEG"
        ),
        Err(_) => warn!(
            url = %url,
            content_type = declared.unwrap_or("unknown"),
            "Downloaded bytes are not a recognised image format"
        ),
    }
}

#[async_trait]
impl FileStorePort for LocalFileStore {
    async fn exists(&self, path: &Path) -> CacheResult<FileInfo> {
        match fs::metadata(path).await {
            Ok(meta) => Ok(FileInfo {
                exists: true,
                modified: meta.modified().ok().map(DateTime::<Utc>::from),
                size: meta.is_file().then(|| meta.len()),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileInfo::missing()),
            Err(e) => Err(CacheError::io(
                format_args!("Failed to stat {}", path.display()),
                &e,
            )),
        }
    }

    async fn make_directory(&self, path: &Path, recursive: bool) -> CacheResult<()> {
        let result = if recursive {
            fs::create_dir_all(path).await
        } else {
            fs::create_dir(path).await
        };
        result.map_err(|e| CacheError::io(format_args!("Failed to create {}", path.display()), &e))
    }

    async fn download(&self, url: &str, destination: &Path) -> CacheResult<DownloadOutcome> {
        let fetched = self.fetcher.fetch(url).await?;
        if !fetched.is_success() {
            return Ok(DownloadOutcome {
                status: fetched.status,
            });
        }

        inspect_format(url, fetched.content_type.as_deref(), &fetched.body);
        Self::write_atomically(destination, &fetched.body).await?;
        debug!(
            url = %url,
            path = %destination.display(),
            size = fetched.body.len(),
            "Stored image in file store"
        );

        Ok(DownloadOutcome {
            status: fetched.status,
        })
    }

    async fn delete(&self, path: &Path) -> CacheResult<()> {
        let meta = match fs::symlink_metadata(path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(CacheError::io(
                    format_args!("Failed to stat {}", path.display()),
                    &e,
                ));
            }
        };

        let result = if meta.is_dir() {
            fs::remove_dir_all(path).await
        } else {
            fs::remove_file(path).await
        };
        match result {
            Ok(()) => {
                trace!(path = %path.display(), "Deleted from file store");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::io(
                format_args!("Failed to delete {}", path.display()),
                &e,
            )),
        }
    }

    async fn list_directory(&self, path: &Path) -> CacheResult<Vec<String>> {
        let mut entries = fs::read_dir(path)
            .await
            .map_err(|e| CacheError::io(format_args!("Failed to read {}", path.display()), &e))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CacheError::io("Failed to read entry", &e))?
        {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }
}
