//! Image cache orchestrator.
//!
//! Implements a three-tier lookup: Memory -> Disk -> Network

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared, WeakShared};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::domain::entities::{CacheKey, CacheTier, ImageRef, is_older_than};
use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::ports::FileStorePort;

use super::memory_cache::{DEFAULT_MAX_ENTRIES, MemoryIndex};

/// Default entry lifetime (7 days).
pub const DEFAULT_MAX_AGE_SECS: u64 = 7 * 24 * 60 * 60;

/// Configuration for the image cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageCacheConfig {
    /// Cache directory. Defaults to the platform cache directory.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Maximum URLs kept in the memory index.
    #[serde(default = "default_max_memory_entries")]
    pub max_memory_entries: usize,

    /// Entry lifetime in seconds, applied to both tiers.
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,

    /// Network request timeout in seconds. Unset means no timeout.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Let concurrent requests for one URL share a single download.
    #[serde(default = "default_true")]
    pub coalesce_downloads: bool,

    /// Sweep expired files when the cache starts.
    #[serde(default = "default_true")]
    pub sweep_on_start: bool,
}

const fn default_max_memory_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

const fn default_max_age_secs() -> u64 {
    DEFAULT_MAX_AGE_SECS
}

const fn default_true() -> bool {
    true
}

impl Default for ImageCacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            max_memory_entries: DEFAULT_MAX_ENTRIES,
            max_age_secs: DEFAULT_MAX_AGE_SECS,
            request_timeout_secs: None,
            coalesce_downloads: true,
            sweep_on_start: true,
        }
    }
}

impl ImageCacheConfig {
    /// Entry lifetime as a chrono duration.
    #[must_use]
    pub fn max_age(&self) -> chrono::Duration {
        i64::try_from(self.max_age_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    /// Network request timeout, if any.
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Returns the configured directory or the platform default.
    #[must_use]
    pub fn effective_cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(default_cache_dir)
    }
}

/// Returns the default cache directory path.
#[must_use]
pub fn default_cache_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "linuxmobile", "eventpix").map_or_else(
        || {
            std::env::temp_dir()
                .join("eventpix")
                .join("cache")
                .join("images")
        },
        |dirs| dirs.cache_dir().join("images"),
    )
}

/// Counters describing cache traffic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups answered by the memory index.
    pub memory_hits: u64,
    /// Lookups the memory index could not answer.
    pub memory_misses: u64,
    /// Lookups answered by the file store.
    pub disk_hits: u64,
    /// Downloads started.
    pub downloads: u64,
    /// Downloads that produced no entry.
    pub failed_downloads: u64,
    /// Current memory index size.
    pub memory_entries: usize,
    /// Memory index capacity.
    pub memory_capacity: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache: {}/{} in memory, {} memory hits, {} disk hits, {} misses, {} downloads ({} failed)",
            self.memory_entries,
            self.memory_capacity,
            self.memory_hits,
            self.disk_hits,
            self.memory_misses.saturating_sub(self.disk_hits),
            self.downloads,
            self.failed_downloads
        )
    }
}

/// Outcome of an expired-file sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Entries found in the cache directory.
    pub scanned: usize,
    /// Entries deleted for being expired.
    pub removed: usize,
    /// Entries that could not be checked or deleted.
    pub failed: usize,
}

/// An image reference plus the background caching it started, if any.
#[derive(Debug)]
pub struct ImageResolution {
    /// What the caller should display right now.
    pub image: ImageRef,
    /// Background caching started for an uncached URL. Dropping it detaches
    /// the task.
    pub pending: Option<JoinHandle<Option<PathBuf>>>,
}

type DownloadFuture = BoxFuture<'static, Option<PathBuf>>;

/// Registry entry for a download other callers can join. Only callers keep
/// the download alive; the registry holds a weak handle.
struct InFlight {
    id: u64,
    download: WeakShared<DownloadFuture>,
}

/// Unregisters a download when its future completes or is dropped unfinished.
struct InFlightGuard {
    inner: Weak<CacheInner>,
    key: CacheKey,
    id: u64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let mut in_flight = inner.in_flight.lock();
        if in_flight
            .get(&self.key)
            .is_some_and(|entry| entry.id == self.id)
        {
            in_flight.remove(&self.key);
        }
    }
}

#[derive(Default)]
struct Counters {
    disk_hits: AtomicU64,
    downloads: AtomicU64,
    failed_downloads: AtomicU64,
}

struct CacheInner {
    store: Arc<dyn FileStorePort>,
    cache_dir: PathBuf,
    memory: MemoryIndex,
    max_age: chrono::Duration,
    coalesce: bool,
    in_flight: Mutex<HashMap<CacheKey, InFlight>>,
    next_download_id: AtomicU64,
    counters: Counters,
}

/// Per-process image cache over a memory index, a file store and the
/// network. Cloning shares the same cache.
#[derive(Clone)]
pub struct ImageCache {
    inner: Arc<CacheInner>,
}

impl std::fmt::Debug for ImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageCache")
            .field("cache_dir", &self.inner.cache_dir)
            .field("memory", &self.inner.memory)
            .field("coalesce", &self.inner.coalesce)
            .finish_non_exhaustive()
    }
}

impl ImageCache {
    /// Creates a cache and makes sure its directory exists. A directory
    /// that cannot be created is logged; later operations degrade to misses.
    pub async fn new(config: &ImageCacheConfig, store: Arc<dyn FileStorePort>) -> Self {
        let max_age = config.max_age();
        let cache = Self {
            inner: Arc::new(CacheInner {
                store,
                cache_dir: config.effective_cache_dir(),
                memory: MemoryIndex::new(config.max_memory_entries, max_age),
                max_age,
                coalesce: config.coalesce_downloads,
                in_flight: Mutex::new(HashMap::new()),
                next_download_id: AtomicU64::new(0),
                counters: Counters::default(),
            }),
        };
        cache.ensure_directory().await;
        cache
    }

    /// Creates a cache and, if configured, launches the expired-file sweep
    /// in the background.
    pub async fn start(config: &ImageCacheConfig, store: Arc<dyn FileStorePort>) -> Self {
        let cache = Self::new(config, store).await;
        if config.sweep_on_start {
            drop(cache.spawn_maintenance_sweep());
        }
        cache
    }

    /// Creates the cache directory if it is missing. Returns false on failure.
    pub async fn ensure_directory(&self) -> bool {
        match self
            .inner
            .store
            .make_directory(&self.inner.cache_dir, true)
            .await
        {
            Ok(()) => {
                debug!(path = %self.inner.cache_dir.display(), "Cache directory ready");
                true
            }
            Err(e) => {
                error!(
                    path = %self.inner.cache_dir.display(),
                    error = %e,
                    "Failed to create cache directory"
                );
                false
            }
        }
    }

    /// Runs [`Self::clear_expired_cache`] on a background task, logging failure.
    pub fn spawn_maintenance_sweep(&self) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            if let Err(e) = cache.clear_expired_cache().await {
                warn!(error = %e, "Expired cache sweep failed");
            }
        })
    }

    /// Returns the cache directory.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.inner.cache_dir
    }

    /// Returns where the file for a URL lives, cached or not.
    #[must_use]
    pub fn path_for_url(&self, url: &str) -> Option<PathBuf> {
        CacheKey::from_url(url).map(|key| self.path_for(&key))
    }

    fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.inner.cache_dir.join(key.as_str())
    }

    /// Returns true if a fresh copy of the URL is cached. Expired entries
    /// found on the way are removed.
    pub async fn is_cached(&self, url: &str) -> bool {
        self.lookup(url, false).await.is_some()
    }

    /// Returns the local path of a fresh cached copy. A hit in the file store
    /// is recorded in the memory index.
    pub async fn cached_image_path(&self, url: &str) -> Option<PathBuf> {
        self.locate(url).await.map(|(path, _)| path)
    }

    /// [`Self::cached_image_path`], also reporting which tier answered.
    pub async fn locate(&self, url: &str) -> Option<(PathBuf, CacheTier)> {
        self.lookup(url, true).await
    }

    async fn lookup(&self, url: &str, remember: bool) -> Option<(PathBuf, CacheTier)> {
        if url.is_empty() {
            return None;
        }
        if let Some(path) = self.inner.memory.lookup(url) {
            return Some((path, CacheTier::Memory));
        }

        let key = CacheKey::from_url(url)?;
        let path = self.path_for(&key);
        match self.check_disk(&path).await {
            Ok(true) => {
                self.inner.counters.disk_hits.fetch_add(1, Ordering::Relaxed);
                trace!(url = %url, key = %key, "Disk cache hit");
                if remember {
                    self.inner.memory.insert(url, path.clone());
                }
                Some((path, CacheTier::Disk))
            }
            Ok(false) => {
                trace!(url = %url, key = %key, "Disk cache miss");
                None
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Cache lookup failed, treating as miss");
                None
            }
        }
    }

    /// Checks a cached file's age, deleting it when expired. A file without
    /// a modification time cannot be shown fresh and counts as expired.
    async fn check_disk(&self, path: &Path) -> CacheResult<bool> {
        let info = self.inner.store.exists(path).await?;
        if !info.exists {
            return Ok(false);
        }
        if info
            .modified
            .is_some_and(|modified| !is_older_than(modified, self.inner.max_age, Utc::now()))
        {
            return Ok(true);
        }

        debug!(path = %path.display(), "Cached file expired");
        if let Err(e) = self.inner.store.delete(path).await {
            warn!(path = %path.display(), error = %e, "Failed to delete expired file");
        }
        Ok(false)
    }

    /// Makes sure the URL is cached and returns its local path. Returns
    /// `None` if the download fails; nothing is retried or left behind.
    pub async fn cache_image(&self, url: &str) -> Option<PathBuf> {
        self.acquire(url).await.map(|(path, _)| path)
    }

    /// [`Self::cache_image`], also reporting whether the copy was already
    /// cached or had to be downloaded.
    pub async fn acquire(&self, url: &str) -> Option<(PathBuf, CacheTier)> {
        if let Some(found) = self.locate(url).await {
            return Some(found);
        }
        let key = CacheKey::from_url(url)?;

        let path = if self.inner.coalesce {
            self.join_download(url, key).await
        } else {
            self.download(url, &key).await
        }?;

        self.inner.memory.insert(url, path.clone());
        Some((path, CacheTier::Network))
    }

    fn join_download(&self, url: &str, key: CacheKey) -> Shared<DownloadFuture> {
        let mut in_flight = self.inner.in_flight.lock();
        if let Some(existing) = in_flight.get(&key).and_then(|entry| entry.download.upgrade()) {
            trace!(url = %url, key = %key, "Joining in-flight download");
            return existing;
        }

        let id = self.inner.next_download_id.fetch_add(1, Ordering::Relaxed);
        let weak = Arc::downgrade(&self.inner);
        let guard = InFlightGuard {
            inner: weak.clone(),
            key: key.clone(),
            id,
        };
        let url = url.to_owned();
        let download = async move {
            let Some(inner) = weak.upgrade() else {
                return None;
            };
            let cache = ImageCache { inner };
            let result = cache.download(&url, &guard.key).await;
            drop(guard);
            result
        }
        .boxed()
        .shared();

        if let Some(handle) = download.downgrade() {
            in_flight.insert(
                key,
                InFlight {
                    id,
                    download: handle,
                },
            );
        }
        download
    }

    async fn download(&self, url: &str, key: &CacheKey) -> Option<PathBuf> {
        let path = self.path_for(key);
        self.inner.counters.downloads.fetch_add(1, Ordering::Relaxed);
        debug!(url = %url, key = %key, "Downloading image into cache");

        let result = match self.inner.store.download(url, &path).await {
            Ok(outcome) if outcome.is_success() => Ok(path),
            Ok(outcome) => Err(CacheError::DownloadStatus {
                status: outcome.status,
            }),
            Err(e) => Err(e),
        };

        match result {
            Ok(path) => {
                debug!(url = %url, path = %path.display(), "Cached image");
                Some(path)
            }
            Err(e) => {
                self.inner
                    .counters
                    .failed_downloads
                    .fetch_add(1, Ordering::Relaxed);
                warn!(url = %url, error = %e, "Image download failed");
                None
            }
        }
    }

    /// Returns what to display for `url` without waiting on the network.
    ///
    /// An absent or empty URL yields `fallback`. A cached URL yields its local
    /// file. Anything else yields the remote URL while caching continues in
    /// the background.
    pub async fn image_source(&self, url: Option<&str>, fallback: ImageRef) -> ImageRef {
        self.resolve_image(url, fallback).await.image
    }

    /// [`Self::image_source`], also handing back the background caching task.
    pub async fn resolve_image(&self, url: Option<&str>, fallback: ImageRef) -> ImageResolution {
        let Some(url) = url.filter(|u| !u.is_empty()) else {
            return ImageResolution {
                image: fallback,
                pending: None,
            };
        };

        if let Some(path) = self.cached_image_path(url).await {
            return ImageResolution {
                image: ImageRef::Local(path),
                pending: None,
            };
        }

        ImageResolution {
            image: ImageRef::Remote(url.to_owned()),
            pending: Some(self.prefetch(url)),
        }
    }

    /// Starts caching a URL in the background.
    pub fn prefetch(&self, url: &str) -> JoinHandle<Option<PathBuf>> {
        let cache = self.clone();
        let url = url.to_owned();
        tokio::spawn(async move {
            let result = cache.cache_image(&url).await;
            if result.is_none() {
                debug!(url = %url, "Background caching left no entry");
            }
            result
        })
    }

    /// Starts caching several URLs in the background.
    pub fn prefetch_batch<I, S>(&self, urls: I) -> Vec<JoinHandle<Option<PathBuf>>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        urls.into_iter()
            .map(|url| self.prefetch(url.as_ref()))
            .collect()
    }

    /// Deletes every file in the cache directory older than the max age.
    /// The memory index is left alone; its own expiry check catches up.
    ///
    /// # Errors
    /// Returns error if the cache directory cannot be listed.
    pub async fn clear_expired_cache(&self) -> CacheResult<SweepReport> {
        let dir = &self.inner.cache_dir;
        let names = self.inner.store.list_directory(dir).await?;
        let now = Utc::now();
        let mut report = SweepReport {
            scanned: names.len(),
            ..SweepReport::default()
        };

        for name in names {
            let path = dir.join(&name);
            let info = match self.inner.store.exists(&path).await {
                Ok(info) => info,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to inspect cached file");
                    report.failed += 1;
                    continue;
                }
            };
            if !info.exists
                || info
                    .modified
                    .is_some_and(|modified| !is_older_than(modified, self.inner.max_age, now))
            {
                continue;
            }

            match self.inner.store.delete(&path).await {
                Ok(()) => {
                    debug!(path = %path.display(), "Removed expired cache file");
                    report.removed += 1;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to remove expired cache file");
                    report.failed += 1;
                }
            }
        }

        info!(
            scanned = report.scanned,
            removed = report.removed,
            failed = report.failed,
            "Expired cache sweep complete"
        );
        Ok(report)
    }

    /// Deletes the cache directory, empties the memory index and recreates
    /// an empty directory.
    ///
    /// # Errors
    /// Returns the first failure of deleting or recreating the directory.
    pub async fn clear_all_cache(&self) -> CacheResult<()> {
        let dir = &self.inner.cache_dir;
        let removed = self.inner.store.delete(dir).await;
        if let Err(e) = &removed {
            error!(path = %dir.display(), error = %e, "Failed to delete cache directory");
        }

        self.inner.memory.clear();

        let recreated = self.inner.store.make_directory(dir, true).await;
        if let Err(e) = &recreated {
            error!(path = %dir.display(), error = %e, "Failed to recreate cache directory");
        }

        removed?;
        recreated?;
        info!(path = %dir.display(), "Cleared image cache");
        Ok(())
    }

    /// Total bytes held in the cache directory. Unreadable entries count as
    /// zero; an unreadable directory counts as empty.
    pub async fn cache_size(&self) -> u64 {
        let dir = &self.inner.cache_dir;
        let names = match self.inner.store.list_directory(dir).await {
            Ok(names) => names,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "Failed to list cache directory");
                return 0;
            }
        };

        let mut total = 0u64;
        for name in names {
            if let Ok(info) = self.inner.store.exists(&dir.join(&name)).await {
                total += info.size.unwrap_or(0);
            }
        }
        total
    }

    /// Returns traffic counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let memory = &self.inner.memory;
        let counters = &self.inner.counters;
        CacheStats {
            memory_hits: memory.hits(),
            memory_misses: memory.misses(),
            disk_hits: counters.disk_hits.load(Ordering::Relaxed),
            downloads: counters.downloads.load(Ordering::Relaxed),
            failed_downloads: counters.failed_downloads.load(Ordering::Relaxed),
            memory_entries: memory.len(),
            memory_capacity: memory.capacity(),
        }
    }
}
