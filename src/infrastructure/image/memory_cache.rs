//! In-memory index of cached image paths.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::domain::entities::CachedImage;

/// Default maximum number of URLs kept in memory.
pub const DEFAULT_MAX_ENTRIES: usize = 50;

/// Bounded URL to path index with first-in first-out eviction.
///
/// Entries are only ever read with `peek`, so the recency order of the
/// underlying `LruCache` is insertion order and `push` evicts the oldest
/// insertion.
pub struct MemoryIndex {
    entries: Mutex<LruCache<String, CachedImage>>,
    max_age: chrono::Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryIndex {
    /// Creates an index holding at most `capacity` URLs, each valid for `max_age`.
    #[must_use]
    pub fn new(capacity: usize, max_age: chrono::Duration) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(cap)),
            max_age,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the cached path for a URL if its entry is still fresh.
    /// An expired entry is dropped.
    pub fn lookup(&self, url: &str) -> Option<PathBuf> {
        self.lookup_at(url, Utc::now())
    }

    /// [`Self::lookup`] against an explicit clock.
    pub fn lookup_at(&self, url: &str, now: DateTime<Utc>) -> Option<PathBuf> {
        let mut entries = self.entries.lock();
        let state = entries
            .peek(url)
            .map(|entry| (entry.is_expired(self.max_age, now), entry.path.clone()));
        let found = match state {
            Some((true, _)) => {
                entries.pop(url);
                debug!(url = %url, "Dropped expired memory index entry");
                None
            }
            Some((false, path)) => Some(path),
            None => None,
        };
        drop(entries);

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(url = %url, "Memory index hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(url = %url, "Memory index miss");
        }
        found
    }

    /// Records a path for a URL, stamped with the current time.
    pub fn insert(&self, url: &str, path: PathBuf) {
        self.insert_entry(url, CachedImage::new(path));
    }

    /// Records an entry. A URL already present is refreshed in place and
    /// keeps its eviction position; a new URL on a full index evicts the
    /// oldest insertion.
    pub fn insert_entry(&self, url: &str, entry: CachedImage) {
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.peek_mut(url) {
            *existing = entry;
            trace!(url = %url, "Refreshed memory index entry");
            return;
        }
        if let Some((evicted, _)) = entries.push(url.to_owned(), entry) {
            debug!(evicted = %evicted, "Memory index full, evicted oldest entry");
        }
    }

    /// Returns true if the URL has an entry, fresh or not.
    pub fn contains(&self, url: &str) -> bool {
        self.entries.lock().contains(url)
    }

    /// Number of entries, including ones not yet found expired.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
        debug!("Cleared memory index");
    }

    /// Number of fresh lookups.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of lookups that found nothing usable.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, chrono::Duration::days(7))
    }
}

impl std::fmt::Debug for MemoryIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryIndex")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(i: usize) -> String {
        format!("https://photos.example.com/{i}.jpg")
    }

    #[test]
    fn test_insert_and_lookup() {
        let index = MemoryIndex::default();
        index.insert("https://a", PathBuf::from("/cache/img_1.jpg"));

        assert_eq!(
            index.lookup("https://a"),
            Some(PathBuf::from("/cache/img_1.jpg"))
        );
        assert_eq!(index.lookup("https://b"), None);
        assert_eq!(index.hits(), 1);
        assert_eq!(index.misses(), 1);
    }

    #[test]
    fn test_fifo_eviction() {
        let index = MemoryIndex::default();
        for i in 0..=DEFAULT_MAX_ENTRIES {
            index.insert(&url(i), PathBuf::from(format!("/cache/{i}")));
        }

        assert_eq!(index.len(), DEFAULT_MAX_ENTRIES);
        assert!(!index.contains(&url(0)));
        for i in 1..=DEFAULT_MAX_ENTRIES {
            assert!(index.contains(&url(i)), "entry {i} missing");
        }
    }

    #[test]
    fn test_lookup_does_not_change_eviction_order() {
        let index = MemoryIndex::new(2, chrono::Duration::days(7));
        index.insert(&url(1), PathBuf::from("/1"));
        index.insert(&url(2), PathBuf::from("/2"));

        // A least-recently-used cache would now evict entry 2.
        assert!(index.lookup(&url(1)).is_some());
        index.insert(&url(3), PathBuf::from("/3"));

        assert!(!index.contains(&url(1)));
        assert!(index.contains(&url(2)));
        assert!(index.contains(&url(3)));
    }

    #[test]
    fn test_reinsert_keeps_position() {
        let index = MemoryIndex::new(2, chrono::Duration::days(7));
        index.insert(&url(1), PathBuf::from("/1"));
        index.insert(&url(2), PathBuf::from("/2"));
        index.insert(&url(1), PathBuf::from("/1b"));
        index.insert(&url(3), PathBuf::from("/3"));

        assert!(!index.contains(&url(1)));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_expired_entry_is_removed_on_lookup() {
        let max_age = chrono::Duration::days(7);
        let index = MemoryIndex::new(10, max_age);
        let stale = Utc::now() - max_age - chrono::Duration::milliseconds(1);
        index.insert_entry("https://old", CachedImage::at(PathBuf::from("/old"), stale));

        assert!(index.contains("https://old"));
        assert_eq!(index.lookup("https://old"), None);
        assert!(!index.contains("https://old"));
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let index = MemoryIndex::new(0, chrono::Duration::days(1));
        index.insert("https://a", PathBuf::from("/a"));
        index.insert("https://b", PathBuf::from("/b"));
        assert_eq!(index.capacity(), 1);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_clear() {
        let index = MemoryIndex::default();
        index.insert("https://a", PathBuf::from("/a"));
        index.clear();
        assert!(index.is_empty());
    }
}
