//! Image cache infrastructure.
//!
//! This module provides:
//! - A bounded in-memory index with FIFO eviction
//! - A local file store with atomic downloads
//! - An HTTP fetcher
//! - The cache orchestrator tying the tiers together

pub mod file_store;
pub mod http_fetcher;
pub mod image_cache;
pub mod memory_cache;

pub use file_store::LocalFileStore;
pub use http_fetcher::HttpFetcher;
pub use image_cache::{
    CacheStats, DEFAULT_MAX_AGE_SECS, ImageCache, ImageCacheConfig, ImageResolution, SweepReport,
    default_cache_dir,
};
pub use memory_cache::{DEFAULT_MAX_ENTRIES, MemoryIndex};
