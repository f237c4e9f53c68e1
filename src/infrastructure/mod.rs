//! Infrastructure layer with storage, network and configuration adapters.

/// Application configuration.
pub mod config;
/// Image caching (memory index, file store, network fetch).
pub mod image;

pub use config::{AppConfig, CliArgs, Command, LogLevel, StorageManager};
pub use image::{
    CacheStats, HttpFetcher, ImageCache, ImageCacheConfig, ImageResolution, LocalFileStore,
    MemoryIndex, SweepReport,
};
