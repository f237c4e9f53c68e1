//! Domain layer with cache entities, errors, and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use entities::{CacheKey, CacheTier, CachedImage, ImageRef};
pub use errors::{CacheError, CacheResult};
pub use ports::{FileStorePort, NetworkFetcherPort};
