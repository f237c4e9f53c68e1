//! Domain entity definitions.

mod image;

pub use image::{
    CACHE_FILE_PREFIX, CACHE_FILE_SUFFIX, CacheKey, CacheTier, CachedImage, ImageRef,
    is_older_than,
};
