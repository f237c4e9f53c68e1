//! Domain types for cached images.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// Suffix given to every cached file, regardless of the bytes it holds.
pub const CACHE_FILE_SUFFIX: &str = ".jpg";

/// Prefix given to every cached file name.
pub const CACHE_FILE_PREFIX: &str = "img_";

/// Deterministic on-disk name for a cached image.
/// Derived from the source URL with a 32-bit rolling hash, so distinct URLs
/// may occasionally share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derives the key for a URL. Returns `None` for an empty URL.
    #[must_use]
    pub fn from_url(url: &str) -> Option<Self> {
        if url.is_empty() {
            return None;
        }
        let hash = url.encode_utf16().fold(0i32, |acc, unit| {
            acc.wrapping_shl(5)
                .wrapping_sub(acc)
                .wrapping_add(i32::from(unit))
        });
        Some(Self(format!(
            "{CACHE_FILE_PREFIX}{}{CACHE_FILE_SUFFIX}",
            hash.unsigned_abs()
        )))
    }

    /// Returns the file name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<Path> for CacheKey {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

/// A reference the caller can hand to an image view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// Remote location, loaded over the network by the view.
    Remote(String),
    /// Locally cached copy.
    Local(PathBuf),
    /// Asset bundled with the application.
    Asset(String),
}

impl ImageRef {
    /// Returns the reference as a URI-like string.
    #[must_use]
    pub fn uri(&self) -> String {
        match self {
            Self::Remote(url) => url.clone(),
            Self::Local(path) => path.display().to_string(),
            Self::Asset(name) => format!("asset://{name}"),
        }
    }

    /// Returns true if this points at a locally cached file.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.uri())
    }
}

/// Which tier satisfied a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    /// In-memory index.
    Memory,
    /// Persistent store.
    Disk,
    /// Downloaded from the network.
    Network,
}

impl std::fmt::Display for CacheTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Disk => write!(f, "disk"),
            Self::Network => write!(f, "network"),
        }
    }
}

/// Memory index entry for one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedImage {
    /// Location of the cached bytes.
    pub path: PathBuf,
    /// When the entry entered the index.
    pub cached_at: DateTime<Utc>,
}

impl CachedImage {
    /// Creates an entry stamped with the current time.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self::at(path, Utc::now())
    }

    /// Creates an entry with an explicit timestamp.
    #[must_use]
    pub const fn at(path: PathBuf, cached_at: DateTime<Utc>) -> Self {
        Self { path, cached_at }
    }

    /// Returns true if the entry is at least `max_age` old at `now`.
    #[must_use]
    pub fn is_expired(&self, max_age: chrono::Duration, now: DateTime<Utc>) -> bool {
        is_older_than(self.cached_at, max_age, now)
    }
}

/// Shared expiry predicate for both tiers: fresh while `now - stamp < max_age`.
#[must_use]
pub fn is_older_than(
    stamp: DateTime<Utc>,
    max_age: chrono::Duration,
    now: DateTime<Utc>,
) -> bool {
    now.signed_duration_since(stamp) >= max_age
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("a", "img_97.jpg" ; "single_char")]
    #[test_case("ab", "img_3105.jpg" ; "two_chars")]
    #[test_case("hello", "img_99162322.jpg" ; "word")]
    #[test_case("polygenelubricants", "img_2147483648.jpg" ; "hash_is_i32_min")]
    fn test_key_derivation(url: &str, expected: &str) {
        let key = CacheKey::from_url(url).unwrap();
        assert_eq!(key.as_str(), expected);
    }

    #[test]
    fn test_empty_url_has_no_key() {
        assert!(CacheKey::from_url("").is_none());
    }

    #[test]
    fn test_key_is_deterministic() {
        let url = "https://storage.example.com/events/42/photos/abc.png?token=x";
        assert_eq!(CacheKey::from_url(url), CacheKey::from_url(url));
    }

    #[test]
    fn test_key_hashes_utf16_units() {
        // U+1F600 is a surrogate pair: 0xD83D, 0xDE00.
        let expected = 0xD83Di32.wrapping_mul(31).wrapping_add(0xDE00);
        let key = CacheKey::from_url("\u{1F600}").unwrap();
        assert_eq!(key.as_str(), format!("img_{}.jpg", expected.unsigned_abs()));
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let max_age = chrono::Duration::days(7);
        let one_ms = chrono::Duration::milliseconds(1);
        let fresh = CachedImage::at(PathBuf::from("a"), now - max_age + one_ms);
        let stale = CachedImage::at(PathBuf::from("a"), now - max_age - one_ms);
        assert!(!fresh.is_expired(max_age, now));
        assert!(stale.is_expired(max_age, now));
    }

    #[test]
    fn test_image_ref_uri() {
        assert_eq!(
            ImageRef::Remote("https://x/y.jpg".into()).uri(),
            "https://x/y.jpg"
        );
        assert_eq!(
            ImageRef::Asset("placeholder.png".into()).uri(),
            "asset://placeholder.png"
        );
        assert!(ImageRef::Local(PathBuf::from("/tmp/img_1.jpg")).is_local());
    }
}
