//! Image cache error types.

use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Image cache error variants.
#[derive(Debug, Clone, Error)]
#[allow(missing_docs)]
pub enum CacheError {
    #[error("io error: {message}")]
    Io {
        message: String,
        kind: std::io::ErrorKind,
    },

    #[error("network error: {message}")]
    Network { message: String },

    #[error("download failed with HTTP status {status}")]
    DownloadStatus { status: u16 },

    #[error("invalid image url: {url:?}")]
    InvalidUrl { url: String },
}

impl CacheError {
    /// Creates io error with context.
    #[must_use]
    pub fn io(context: impl std::fmt::Display, source: &std::io::Error) -> Self {
        Self::Io {
            message: format!("{context}: {source}"),
            kind: source.kind(),
        }
    }

    /// Creates network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates invalid url error.
    #[must_use]
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Returns whether the error means the path does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { kind, .. } if *kind == std::io::ErrorKind::NotFound)
    }

    /// Returns whether error is network related.
    #[must_use]
    pub const fn is_network_error(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::DownloadStatus { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_keeps_kind() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = CacheError::io("Failed to stat /tmp/x", &source);
        assert!(err.is_not_found());
        assert!(!err.is_network_error());
        assert_eq!(err.to_string(), "io error: Failed to stat /tmp/x: gone");
    }

    #[test]
    fn test_status_is_network_error() {
        let err = CacheError::DownloadStatus { status: 404 };
        assert!(err.is_network_error());
        assert_eq!(err.to_string(), "download failed with HTTP status 404");
    }
}
