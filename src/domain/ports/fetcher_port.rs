//! Network fetcher port definition.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::errors::CacheResult;

/// Response received for an image URL.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    /// HTTP status code.
    pub status: u16,
    /// Declared content type, if any.
    pub content_type: Option<String>,
    /// Response body. Empty when the status is not a success.
    pub body: Bytes,
}

impl FetchedImage {
    /// Returns true for a 2xx status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Port for retrieving image bytes by URL.
#[async_trait]
pub trait NetworkFetcherPort: Send + Sync {
    /// Fetches the URL. Transport failures are errors; HTTP failures are
    /// reported through [`FetchedImage::status`].
    async fn fetch(&self, url: &str) -> CacheResult<FetchedImage>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use crate::domain::errors::CacheError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fetcher that answers every URL with the same response.
    pub struct StaticFetcher {
        status: u16,
        body: Bytes,
        transport_error: bool,
        calls: AtomicUsize,
    }

    impl StaticFetcher {
        /// Answers with 200 and the given body.
        pub fn ok(body: &'static [u8]) -> Self {
            Self {
                status: 200,
                body: Bytes::from_static(body),
                transport_error: false,
                calls: AtomicUsize::new(0),
            }
        }

        /// Answers with the given status and an empty body.
        pub fn status(status: u16) -> Self {
            Self {
                status,
                body: Bytes::new(),
                transport_error: false,
                calls: AtomicUsize::new(0),
            }
        }

        /// Fails every request at the transport level.
        pub fn unreachable() -> Self {
            Self {
                transport_error: true,
                ..Self::status(0)
            }
        }

        /// Number of fetches performed.
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl NetworkFetcherPort for StaticFetcher {
        async fn fetch(&self, url: &str) -> CacheResult<FetchedImage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.transport_error {
                return Err(CacheError::network(format!("connection refused: {url}")));
            }
            Ok(FetchedImage {
                status: self.status,
                content_type: None,
                body: self.body.clone(),
            })
        }
    }
}
