//! HTTP image fetcher.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, trace};

use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::ports::{FetchedImage, NetworkFetcherPort};

/// Fetches image bytes over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Creates a fetcher. `timeout` of `None` lets slow requests run until
    /// the server gives up.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(timeout: Option<Duration>) -> CacheResult<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| CacheError::network(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl NetworkFetcherPort for HttpFetcher {
    async fn fetch(&self, url: &str) -> CacheResult<FetchedImage> {
        trace!(url = %url, "Requesting image");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    CacheError::invalid_url(url)
                } else {
                    CacheError::network(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            debug!(
                url = %url,
                status = status.as_u16(),
                reason = status.canonical_reason().unwrap_or("Unknown"),
                "Image request rejected"
            );
            return Ok(FetchedImage {
                status: status.as_u16(),
                content_type: None,
                body: Bytes::new(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let body = response
            .bytes()
            .await
            .map_err(|e| CacheError::network(format!("Failed to read body: {e}")))?;

        Ok(FetchedImage {
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetcher_creation() {
        assert!(HttpFetcher::new(None).is_ok());
        assert!(HttpFetcher::new(Some(Duration::from_secs(30))).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() -> Result<(), Box<dyn std::error::Error>> {
        let fetcher = HttpFetcher::new(Some(Duration::from_secs(2)))?;
        let err = fetcher
            .fetch("http://127.0.0.1:9/photo.jpg")
            .await
            .expect_err("nothing listens on the discard port");
        assert!(err.is_network_error());
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_url_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let fetcher = HttpFetcher::new(None)?;
        let err = fetcher
            .fetch("not a url")
            .await
            .expect_err("malformed url must not be requested");
        assert!(matches!(err, CacheError::InvalidUrl { ref url } if url == "not a url"));
        assert!(!err.is_network_error());
        Ok(())
    }
}
