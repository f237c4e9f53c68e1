mod fetcher_port;
mod file_store_port;

pub use fetcher_port::{FetchedImage, NetworkFetcherPort};
#[cfg(test)]
pub use file_store_port::MockFileStorePort;
pub use file_store_port::{DownloadOutcome, FileInfo, FileStorePort};

#[cfg(test)]
pub mod mocks {
    pub use super::fetcher_port::mock::StaticFetcher;
    pub use super::file_store_port::mock::InMemoryFileStore;
}
