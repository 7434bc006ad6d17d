//! Backends a [`crate::Cache`] reads files from

use crate::error::Result;
use async_trait::async_trait;
use rscache_formats::{CacheFileInfo, DataCacheFile};
use rscache_protocol::Downloader;

/// A place cache files can be fetched from
#[async_trait]
pub trait CacheSource: Send + Sync {
    /// Fetch, decompress and split one file.
    async fn fetch_file(&self, category: u8, file_id: u32) -> Result<DataCacheFile>;

    /// Ids of the files in `category`.
    async fn file_ids(&self, category: u8) -> Result<Vec<u32>>;

    /// Categories available, excluding the meta category.
    async fn categories(&self) -> Result<Vec<u8>>;

    /// What is known about a file without fetching it.
    async fn file_info(&self, category: u8, file_id: u32) -> Result<CacheFileInfo>;
}

#[async_trait]
impl CacheSource for Downloader {
    async fn fetch_file(&self, category: u8, file_id: u32) -> Result<DataCacheFile> {
        Ok(Self::fetch_file(self, category, file_id).await?)
    }

    async fn file_ids(&self, category: u8) -> Result<Vec<u32>> {
        Ok(Self::file_ids(self, category).await?)
    }

    async fn categories(&self) -> Result<Vec<u8>> {
        Ok(Self::categories(self).await?)
    }

    async fn file_info(&self, category: u8, file_id: u32) -> Result<CacheFileInfo> {
        Ok(Self::file_info(self, category, file_id).await?)
    }
}
