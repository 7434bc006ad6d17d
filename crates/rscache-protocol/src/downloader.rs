//! Remote cache access with memoized reference tables
//!
//! The downloader fetches containers through a [`Transport`] and keeps every
//! decoded reference table for its lifetime. Concurrent first requests for
//! the same table share one fetch.

use crate::config::DownloaderConfig;
use crate::error::{ProtocolError, Result};
use crate::request::FileRequest;
use crate::transport::Transport;
use bytes::Bytes;
use dashmap::DashMap;
use rscache_formats::archive::split_entries;
use rscache_formats::category::REFERENCE_TABLES;
use rscache_formats::{
    CacheFileInfo, Container, DataCacheFile, MasterReferenceTable, ReferenceTable,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// File id of the master reference table in the meta category.
pub const MASTER_TABLE_FILE_ID: u32 = 255;

type TableCell = Arc<OnceCell<Arc<ReferenceTable>>>;

pub struct Downloader {
    transport: Arc<dyn Transport>,
    config: DownloaderConfig,
    master: OnceCell<Arc<MasterReferenceTable>>,
    reference_tables: DashMap<u8, TableCell>,
    requests: AtomicUsize,
}

impl std::fmt::Debug for Downloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downloader")
            .field("config", &self.config)
            .field("cached_tables", &self.reference_tables.len())
            .field("requests", &self.request_count())
            .finish_non_exhaustive()
    }
}

impl Downloader {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_config(transport, DownloaderConfig::default())
    }

    pub fn with_config(transport: Arc<dyn Transport>, config: DownloaderConfig) -> Self {
        Self {
            transport,
            config,
            master: OnceCell::new(),
            reference_tables: DashMap::new(),
            requests: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    /// Requests submitted to the transport by this downloader.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    /// Fetch the stored container for `category`/`file_id` as delivered.
    pub async fn request_raw(&self, category: u8, file_id: u32) -> Result<Bytes> {
        let request = Arc::new(FileRequest::new(category, file_id));
        self.requests.fetch_add(1, Ordering::Relaxed);
        debug!("Requesting {}/{}", category, file_id);

        self.transport.submit(Arc::clone(&request)).await?;
        let data = match self.config.request_timeout {
            Some(timeout) => request.wait_for_completion_timeout(timeout).await?,
            None => request.wait_for_completion().await?,
        };

        debug!("Received {}/{} ({} bytes)", category, file_id, data.len());
        Ok(data)
    }

    async fn request_container(&self, category: u8, file_id: u32) -> Result<Container> {
        let raw = self.request_raw(category, file_id).await?;
        Ok(Container::decode(&raw)?)
    }

    /// The master reference table, fetched once per downloader.
    pub async fn get_master_reference_table(&self) -> Result<Arc<MasterReferenceTable>> {
        let table = self
            .master
            .get_or_try_init(|| async {
                let container = self
                    .request_container(REFERENCE_TABLES, MASTER_TABLE_FILE_ID)
                    .await?;
                let table = MasterReferenceTable::decode(&container.data)?;
                info!("Loaded master reference table ({} categories)", table.len());
                Ok::<_, ProtocolError>(Arc::new(table))
            })
            .await?;
        Ok(Arc::clone(table))
    }

    /// The reference table of `category`, fetched once per downloader.
    pub async fn get_reference_table(&self, category: u8) -> Result<Arc<ReferenceTable>> {
        let cell: TableCell = Arc::clone(&self.reference_tables.entry(category).or_default());

        let table = cell
            .get_or_try_init(|| async {
                let container = self
                    .request_container(REFERENCE_TABLES, u32::from(category))
                    .await?;
                let table = ReferenceTable::decode(&container.data)?;
                info!(
                    "Loaded reference table for category {} ({} files)",
                    category,
                    table.entries.len()
                );
                Ok::<_, ProtocolError>(Arc::new(table))
            })
            .await?;
        Ok(Arc::clone(table))
    }

    /// Categories listed in the master reference table.
    pub async fn categories(&self) -> Result<Vec<u8>> {
        let master = self.get_master_reference_table().await?;
        Ok(master.categories().collect())
    }

    /// File ids in `category`. For the meta category these are the
    /// categories that have a reference table.
    pub async fn file_ids(&self, category: u8) -> Result<Vec<u32>> {
        if category == REFERENCE_TABLES {
            let categories = self.categories().await?;
            return Ok(categories.into_iter().map(u32::from).collect());
        }
        Ok(self.get_reference_table(category).await?.file_ids())
    }

    /// What the reference tables say about a file, without fetching it.
    pub async fn file_info(&self, category: u8, file_id: u32) -> Result<CacheFileInfo> {
        let mut info = CacheFileInfo::new(category, file_id);

        if category == REFERENCE_TABLES {
            let master = self.get_master_reference_table().await?;
            let entry = u8::try_from(file_id)
                .ok()
                .and_then(|c| master.entry(c))
                .ok_or_else(|| not_found(category, file_id))?;
            info.version = Some(entry.version);
            info.crc = Some(entry.crc);
            info.entry_count = Some(1);
            return Ok(info);
        }

        let table = self.get_reference_table(category).await?;
        let entry = table
            .entry(file_id)
            .ok_or_else(|| not_found(category, file_id))?;
        info.version = Some(entry.version);
        info.crc = Some(entry.crc);
        info.entry_count = Some(entry.entry_count());
        Ok(info)
    }

    /// Fetch, decompress and split a file.
    pub async fn fetch_file(&self, category: u8, file_id: u32) -> Result<DataCacheFile> {
        let mut info = self.file_info(category, file_id).await?;
        let container = self.request_container(category, file_id).await?;

        info.compression = Some(container.compression);
        if info.version.is_none() {
            info.version = container.version.map(i32::from);
        }

        let entry_count = info.entry_count.unwrap_or(1);
        let entries = split_entries(&container.data, entry_count)?;
        Ok(DataCacheFile::with_entries(container.data, entries, info))
    }
}

fn not_found(category: u8, file_id: u32) -> ProtocolError {
    ProtocolError::NotFound(format!("file {file_id} in category {category}"))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;
    use futures::future::join_all;
    use pretty_assertions::assert_eq;
    use rscache_formats::archive::join_entries;
    use rscache_formats::category::ENUMS;
    use rscache_formats::{CompressionType, MasterEntry, ReferenceTableEntry};
    use std::time::Duration;

    fn container(data: Vec<u8>) -> Vec<u8> {
        Container::new(data)
            .with_compression(CompressionType::Gzip)
            .encode()
            .unwrap()
    }

    fn fixture() -> Arc<MemoryTransport> {
        let transport = MemoryTransport::new().with_chunk_size(16);

        let mut table = ReferenceTable::default();
        let mut archive = ReferenceTableEntry::new(5, 12);
        archive.crc = 77;
        for child in 0..3 {
            archive.children.insert(child, None);
        }
        table.insert(archive);
        table.insert(ReferenceTableEntry::new(6, 1));
        let encoded = container(table.encode().unwrap());
        transport.insert(REFERENCE_TABLES, u32::from(ENUMS), encoded);

        let master = MasterReferenceTable {
            entries: (0..=ENUMS)
                .map(|c| MasterEntry::new(i32::from(c), 100 + i32::from(c), 0, 0))
                .collect(),
            signature: vec![],
        };
        let encoded = container(master.encode().unwrap());
        transport.insert(REFERENCE_TABLES, MASTER_TABLE_FILE_ID, encoded);

        let entries = vec![
            Bytes::from_static(b"zero"),
            Bytes::new(),
            Bytes::from_static(b"two"),
        ];
        transport.insert(ENUMS, 5, container(join_entries(&entries)));
        let single = Container::new(b"single".to_vec())
            .with_version(3)
            .encode()
            .unwrap();
        transport.insert(ENUMS, 6, single);
        Arc::new(transport)
    }

    #[tokio::test]
    async fn test_reference_table_is_memoized() {
        let transport = fixture();
        let downloader = Downloader::new(transport.clone());

        let first = downloader.get_reference_table(ENUMS).await.unwrap();
        let second = downloader.get_reference_table(ENUMS).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(transport.submissions(), 1);
        assert_eq!(first.file_ids(), vec![5, 6]);
    }

    #[tokio::test]
    async fn test_concurrent_first_calls_share_one_request() {
        let transport = fixture();
        let downloader = Arc::new(Downloader::new(transport.clone()));

        let tables = join_all((0..16).map(|_| {
            let downloader = Arc::clone(&downloader);
            async move { downloader.get_reference_table(ENUMS).await.unwrap() }
        }))
        .await;

        assert_eq!(transport.submissions(), 1);
        assert_eq!(downloader.request_count(), 1);
        assert!(tables.iter().all(|t| Arc::ptr_eq(t, &tables[0])));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_spawned_callers_share_one_master_table() {
        let transport = fixture();
        let downloader = Arc::new(Downloader::new(transport.clone()));

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let downloader = Arc::clone(&downloader);
                tokio::spawn(async move { downloader.get_master_reference_table().await })
            })
            .collect();
        let tables: Vec<Arc<MasterReferenceTable>> = join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.unwrap().unwrap())
            .collect();

        assert_eq!(tables.len(), 32);
        assert_eq!(transport.submissions(), 1);
        assert_eq!(downloader.request_count(), 1);
        assert!(tables.iter().all(|t| Arc::ptr_eq(t, &tables[0])));
    }

    #[tokio::test]
    async fn test_master_table_is_memoized() {
        let transport = fixture();
        let downloader = Downloader::new(transport.clone());

        let first = downloader.get_master_reference_table().await.unwrap();
        let second = downloader.get_master_reference_table().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(transport.submissions(), 1);
        assert_eq!(first.entry(ENUMS).unwrap().version, 117);
        assert_eq!(downloader.categories().await.unwrap().len(), 18);
    }

    #[tokio::test]
    async fn test_fetch_archive_file() {
        let downloader = Downloader::new(fixture());
        let file = downloader.fetch_file(ENUMS, 5).await.unwrap();

        assert_eq!(file.entry_count(), 3);
        assert_eq!(file.entries[0], Bytes::from_static(b"zero"));
        assert!(file.entries[1].is_empty());
        assert_eq!(file.info.version, Some(12));
        assert_eq!(file.info.crc, Some(77));
        assert_eq!(file.info.compression, Some(CompressionType::Gzip));
    }

    #[tokio::test]
    async fn test_fetch_single_entry_file() {
        let downloader = Downloader::new(fixture());
        let file = downloader.fetch_file(ENUMS, 6).await.unwrap();

        assert_eq!(file.data, Bytes::from_static(b"single"));
        assert_eq!(file.entry_count(), 1);
        assert_eq!(file.info.version, Some(1));
        assert_eq!(file.info.compression, Some(CompressionType::None));
    }

    #[tokio::test]
    async fn test_fetch_reference_table_file() {
        let downloader = Downloader::new(fixture());
        let file = downloader
            .fetch_file(REFERENCE_TABLES, u32::from(ENUMS))
            .await
            .unwrap();
        let table = ReferenceTable::decode(&file.data).unwrap();
        assert!(table.contains(5));
        assert_eq!(file.info.version, Some(117));
    }

    #[tokio::test]
    async fn test_unknown_file_is_not_found() {
        let transport = fixture();
        let downloader = Downloader::new(transport.clone());

        let unlisted = downloader.fetch_file(ENUMS, 99).await.unwrap_err();
        assert!(unlisted.is_not_found());
        // Only the reference table was requested
        assert_eq!(transport.submissions(), 1);

        // Listed, but the remote does not have it
        transport.remove(ENUMS, 6);
        let missing = downloader.fetch_file(ENUMS, 6).await.unwrap_err();
        assert!(missing.is_not_found());
    }

    #[tokio::test]
    async fn test_request_timeout() {
        struct Silent;

        #[async_trait::async_trait]
        impl Transport for Silent {
            async fn submit(&self, _request: Arc<FileRequest>) -> Result<()> {
                Ok(())
            }
        }

        let downloader = Downloader::with_config(
            Arc::new(Silent),
            DownloaderConfig::new().with_request_timeout(Duration::from_millis(20)),
        );
        assert!(matches!(
            downloader.request_raw(ENUMS, 1).await,
            Err(ProtocolError::Timeout(_))
        ));
    }
}
