//! Cache source backed by a cache directory on disk

use crate::error::{CacheError, Result};
use crate::source::CacheSource;
use async_trait::async_trait;
use dashmap::DashMap;
use rscache_formats::archive::split_entries;
use rscache_formats::category::REFERENCE_TABLES;
use rscache_formats::{CacheFileInfo, Container, DataCacheFile, ReferenceTable};
use rscache_storage::FileStore;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Reads files from a [`FileStore`], using the reference tables stored in
/// the meta category for versions and entry counts.
///
/// Categories without a reference table are treated as a flat range of
/// single-entry files.
#[derive(Debug, Clone)]
pub struct LocalCache {
    store: Arc<FileStore>,
    /// `None` records a category with no reference table
    reference_tables: Arc<DashMap<u8, Option<Arc<ReferenceTable>>>>,
}

impl LocalCache {
    pub fn new(store: FileStore) -> Self {
        Self {
            store: Arc::new(store),
            reference_tables: Arc::new(DashMap::new()),
        }
    }

    /// Open the cache in `directory`.
    pub fn open(directory: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(FileStore::open(directory)?))
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    /// The reference table of `category`, decoded once.
    pub fn reference_table(&self, category: u8) -> Result<Option<Arc<ReferenceTable>>> {
        if category == REFERENCE_TABLES {
            return Ok(None);
        }
        if let Some(table) = self.reference_tables.get(&category) {
            return Ok(table.value().clone());
        }

        let table_id = u32::from(category);
        let table = match self.store.get_file_data(REFERENCE_TABLES, table_id) {
            Ok(raw) => {
                let container = Container::decode(&raw)?;
                let table = ReferenceTable::decode(&container.data)?;
                debug!(
                    "Decoded reference table for category {} ({} files)",
                    category,
                    table.entries.len()
                );
                Some(Arc::new(table))
            }
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e.into()),
        };

        // Concurrent decoders may race here; the first insert wins
        Ok(self
            .reference_tables
            .entry(category)
            .or_insert(table)
            .value()
            .clone())
    }

    fn info(&self, category: u8, file_id: u32) -> Result<CacheFileInfo> {
        let mut info = CacheFileInfo::new(category, file_id);
        match self.reference_table(category)? {
            Some(table) => {
                let entry = table.entry(file_id).ok_or_else(|| {
                    CacheError::NotFound(format!("file {file_id} in category {category}"))
                })?;
                info.version = Some(entry.version);
                info.crc = Some(entry.crc);
                info.entry_count = Some(entry.entry_count());
            }
            None => {
                let record = self.store.read_index_record(category, file_id)?;
                if record.is_empty() {
                    return Err(CacheError::NotFound(format!(
                        "file {file_id} in category {category}"
                    )));
                }
                info.entry_count = Some(1);
            }
        }
        Ok(info)
    }

    fn read_file(&self, category: u8, file_id: u32) -> Result<DataCacheFile> {
        let mut info = self.info(category, file_id)?;
        let raw = self.store.get_file_data(category, file_id)?;
        let container = Container::decode(&raw)?;

        info.compression = Some(container.compression);
        if info.version.is_none() {
            info.version = container.version.map(i32::from);
        }

        let entries = split_entries(&container.data, info.entry_count.unwrap_or(1))?;
        Ok(DataCacheFile::with_entries(container.data, entries, info))
    }
}

#[async_trait]
impl CacheSource for LocalCache {
    async fn fetch_file(&self, category: u8, file_id: u32) -> Result<DataCacheFile> {
        let cache = self.clone();
        tokio::task::spawn_blocking(move || cache.read_file(category, file_id))
            .await
            .map_err(|e| CacheError::Io(std::io::Error::other(e)))?
    }

    async fn file_ids(&self, category: u8) -> Result<Vec<u32>> {
        if let Some(table) = self.reference_table(category)? {
            return Ok(table.file_ids());
        }
        let count = self.store.file_count(category)?;
        Ok((0..count).filter_map(|id| u32::try_from(id).ok()).collect())
    }

    async fn categories(&self) -> Result<Vec<u8>> {
        Ok(self.store.categories())
    }

    async fn file_info(&self, category: u8, file_id: u32) -> Result<CacheFileInfo> {
        self.info(category, file_id)
    }
}
