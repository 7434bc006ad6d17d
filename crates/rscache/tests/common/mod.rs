#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use bytes::Bytes;
use rscache::formats::archive::join_entries;
use rscache::formats::category::REFERENCE_TABLES;
use rscache::formats::{
    CacheFileInfo, CompressionType, Container, DataCacheFile, ReferenceTable, ReferenceTableEntry,
};
use rscache::storage::sector::is_extended;
use rscache::storage::{
    DATA_FILE_NAME, INDEX_RECORD_SIZE, IndexRecord, SECTOR_SIZE, Sector, index_file_name,
    sector_payload_capacity,
};
use rscache::{CacheSource, Result};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Lays out a cache directory in memory and writes it to disk.
pub struct CacheBuilder {
    data: Vec<u8>,
    indexes: BTreeMap<u8, Vec<u8>>,
    tables: BTreeMap<u8, ReferenceTable>,
}

impl CacheBuilder {
    pub fn new() -> Self {
        Self {
            data: vec![0; SECTOR_SIZE],
            indexes: BTreeMap::from([(REFERENCE_TABLES, Vec::new())]),
            tables: BTreeMap::new(),
        }
    }

    /// Make `category` present with no files.
    pub fn add_category(&mut self, category: u8) {
        self.indexes.entry(category).or_default();
    }

    /// Store `stored` as is; returns the sectors used.
    pub fn add_raw(&mut self, category: u8, file_id: u32, stored: &[u8]) -> Vec<u32> {
        let extended = is_extended(file_id);
        let first = (self.data.len() / SECTOR_SIZE) as u32;
        let chunks: Vec<&[u8]> = stored.chunks(sector_payload_capacity(extended)).collect();
        let mut sectors = Vec::new();
        for (chunk, data) in chunks.iter().enumerate() {
            let number = first + chunk as u32;
            let next = if chunk + 1 == chunks.len() {
                0
            } else {
                number + 1
            };
            let sector = Sector {
                file_id,
                chunk: chunk as u16,
                next_sector: next,
                category,
                data,
            };
            let encoded = sector.encode(extended).unwrap();
            self.data.extend_from_slice(&encoded);
            sectors.push(number);
        }

        let index = self.indexes.entry(category).or_default();
        let offset = file_id as usize * INDEX_RECORD_SIZE;
        if index.len() < offset + INDEX_RECORD_SIZE {
            index.resize(offset + INDEX_RECORD_SIZE, 0);
        }
        let record = IndexRecord::new(stored.len() as u32, first);
        index[offset..offset + INDEX_RECORD_SIZE].copy_from_slice(&record.encode().unwrap());
        sectors
    }

    /// Store a file without a reference table entry.
    pub fn add_plain(&mut self, category: u8, file_id: u32, data: &[u8]) {
        let stored = Container::new(data.to_vec()).encode().unwrap();
        self.add_raw(category, file_id, &stored);
    }

    /// Store a gzip-compressed file and list it in the category's
    /// reference table with one child per entry.
    pub fn add_file(&mut self, category: u8, file_id: u32, version: i32, entries: &[&[u8]]) {
        let entries: Vec<Bytes> = entries.iter().map(|e| Bytes::copy_from_slice(e)).collect();
        let stored = Container::new(join_entries(&entries))
            .with_compression(CompressionType::Gzip)
            .encode()
            .unwrap();
        self.add_raw(category, file_id, &stored);

        let mut entry = ReferenceTableEntry::new(file_id, version);
        entry.crc = file_id as i32;
        for child in 0..entries.len() as u32 {
            entry.children.insert(child, None);
        }
        self.tables.entry(category).or_default().insert(entry);
    }

    /// List a file in the reference table without storing it.
    pub fn list_only(&mut self, category: u8, file_id: u32) {
        self.tables
            .entry(category)
            .or_default()
            .insert(ReferenceTableEntry::new(file_id, 1));
    }

    pub fn patch_sector(&mut self, number: u32, patch: impl FnOnce(&mut [u8])) {
        let start = number as usize * SECTOR_SIZE;
        patch(&mut self.data[start..start + SECTOR_SIZE]);
    }

    pub fn write(mut self, dir: &Path) {
        let tables = std::mem::take(&mut self.tables);
        for (category, table) in tables {
            let stored = Container::new(table.encode().unwrap()).encode().unwrap();
            self.add_raw(REFERENCE_TABLES, u32::from(category), &stored);
        }

        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(DATA_FILE_NAME), &self.data).unwrap();
        for (category, index) in &self.indexes {
            std::fs::write(dir.join(index_file_name(*category)), index).unwrap();
        }
    }
}

/// Enum file with a dictionary of integer keys to string values.
pub fn enum_bytes(pairs: &[(i32, &str)]) -> Vec<u8> {
    let mut out = vec![1, b'i', 2, b's', 5];
    out.extend_from_slice(&(pairs.len() as u16).to_be_bytes());
    for (key, value) in pairs {
        out.extend_from_slice(&key.to_be_bytes());
        out.extend_from_slice(value.as_bytes());
        out.push(0);
    }
    out.push(0);
    out
}

/// Wraps a source and counts fetches.
pub struct CountingSource<S> {
    pub inner: S,
    fetches: AtomicUsize,
}

impl<S> CountingSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: CacheSource> CacheSource for CountingSource<S> {
    async fn fetch_file(&self, category: u8, file_id: u32) -> Result<DataCacheFile> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_file(category, file_id).await
    }

    async fn file_ids(&self, category: u8) -> Result<Vec<u32>> {
        self.inner.file_ids(category).await
    }

    async fn categories(&self) -> Result<Vec<u8>> {
        self.inner.categories().await
    }

    async fn file_info(&self, category: u8, file_id: u32) -> Result<CacheFileInfo> {
        self.inner.file_info(category, file_id).await
    }
}
