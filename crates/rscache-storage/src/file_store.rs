//! Read access to a cache directory

use crate::error::{Result, StorageError};
use crate::index::{INDEX_RECORD_SIZE, IndexRecord};
use crate::sector::{SECTOR_SIZE, Sector, header_size, is_extended};
use crate::stream::MappedStream;
use bytes::Bytes;
use rscache_formats::category::REFERENCE_TABLES;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

/// Name of the sector data file.
pub const DATA_FILE_NAME: &str = "main_file_cache.dat2";

/// Highest regular category id.
const MAX_CATEGORY: u8 = 253;

/// Name of the index file for `category`.
pub fn index_file_name(category: u8) -> String {
    format!("main_file_cache.idx{category}")
}

/// A cache directory opened for reading.
///
/// All files are memory mapped, so a store can be shared between threads
/// and read concurrently.
#[derive(Debug)]
pub struct FileStore {
    directory: PathBuf,
    data: MappedStream,
    /// Index streams by category, including the meta category
    indexes: BTreeMap<u8, MappedStream>,
}

impl FileStore {
    /// Open the cache in `directory`.
    ///
    /// Fails with [`StorageError::NotFound`] unless the data file, the meta
    /// index and at least one category index are all present.
    pub fn open(directory: impl AsRef<Path>) -> Result<Self> {
        let directory = directory.as_ref();
        info!("Opening cache at {:?}", directory);

        let data_path = directory.join(DATA_FILE_NAME);
        if !data_path.is_file() {
            return Err(StorageError::NotFound(format!(
                "{DATA_FILE_NAME} in {}",
                directory.display()
            )));
        }
        let data = MappedStream::open(&data_path)?;

        let meta_path = directory.join(index_file_name(REFERENCE_TABLES));
        if !meta_path.is_file() {
            return Err(StorageError::NotFound(format!(
                "{} in {}",
                index_file_name(REFERENCE_TABLES),
                directory.display()
            )));
        }

        let mut indexes = BTreeMap::new();
        for category in 0..=MAX_CATEGORY {
            let path = directory.join(index_file_name(category));
            if path.is_file() {
                let stream = MappedStream::open(&path)?;
                debug!(
                    "Loaded index for category {}: {} records",
                    category,
                    stream.len() / INDEX_RECORD_SIZE as u64
                );
                indexes.insert(category, stream);
            }
        }
        if indexes.is_empty() {
            return Err(StorageError::NotFound(format!(
                "category index files in {}",
                directory.display()
            )));
        }
        let category_count = indexes.len();
        indexes.insert(REFERENCE_TABLES, MappedStream::open(&meta_path)?);

        info!(
            "Opened cache with {} categories ({} sectors)",
            category_count,
            data.len() / SECTOR_SIZE as u64
        );

        Ok(Self {
            directory: directory.to_path_buf(),
            data,
            indexes,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Present categories in ascending order, excluding the meta category.
    pub fn categories(&self) -> Vec<u8> {
        self.indexes
            .keys()
            .copied()
            .filter(|&c| c != REFERENCE_TABLES)
            .collect()
    }

    fn index(&self, category: u8) -> Result<&MappedStream> {
        self.indexes
            .get(&category)
            .ok_or(StorageError::InvalidCategory(category))
    }

    /// Number of record slots in `category`'s index.
    pub fn file_count(&self, category: u8) -> Result<usize> {
        Ok(self.index(category)?.len() as usize / INDEX_RECORD_SIZE)
    }

    /// The index record for `file_id`.
    pub fn read_index_record(&self, category: u8, file_id: u32) -> Result<IndexRecord> {
        let offset = u64::from(file_id) * INDEX_RECORD_SIZE as u64;
        let bytes = self
            .index(category)?
            .read_at(offset, INDEX_RECORD_SIZE)
            .ok_or_else(|| {
                StorageError::NotFound(format!("file {file_id} in category {category}"))
            })?;
        IndexRecord::decode(bytes)
    }

    /// Reassemble the stored container for `file_id` from its sector chain.
    ///
    /// Every sector header must name this category, this file and the next
    /// chunk in sequence; anything else, or a chain leaving the data file or
    /// ending early, fails with [`StorageError::CorruptChain`].
    pub fn get_file_data(&self, category: u8, file_id: u32) -> Result<Bytes> {
        let record = self.read_index_record(category, file_id)?;
        if record.is_empty() {
            return Err(StorageError::NotFound(format!(
                "file {file_id} in category {category} (empty slot)"
            )));
        }

        let extended = is_extended(file_id);
        let corrupt = |chunk: u32, reason: String| StorageError::CorruptChain {
            category,
            file_id,
            chunk,
            reason,
        };

        let size = record.size as usize;
        let mut out = Vec::with_capacity(size);
        let mut number = record.first_sector;
        let mut chunk: u32 = 0;

        while out.len() < size {
            if chunk > 0 && number == 0 {
                return Err(corrupt(
                    chunk,
                    format!("chain ended after {} of {size} bytes", out.len()),
                ));
            }

            let position = u64::from(number) * SECTOR_SIZE as u64;
            let raw = self
                .data
                .read_up_to(position, SECTOR_SIZE)
                .filter(|raw| raw.len() > header_size(extended))
                .ok_or_else(|| corrupt(chunk, format!("sector {number} is beyond the data file")))?;
            let sector = Sector::decode(raw, extended)?;

            if sector.category != category {
                return Err(corrupt(
                    chunk,
                    format!("sector {number} belongs to category {}", sector.category),
                ));
            }
            if sector.file_id != file_id {
                return Err(corrupt(
                    chunk,
                    format!("sector {number} belongs to file {}", sector.file_id),
                ));
            }
            if u32::from(sector.chunk) != chunk & 0xFFFF {
                return Err(corrupt(
                    chunk,
                    format!("sector {number} holds chunk {}", sector.chunk),
                ));
            }

            let take = sector.data.len().min(size - out.len());
            out.extend_from_slice(&sector.data[..take]);
            trace!(
                "category {} file {} chunk {}: sector {} -> {} ({} bytes)",
                category, file_id, chunk, number, sector.next_sector, take
            );

            number = sector.next_sector;
            chunk += 1;
        }

        debug!(
            "Read file {} from category {}: {} bytes in {} sectors",
            file_id, category, size, chunk
        );
        Ok(Bytes::from(out))
    }

    /// Writing the sector format is not supported.
    pub fn write_file(
        &self,
        category: u8,
        file_id: u32,
        _data: &[u8],
        _overwrite: bool,
    ) -> Result<()> {
        Err(StorageError::Unsupported(format!("writing file {file_id} to category {category}")))
    }
}
