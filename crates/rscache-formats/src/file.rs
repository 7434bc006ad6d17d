//! Cache file model: provenance, raw files and the typed decoder contract

use crate::container::CompressionType;
use crate::error::{FormatError, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Provenance attached to a file once it has been retrieved
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheFileInfo {
    /// Category (index) the file belongs to
    pub category: u8,
    /// File id within the category
    pub file_id: u32,
    /// Compression of the container the file was stored in
    pub compression: Option<CompressionType>,
    /// Version from the reference table, or the container trailer
    pub version: Option<i32>,
    /// CRC recorded in the reference table
    pub crc: Option<i32>,
    /// Number of entries the reference table lists for the file
    pub entry_count: Option<usize>,
}

impl CacheFileInfo {
    /// Info for `category`/`file_id` with every optional field unset.
    pub fn new(category: u8, file_id: u32) -> Self {
        Self {
            category,
            file_id,
            ..Default::default()
        }
    }
}

/// A raw cache file: its payload, the entries packed in it, and its info.
///
/// Entry 0 exists even for single-entry files, in which case it is the
/// whole payload. Zero-length entries are valid and mark absent sub-files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataCacheFile {
    /// Decompressed payload
    pub data: Bytes,
    /// Entries in archive order
    pub entries: Vec<Bytes>,
    /// Provenance
    pub info: CacheFileInfo,
}

impl DataCacheFile {
    /// A single-entry file.
    pub fn new(data: impl Into<Bytes>, info: CacheFileInfo) -> Self {
        let data = data.into();
        Self {
            entries: vec![data.clone()],
            data,
            info,
        }
    }

    /// A file whose payload has already been split into entries.
    pub fn with_entries(data: impl Into<Bytes>, entries: Vec<Bytes>, info: CacheFileInfo) -> Self {
        Self {
            data: data.into(),
            entries,
            info,
        }
    }

    /// Number of entries, including empty ones.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// A new single-entry file holding entry `entry_id` of this one.
    pub fn select_entry(&self, entry_id: usize) -> Result<Self> {
        let entry = self
            .entries
            .get(entry_id)
            .ok_or(FormatError::OutOfRange {
                entry_id,
                entry_count: self.entries.len(),
            })?;
        Ok(Self::new(entry.clone(), self.info.clone()))
    }
}

/// Contract for typed cache files decoded from a [`DataCacheFile`].
///
/// Implementations decode from the raw `data` of a file and must reject
/// structurally invalid input rather than guess. Input buffers are borrowed
/// immutably.
pub trait CacheFile: Sized {
    /// Decode from raw bytes.
    fn decode(data: &[u8]) -> Result<Self>;

    /// Encode back to raw bytes.
    fn encode(&self) -> Result<Vec<u8>>;

    /// Provenance of the decoded file.
    fn info(&self) -> &CacheFileInfo;

    /// Mutable provenance, set when converting from a data file.
    fn info_mut(&mut self) -> &mut CacheFileInfo;

    /// Decode the payload of `file`, carrying its info across.
    fn from_data_file(file: DataCacheFile) -> Result<Self> {
        let mut decoded = Self::decode(&file.data)?;
        *decoded.info_mut() = file.info;
        Ok(decoded)
    }

    /// Encode into a single-entry data file.
    fn to_data_file(&self) -> Result<DataCacheFile> {
        Ok(DataCacheFile::new(self.encode()?, self.info().clone()))
    }
}

/// The raw file is its own typed form; conversions are the identity.
impl CacheFile for DataCacheFile {
    fn decode(data: &[u8]) -> Result<Self> {
        Ok(Self::new(Bytes::copy_from_slice(data), CacheFileInfo::default()))
    }

    fn encode(&self) -> Result<Vec<u8>> {
        Ok(self.data.to_vec())
    }

    fn info(&self) -> &CacheFileInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut CacheFileInfo {
        &mut self.info
    }

    fn from_data_file(file: DataCacheFile) -> Result<Self> {
        Ok(file)
    }

    fn to_data_file(&self) -> Result<DataCacheFile> {
        Ok(self.clone())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn archive() -> DataCacheFile {
        DataCacheFile::with_entries(
            Bytes::from_static(b"packed"),
            vec![
                Bytes::from_static(b"first"),
                Bytes::new(),
                Bytes::from_static(b"third"),
            ],
            CacheFileInfo {
                version: Some(9),
                ..CacheFileInfo::new(17, 5)
            },
        )
    }

    #[test]
    fn test_single_entry_file_has_entry_zero() {
        let file = DataCacheFile::new(Bytes::from_static(b"x"), CacheFileInfo::new(1, 2));
        assert_eq!(file.entry_count(), 1);
        assert_eq!(file.entries[0], file.data);
    }

    #[test]
    fn test_select_entry() {
        let file = archive();
        let selected = file.select_entry(2).unwrap();
        assert_eq!(selected.data, Bytes::from_static(b"third"));
        assert_eq!(selected.entries, vec![Bytes::from_static(b"third")]);
        assert_eq!(selected.info, file.info);

        // Empty entries are valid selections
        assert!(file.select_entry(1).unwrap().data.is_empty());
        // The source file is untouched
        assert_eq!(file.entry_count(), 3);
    }

    #[test]
    fn test_select_entry_out_of_range() {
        assert!(matches!(
            archive().select_entry(3),
            Err(FormatError::OutOfRange {
                entry_id: 3,
                entry_count: 3
            })
        ));
    }

    #[test]
    fn test_data_file_conversion_is_identity() {
        let file = archive();
        let converted = DataCacheFile::from_data_file(file.clone()).unwrap();
        assert_eq!(converted, file);
        assert_eq!(converted.to_data_file().unwrap(), file);
    }
}
