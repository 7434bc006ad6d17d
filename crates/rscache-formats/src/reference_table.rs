//! Reference tables: per-category file listings
//!
//! Each category has a reference table stored in the meta category (255)
//! under the category's id. It lists the files present in the category with
//! their versions, checksums and the ids of the entries packed in each file.
//!
//! Layout (big-endian; `id` is a big smart from format 7, a u16 before):
//!
//! ```text
//! u8 format (5..=7)
//! [i32 version]                       format >= 6
//! u8 flags
//! id count
//! id delta * count
//! [i32 identifier * count]            NAMED
//! i32 crc * count
//! [i32 hash * count]                  HASH
//! [u8[64] whirlpool * count]          WHIRLPOOL
//! [u32 compressed, u32 size * count]  SIZES
//! i32 version * count
//! id child count * count
//! id child delta * child count, per file
//! [i32 child identifier, per child]   NAMED
//! ```

use crate::buffer::{ByteReader, ByteWriter};
use crate::error::{FormatError, Result};
use std::collections::BTreeMap;

/// Table flags
pub mod flags {
    /// Files and entries carry name hashes
    pub const NAMED: u8 = 0x01;
    /// Files carry a whirlpool digest
    pub const WHIRLPOOL: u8 = 0x02;
    /// Files carry compressed and uncompressed sizes
    pub const SIZES: u8 = 0x04;
    /// Files carry an additional content hash
    pub const HASH: u8 = 0x08;
}

/// Oldest format understood
pub const MIN_FORMAT: u8 = 5;
/// Newest format understood
pub const MAX_FORMAT: u8 = 7;

/// One file listed in a reference table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceTableEntry {
    /// File id
    pub id: u32,
    /// Name hash, for named tables
    pub identifier: Option<i32>,
    /// CRC of the stored container
    pub crc: i32,
    /// Additional content hash
    pub hash: Option<i32>,
    /// Whirlpool digest of the stored container
    pub whirlpool: Option<[u8; 64]>,
    /// Compressed size
    pub compressed_size: Option<u32>,
    /// Uncompressed size
    pub uncompressed_size: Option<u32>,
    /// File version
    pub version: i32,
    /// Entry ids mapped to their name hashes
    pub children: BTreeMap<u32, Option<i32>>,
}

impl ReferenceTableEntry {
    /// Entry listing `id` at `version` with no children.
    pub fn new(id: u32, version: i32) -> Self {
        Self {
            id,
            version,
            ..Default::default()
        }
    }

    /// Number of entries the file's payload is split into.
    ///
    /// Entries are packed in child order, so sparse child ids do not leave
    /// gaps in the archive.
    pub fn entry_count(&self) -> usize {
        self.children.len().max(1)
    }
}

/// Decoded reference table for one category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceTable {
    /// Format number (5..=7)
    pub format: u8,
    /// Table version, format 6 and later
    pub version: Option<i32>,
    /// See [`flags`]
    pub flags: u8,
    /// Files keyed by id
    pub entries: BTreeMap<u32, ReferenceTableEntry>,
}

impl Default for ReferenceTable {
    fn default() -> Self {
        Self {
            format: MAX_FORMAT,
            version: Some(0),
            flags: 0,
            entries: BTreeMap::new(),
        }
    }
}

impl ReferenceTable {
    /// Ids of every listed file, ascending.
    pub fn file_ids(&self) -> Vec<u32> {
        self.entries.keys().copied().collect()
    }

    /// Version of every listed file.
    pub fn versions(&self) -> BTreeMap<u32, i32> {
        self.entries
            .iter()
            .map(|(&id, e)| (id, e.version))
            .collect()
    }

    pub fn entry(&self, file_id: u32) -> Option<&ReferenceTableEntry> {
        self.entries.get(&file_id)
    }

    pub fn contains(&self, file_id: u32) -> bool {
        self.entries.contains_key(&file_id)
    }

    /// Add or replace a file listing.
    pub fn insert(&mut self, entry: ReferenceTableEntry) {
        self.entries.insert(entry.id, entry);
    }

    fn has(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }

    /// Decode a table, rejecting unknown formats and truncated input.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(data);

        let format = reader.read_u8()?;
        if !(MIN_FORMAT..=MAX_FORMAT).contains(&format) {
            return Err(FormatError::UnsupportedFormat(format));
        }
        let version = if format >= 6 {
            Some(reader.read_i32()?)
        } else {
            None
        };
        let table_flags = reader.read_u8()?;

        let read_id = |reader: &mut ByteReader<'_>| -> Result<u32> {
            if format >= 7 {
                reader.read_big_smart()
            } else {
                Ok(u32::from(reader.read_u16()?))
            }
        };

        let count = read_id(&mut reader)? as usize;
        let mut ids = Vec::with_capacity(count.min(reader.remaining()));
        let mut last = 0u32;
        for _ in 0..count {
            last = last.wrapping_add(read_id(&mut reader)?);
            ids.push(last);
        }

        let mut entries: Vec<ReferenceTableEntry> = ids
            .iter()
            .map(|&id| ReferenceTableEntry::new(id, 0))
            .collect();

        if table_flags & flags::NAMED != 0 {
            for entry in &mut entries {
                entry.identifier = Some(reader.read_i32()?);
            }
        }
        for entry in &mut entries {
            entry.crc = reader.read_i32()?;
        }
        if table_flags & flags::HASH != 0 {
            for entry in &mut entries {
                entry.hash = Some(reader.read_i32()?);
            }
        }
        if table_flags & flags::WHIRLPOOL != 0 {
            for entry in &mut entries {
                let mut digest = [0u8; 64];
                digest.copy_from_slice(reader.take(64)?);
                entry.whirlpool = Some(digest);
            }
        }
        if table_flags & flags::SIZES != 0 {
            for entry in &mut entries {
                entry.compressed_size = Some(reader.read_u32()?);
                entry.uncompressed_size = Some(reader.read_u32()?);
            }
        }
        for entry in &mut entries {
            entry.version = reader.read_i32()?;
        }

        let mut child_counts = Vec::with_capacity(entries.len());
        for _ in 0..entries.len() {
            child_counts.push(read_id(&mut reader)? as usize);
        }
        let mut child_ids: Vec<Vec<u32>> = Vec::with_capacity(entries.len());
        for &child_count in &child_counts {
            let mut ids = Vec::with_capacity(child_count.min(reader.remaining()));
            let mut last = 0u32;
            for _ in 0..child_count {
                last = last.wrapping_add(read_id(&mut reader)?);
                ids.push(last);
            }
            child_ids.push(ids);
        }
        for (entry, ids) in entries.iter_mut().zip(&child_ids) {
            for &child in ids {
                let identifier = if table_flags & flags::NAMED != 0 {
                    Some(reader.read_i32()?)
                } else {
                    None
                };
                entry.children.insert(child, identifier);
            }
        }

        if !reader.is_empty() {
            return Err(FormatError::LengthMismatch {
                expected: reader.position(),
                actual: data.len(),
            });
        }

        Ok(Self {
            format,
            version,
            flags: table_flags,
            entries: entries.into_iter().map(|e| (e.id, e)).collect(),
        })
    }

    /// Encode the table in its own format.
    pub fn encode(&self) -> Result<Vec<u8>> {
        if !(MIN_FORMAT..=MAX_FORMAT).contains(&self.format) {
            return Err(FormatError::UnsupportedFormat(self.format));
        }

        let format = self.format;
        let mut w = ByteWriter::new();
        let write_id = |w: &mut ByteWriter, value: u32| -> Result<()> {
            if format >= 7 {
                w.write_big_smart(value);
                Ok(())
            } else {
                let value = u16::try_from(value).map_err(|_| {
                    FormatError::Unsupported(format!("id {value} in format {format} table"))
                })?;
                w.write_u16(value);
                Ok(())
            }
        };

        w.write_u8(format);
        if format >= 6 {
            w.write_i32(self.version.unwrap_or_default());
        }
        w.write_u8(self.flags);

        write_id(&mut w, self.entries.len() as u32)?;
        let mut last = 0u32;
        for &id in self.entries.keys() {
            write_id(&mut w, id - last)?;
            last = id;
        }

        let entries: Vec<&ReferenceTableEntry> = self.entries.values().collect();
        if self.has(flags::NAMED) {
            for e in &entries {
                w.write_i32(e.identifier.unwrap_or_default());
            }
        }
        for e in &entries {
            w.write_i32(e.crc);
        }
        if self.has(flags::HASH) {
            for e in &entries {
                w.write_i32(e.hash.unwrap_or_default());
            }
        }
        if self.has(flags::WHIRLPOOL) {
            for e in &entries {
                w.write_bytes(&e.whirlpool.unwrap_or([0; 64]));
            }
        }
        if self.has(flags::SIZES) {
            for e in &entries {
                w.write_u32(e.compressed_size.unwrap_or_default());
                w.write_u32(e.uncompressed_size.unwrap_or_default());
            }
        }
        for e in &entries {
            w.write_i32(e.version);
        }
        for e in &entries {
            write_id(&mut w, e.children.len() as u32)?;
        }
        for e in &entries {
            let mut last = 0u32;
            for &child in e.children.keys() {
                write_id(&mut w, child - last)?;
                last = child;
            }
        }
        if self.has(flags::NAMED) {
            for e in &entries {
                for identifier in e.children.values() {
                    w.write_i32(identifier.unwrap_or_default());
                }
            }
        }

        Ok(w.into_inner())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample(format: u8, table_flags: u8) -> ReferenceTable {
        let mut table = ReferenceTable {
            format,
            version: (format >= 6).then_some(1234),
            flags: table_flags,
            entries: BTreeMap::new(),
        };
        let named = table_flags & flags::NAMED != 0;
        let mut enums = ReferenceTableEntry::new(5, 77);
        enums.crc = -99;
        for child in [0, 1, 3] {
            let identifier = named.then_some(child as i32 * 10);
            enums.children.insert(child, identifier);
        }
        if named {
            enums.identifier = Some(0x1234);
        }
        if table_flags & flags::WHIRLPOOL != 0 {
            enums.whirlpool = Some([0xAB; 64]);
        }
        if table_flags & flags::SIZES != 0 {
            enums.compressed_size = Some(100);
            enums.uncompressed_size = Some(400);
        }
        if table_flags & flags::HASH != 0 {
            enums.hash = Some(7);
        }
        table.insert(enums);

        let mut single = ReferenceTableEntry::new(40_000, 3);
        single.children.insert(0, named.then_some(0));
        if named {
            single.identifier = Some(0);
        }
        if table_flags & flags::WHIRLPOOL != 0 {
            single.whirlpool = Some([0; 64]);
        }
        if table_flags & flags::SIZES != 0 {
            single.compressed_size = Some(0);
            single.uncompressed_size = Some(0);
        }
        if table_flags & flags::HASH != 0 {
            single.hash = Some(0);
        }
        table.insert(single);
        table
    }

    #[test]
    fn test_format7_all_flags() {
        let all = flags::NAMED | flags::WHIRLPOOL | flags::SIZES | flags::HASH;
        let table = sample(7, all);
        let decoded = ReferenceTable::decode(&table.encode().unwrap()).unwrap();
        assert_eq!(decoded, table);
        assert_eq!(decoded.file_ids(), vec![5, 40_000]);
        assert_eq!(decoded.versions().get(&5), Some(&77));
        assert_eq!(decoded.entry(5).unwrap().entry_count(), 3);
    }

    #[test]
    fn test_format5_has_no_version() {
        let table = sample(5, 0);
        let bytes = table.encode().unwrap();
        assert_eq!(bytes[0], 5);
        // flags directly after the format byte
        assert_eq!(bytes[1], 0);
        let decoded = ReferenceTable::decode(&bytes).unwrap();
        assert_eq!(decoded.version, None);
        assert!(decoded.contains(40_000));
    }

    #[test]
    fn test_format6_rejects_wide_ids_on_encode() {
        let mut table = sample(6, 0);
        table.insert(ReferenceTableEntry::new(140_000, 1));
        assert!(matches!(table.encode(), Err(FormatError::Unsupported(_))));
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(matches!(
            ReferenceTable::decode(&[8, 0, 0, 0, 0, 0]),
            Err(FormatError::UnsupportedFormat(8))
        ));
        assert!(matches!(
            ReferenceTable::decode(&[4]),
            Err(FormatError::UnsupportedFormat(4))
        ));
    }

    #[test]
    fn test_truncated_and_trailing_bytes_rejected() {
        let bytes = sample(7, flags::NAMED).encode().unwrap();
        assert!(matches!(
            ReferenceTable::decode(&bytes[..bytes.len() - 1]),
            Err(FormatError::Truncated { .. })
        ));

        let mut padded = bytes;
        padded.push(0);
        assert!(matches!(
            ReferenceTable::decode(&padded),
            Err(FormatError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_entry_without_children_has_one_entry() {
        assert_eq!(ReferenceTableEntry::new(1, 1).entry_count(), 1);
    }
}
