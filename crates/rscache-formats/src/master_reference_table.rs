//! Master reference table: one summary per category
//!
//! Served as file 255 of category 255. A leading count byte is followed by
//! one fixed-size [`MasterEntry`] per category, in category order. Anything
//! after the last entry is the table signature and is kept verbatim.

use crate::error::{FormatError, Result};
use binrw::{BinRead, BinWrite};
use std::io::Cursor;

/// Size of one encoded [`MasterEntry`].
pub const MASTER_ENTRY_SIZE: usize = 80;

/// Summary of one category's reference table
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(big)]
pub struct MasterEntry {
    /// CRC of the category's reference table container
    pub crc: i32,
    /// Version of the category's reference table
    pub version: i32,
    /// Number of files in the category
    pub file_count: u32,
    /// Length of the category's reference table container
    pub length: u32,
    /// Whirlpool digest of the reference table container
    pub whirlpool: [u8; 64],
}

impl MasterEntry {
    pub const fn new(crc: i32, version: i32, file_count: u32, length: u32) -> Self {
        Self {
            crc,
            version,
            file_count,
            length,
            whirlpool: [0; 64],
        }
    }
}

/// Decoded master reference table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MasterReferenceTable {
    /// Entries indexed by category id
    pub entries: Vec<MasterEntry>,
    /// Trailing signature bytes
    pub signature: Vec<u8>,
}

impl MasterReferenceTable {
    /// Summary for `category`, if the table lists it.
    pub fn entry(&self, category: u8) -> Option<&MasterEntry> {
        self.entries.get(category as usize)
    }

    /// Categories listed, ascending.
    pub fn categories(&self) -> impl Iterator<Item = u8> + '_ {
        (0..self.entries.len()).filter_map(|c| u8::try_from(c).ok())
    }

    /// Number of categories listed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let Some((&count, body)) = data.split_first() else {
            return Err(FormatError::Truncated {
                position: 0,
                needed: 1,
                available: 0,
            });
        };

        let needed = count as usize * MASTER_ENTRY_SIZE;
        if body.len() < needed {
            return Err(FormatError::Truncated {
                position: 1,
                needed,
                available: body.len(),
            });
        }

        let mut cursor = Cursor::new(&body[..needed]);
        let entries = (0..count)
            .map(|_| MasterEntry::read(&mut cursor))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            entries,
            signature: body[needed..].to_vec(),
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let count = u8::try_from(self.entries.len()).map_err(|_| {
            FormatError::Unsupported(format!("{} master table entries", self.entries.len()))
        })?;

        let mut cursor = Cursor::new(Vec::with_capacity(
            1 + self.entries.len() * MASTER_ENTRY_SIZE + self.signature.len(),
        ));
        count.write_be(&mut cursor)?;
        for entry in &self.entries {
            entry.write(&mut cursor)?;
        }
        let mut out = cursor.into_inner();
        out.extend_from_slice(&self.signature);
        Ok(out)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_entry_layout() {
        let mut entry = MasterEntry::new(0x0102_0304, 5, 6, 7);
        entry.whirlpool[0] = 0xFF;
        let table = MasterReferenceTable {
            entries: vec![entry],
            signature: vec![],
        };
        let bytes = table.encode().unwrap();
        assert_eq!(bytes.len(), 1 + MASTER_ENTRY_SIZE);
        assert_eq!(&bytes[..5], &[1, 1, 2, 3, 4]);
        assert_eq!(&bytes[5..9], &[0, 0, 0, 5]);
        assert_eq!(bytes[17], 0xFF);
    }

    #[test]
    fn test_decode_keeps_signature() {
        let table = MasterReferenceTable {
            entries: vec![MasterEntry::new(1, 2, 3, 4), MasterEntry::new(-1, 9, 0, 12)],
            signature: vec![0xAA; 16],
        };
        let decoded = MasterReferenceTable::decode(&table.encode().unwrap()).unwrap();
        assert_eq!(decoded, table);
        assert_eq!(decoded.entry(1).unwrap().version, 9);
        assert!(decoded.entry(2).is_none());
        assert_eq!(decoded.categories().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_truncated() {
        assert!(matches!(
            MasterReferenceTable::decode(&[]),
            Err(FormatError::Truncated { .. })
        ));
        assert!(matches!(
            MasterReferenceTable::decode(&[2; 100]),
            Err(FormatError::Truncated { needed: 160, .. })
        ));
    }
}
