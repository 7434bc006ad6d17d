//! Index records
//!
//! Each category's index file is a flat array of 6-byte records; a file's
//! record sits at `file_id * 6`.

use crate::error::{Result, StorageError};
use binrw::{BinRead, BinWrite};
use std::io::Cursor;

/// Width of one index record in bytes.
pub const INDEX_RECORD_SIZE: usize = 6;

/// Location of one file in the data file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BinRead, BinWrite)]
#[brw(big)]
pub struct IndexRecord {
    /// Size of the stored container in bytes (24-bit)
    #[br(map = |x: [u8; 3]| u32::from_be_bytes([0, x[0], x[1], x[2]]))]
    #[bw(map = |x: &u32| { let b = x.to_be_bytes(); [b[1], b[2], b[3]] })]
    pub size: u32,

    /// Sector holding chunk 0 (24-bit)
    #[br(map = |x: [u8; 3]| u32::from_be_bytes([0, x[0], x[1], x[2]]))]
    #[bw(map = |x: &u32| { let b = x.to_be_bytes(); [b[1], b[2], b[3]] })]
    pub first_sector: u32,
}

impl IndexRecord {
    pub const fn new(size: u32, first_sector: u32) -> Self {
        Self { size, first_sector }
    }

    /// An unused slot: nothing stored, no chain.
    pub const fn is_empty(&self) -> bool {
        self.size == 0 && self.first_sector == 0
    }

    /// Decode a record from the first 6 bytes of `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < INDEX_RECORD_SIZE {
            return Err(StorageError::MalformedRecord(format!(
                "need {INDEX_RECORD_SIZE} bytes, got {}",
                bytes.len()
            )));
        }
        Self::read(&mut Cursor::new(&bytes[..INDEX_RECORD_SIZE]))
            .map_err(|e| StorageError::MalformedRecord(e.to_string()))
    }

    /// Encode the record; fields wider than 24 bits are rejected.
    pub fn encode(&self) -> Result<[u8; INDEX_RECORD_SIZE]> {
        if self.size > 0xFF_FFFF || self.first_sector > 0xFF_FFFF {
            return Err(StorageError::MalformedRecord(format!(
                "size {} or sector {} exceeds 24 bits",
                self.size, self.first_sector
            )));
        }
        let mut cursor = Cursor::new([0u8; INDEX_RECORD_SIZE]);
        self.write(&mut cursor)
            .map_err(|e| StorageError::MalformedRecord(e.to_string()))?;
        Ok(cursor.into_inner())
    }
}
