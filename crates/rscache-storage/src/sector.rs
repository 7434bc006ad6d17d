//! Data file sectors
//!
//! The data file is an array of 520-byte sectors. A file occupies a chain of
//! sectors; each sector header names the file, its position in the chain and
//! the next sector. Files with ids above 65535 use a wider header and carry
//! two fewer payload bytes per sector.

use crate::error::{Result, StorageError};

/// Size of one sector including its header.
pub const SECTOR_SIZE: usize = 520;

/// Files with ids above this use extended sector headers.
pub const EXTENDED_FILE_ID_THRESHOLD: u32 = 0xFFFF;

const HEADER_SIZE: usize = 8;
const EXTENDED_HEADER_SIZE: usize = 10;

/// Header size for the given mode.
pub const fn header_size(extended: bool) -> usize {
    if extended {
        EXTENDED_HEADER_SIZE
    } else {
        HEADER_SIZE
    }
}

/// Payload bytes per sector: 512 normally, 510 with extended headers.
pub const fn sector_payload_capacity(extended: bool) -> usize {
    SECTOR_SIZE - header_size(extended)
}

/// Whether `file_id` is stored with extended sector headers.
pub const fn is_extended(file_id: u32) -> bool {
    file_id > EXTENDED_FILE_ID_THRESHOLD
}

/// One decoded sector, borrowing its payload from the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sector<'a> {
    pub file_id: u32,
    /// Position of this sector in the file's chain
    pub chunk: u16,
    /// Next sector in the chain, 0 for none
    pub next_sector: u32,
    pub category: u8,
    /// Payload, at most [`sector_payload_capacity`] bytes
    pub data: &'a [u8],
}

impl<'a> Sector<'a> {
    /// Decode a sector. `extended` comes from the file id being looked up;
    /// the header does not say which layout it uses.
    ///
    /// A short final sector is accepted as long as its header is complete.
    pub fn decode(bytes: &'a [u8], extended: bool) -> Result<Self> {
        let header = header_size(extended);
        if bytes.len() < header {
            return Err(StorageError::MalformedSector(format!(
                "need {header} header bytes, got {}",
                bytes.len()
            )));
        }

        let (file_id, rest) = if extended {
            (
                u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
                &bytes[4..],
            )
        } else {
            (
                u32::from(u16::from_be_bytes([bytes[0], bytes[1]])),
                &bytes[2..],
            )
        };

        let end = bytes.len().min(SECTOR_SIZE);
        Ok(Self {
            file_id,
            chunk: u16::from_be_bytes([rest[0], rest[1]]),
            next_sector: u32::from_be_bytes([0, rest[2], rest[3], rest[4]]),
            category: rest[5],
            data: &bytes[header..end],
        })
    }

    /// Encode into a full sector, zero-padding the payload.
    pub fn encode(&self, extended: bool) -> Result<[u8; SECTOR_SIZE]> {
        let capacity = sector_payload_capacity(extended);
        if self.data.len() > capacity {
            return Err(StorageError::MalformedSector(format!(
                "payload of {} bytes exceeds sector capacity {capacity}",
                self.data.len()
            )));
        }
        if self.next_sector > 0xFF_FFFF {
            return Err(StorageError::MalformedSector(format!(
                "next sector {} exceeds 24 bits",
                self.next_sector
            )));
        }

        let mut out = [0u8; SECTOR_SIZE];
        let mut pos = if extended {
            out[..4].copy_from_slice(&self.file_id.to_be_bytes());
            4
        } else {
            let file_id = u16::try_from(self.file_id).map_err(|_| {
                StorageError::MalformedSector(format!(
                    "file id {} needs an extended header",
                    self.file_id
                ))
            })?;
            out[..2].copy_from_slice(&file_id.to_be_bytes());
            2
        };
        out[pos..pos + 2].copy_from_slice(&self.chunk.to_be_bytes());
        pos += 2;
        out[pos..pos + 3].copy_from_slice(&self.next_sector.to_be_bytes()[1..]);
        pos += 3;
        out[pos] = self.category;
        pos += 1;
        out[pos..pos + self.data.len()].copy_from_slice(self.data);
        Ok(out)
    }
}
