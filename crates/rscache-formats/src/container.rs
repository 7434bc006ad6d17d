//! Compressed container wrapping every stored file
//!
//! Layout (all integers big-endian):
//!
//! | Field | Size | Notes |
//! |-------|------|-------|
//! | compression | 1 | see [`CompressionType`] |
//! | length | 4 | payload length as stored |
//! | uncompressed length | 4 | only when compression is not `None` |
//! | payload | length | |
//! | version | 2 | optional trailer |

use crate::error::{FormatError, Result};
use binrw::{BinRead, BinWrite};
use flate2::Compression;
use flate2::read::{GzDecoder, GzEncoder};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read};

/// Upper bound on a declared uncompressed length (256 MiB).
///
/// Guards the allocation made before decompression; no asset in a game cache
/// comes close to this.
pub const MAX_UNCOMPRESSED_SIZE: usize = 256 * 1024 * 1024;

/// Compression applied to a container payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompressionType {
    /// Stored as is
    None,
    /// bzip2 without the `BZh` magic
    Bzip2,
    /// gzip
    Gzip,
    /// LZMA
    Lzma,
}

impl CompressionType {
    /// Parse the on-disk compression byte.
    pub const fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(Self::None),
            1 => Ok(Self::Bzip2),
            2 => Ok(Self::Gzip),
            3 => Ok(Self::Lzma),
            other => Err(FormatError::UnknownCompression(other)),
        }
    }

    /// The on-disk compression byte.
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Bzip2 => 1,
            Self::Gzip => 2,
            Self::Lzma => 3,
        }
    }
}

impl std::fmt::Display for CompressionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Bzip2 => "bzip2",
            Self::Gzip => "gzip",
            Self::Lzma => "lzma",
        };
        f.write_str(name)
    }
}

/// Fixed part of the container header
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(big)]
pub struct ContainerHeader {
    /// Raw compression byte
    pub compression: u8,

    /// Length of the payload as stored
    pub length: u32,

    /// Length after decompression, absent for uncompressed payloads
    #[br(if(compression != 0))]
    pub uncompressed_length: Option<u32>,
}

impl ContainerHeader {
    /// Size of the header in bytes.
    pub const fn size(&self) -> usize {
        if self.uncompressed_length.is_some() {
            9
        } else {
            5
        }
    }
}

/// A decoded container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    /// Compression the payload was stored with
    pub compression: CompressionType,
    /// Decompressed payload
    pub data: Vec<u8>,
    /// Version trailer, if present
    pub version: Option<u16>,
}

impl Container {
    /// Wrap uncompressed data.
    pub const fn new(data: Vec<u8>) -> Self {
        Self {
            compression: CompressionType::None,
            data,
            version: None,
        }
    }

    /// Set the compression used by [`Container::encode`].
    #[must_use]
    pub const fn with_compression(mut self, compression: CompressionType) -> Self {
        self.compression = compression;
        self
    }

    /// Set the version trailer.
    #[must_use]
    pub const fn with_version(mut self, version: u16) -> Self {
        self.version = Some(version);
        self
    }

    /// Decode a container and decompress its payload.
    ///
    /// Bzip2 and LZMA payloads are rejected with [`FormatError::Unsupported`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let header_len = if bytes.first().is_some_and(|&c| c != 0) {
            9
        } else {
            5
        };
        if bytes.len() < header_len {
            return Err(FormatError::Truncated {
                position: 0,
                needed: header_len,
                available: bytes.len(),
            });
        }

        let header = ContainerHeader::read(&mut Cursor::new(bytes))?;
        let compression = CompressionType::from_byte(header.compression)?;

        let start = header.size();
        let length = header.length as usize;
        let end = start
            .checked_add(length)
            .filter(|&end| end <= bytes.len())
            .ok_or(FormatError::Truncated {
                position: start,
                needed: length,
                available: bytes.len().saturating_sub(start),
            })?;
        let payload = &bytes[start..end];

        let data = match compression {
            CompressionType::None => payload.to_vec(),
            CompressionType::Gzip => {
                let expected = header.uncompressed_length.unwrap_or_default() as usize;
                decompress_gzip(payload, expected)?
            }
            CompressionType::Bzip2 | CompressionType::Lzma => {
                return Err(FormatError::Unsupported(format!(
                    "{compression} container decompression"
                )));
            }
        };

        let trailer = &bytes[end..];
        let version = (trailer.len() >= 2).then(|| u16::from_be_bytes([trailer[0], trailer[1]]));

        Ok(Self {
            compression,
            data,
            version,
        })
    }

    /// Encode the container, compressing with `self.compression`.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let payload = match self.compression {
            CompressionType::None => self.data.clone(),
            CompressionType::Gzip => {
                let mut encoder = GzEncoder::new(self.data.as_slice(), Compression::default());
                let mut compressed = Vec::new();
                encoder.read_to_end(&mut compressed)?;
                compressed
            }
            CompressionType::Bzip2 | CompressionType::Lzma => {
                return Err(FormatError::Unsupported(format!(
                    "{} container compression",
                    self.compression
                )));
            }
        };

        let header = ContainerHeader {
            compression: self.compression.as_byte(),
            length: payload.len() as u32,
            uncompressed_length: (self.compression != CompressionType::None)
                .then_some(self.data.len() as u32),
        };

        let mut cursor = Cursor::new(Vec::with_capacity(header.size() + payload.len() + 2));
        header.write(&mut cursor)?;
        let mut out = cursor.into_inner();
        out.extend_from_slice(&payload);
        if let Some(version) = self.version {
            out.extend_from_slice(&version.to_be_bytes());
        }
        Ok(out)
    }
}

fn decompress_gzip(payload: &[u8], expected: usize) -> Result<Vec<u8>> {
    if expected > MAX_UNCOMPRESSED_SIZE {
        return Err(FormatError::Decompression(format!(
            "declared size {expected} exceeds limit of {MAX_UNCOMPRESSED_SIZE} bytes"
        )));
    }

    let mut decoder = GzDecoder::new(payload);
    let mut data = Vec::with_capacity(expected);
    decoder
        .read_to_end(&mut data)
        .map_err(|e| FormatError::Decompression(format!("gzip: {e}")))?;

    if data.len() != expected {
        return Err(FormatError::LengthMismatch {
            expected,
            actual: data.len(),
        });
    }
    Ok(data)
}
