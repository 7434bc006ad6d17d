//! Error types for cache format decoding

use thiserror::Error;

/// Errors raised while decoding or encoding cache formats.
///
/// Every decoder in this crate rejects structurally invalid input with one of
/// these variants instead of returning a partial result.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Input ended before a complete field could be read
    #[error("Truncated data at offset {position}: needed {needed} bytes, {available} available")]
    Truncated {
        /// Offset at which the read was attempted
        position: usize,
        /// Number of bytes the field required
        needed: usize,
        /// Number of bytes left in the input
        available: usize,
    },

    /// An opcode outside the recognized set was encountered
    #[error("Unrecognized opcode {opcode} at offset {position}")]
    UnrecognizedOpcode {
        /// The opcode value
        opcode: u8,
        /// Offset of the opcode byte
        position: usize,
    },

    /// Decoding finished without a mandatory field being populated
    #[error("Incomplete definition: missing {0}")]
    IncompleteDefinition(&'static str),

    /// Format or protocol version this crate does not understand
    #[error("Unsupported format version: {0}")]
    UnsupportedFormat(u8),

    /// Unknown container compression byte
    #[error("Unknown compression type: {0}")]
    UnknownCompression(u8),

    /// Payload could not be decompressed
    #[error("Decompression failed: {0}")]
    Decompression(String),

    /// A declared length disagrees with the actual data
    #[error("Length mismatch: expected {expected} bytes, got {actual} bytes")]
    LengthMismatch {
        /// Declared length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// An archive size table produced a negative entry size
    #[error("Invalid entry size in archive table: {0}")]
    InvalidEntrySize(i32),

    /// Requested entry does not exist in the file
    #[error("Entry {entry_id} out of range (file has {entry_count} entries)")]
    OutOfRange {
        /// Requested entry id
        entry_id: usize,
        /// Number of entries in the file
        entry_count: usize,
    },

    /// Operation deliberately not implemented
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Binary parsing error reported by binrw
    #[error("Binary parsing error: {0}")]
    BinRead(String),

    /// IO error while reading or writing an in-memory buffer
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<binrw::Error> for FormatError {
    fn from(e: binrw::Error) -> Self {
        Self::BinRead(e.to_string())
    }
}

impl FormatError {
    /// Returns true for errors caused by malformed input bytes.
    pub const fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Self::Truncated { .. }
                | Self::UnrecognizedOpcode { .. }
                | Self::IncompleteDefinition(_)
                | Self::UnsupportedFormat(_)
                | Self::UnknownCompression(_)
                | Self::Decompression(_)
                | Self::LengthMismatch { .. }
                | Self::InvalidEntrySize(_)
                | Self::BinRead(_)
        )
    }
}

/// Result type alias for format operations
pub type Result<T> = std::result::Result<T, FormatError>;
