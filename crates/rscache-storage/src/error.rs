//! Error types for cache storage operations

use rscache_formats::FormatError;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Category {0} has no index file")]
    InvalidCategory(u8),

    #[error("Corrupt sector chain for {category}/{file_id} at chunk {chunk}: {reason}")]
    CorruptChain {
        category: u8,
        file_id: u32,
        chunk: u32,
        reason: String,
    },

    #[error("Malformed index record: {0}")]
    MalformedRecord(String),

    #[error("Malformed sector: {0}")]
    MalformedSector(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Format error: {0}")]
    Format(#[from] FormatError),
}

impl StorageError {
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
