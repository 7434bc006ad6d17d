//! Error types for cache access and extraction

use rscache_formats::FormatError;
use rscache_protocol::ProtocolError;
use rscache_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid entry pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CacheError {
    /// Whether the error means a category, file or record does not exist,
    /// looking through wrapped storage and protocol errors.
    pub const fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Storage(e) => e.is_not_found() || matches!(e, StorageError::InvalidCategory(_)),
            Self::Protocol(e) => e.is_not_found(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_through_wrappers() {
        assert!(CacheError::NotFound("x".into()).is_not_found());
        assert!(CacheError::from(StorageError::NotFound("x".into())).is_not_found());
        assert!(CacheError::from(StorageError::InvalidCategory(3)).is_not_found());
        assert!(CacheError::from(ProtocolError::NotFound("x".into())).is_not_found());

        assert!(!CacheError::Config("x".into()).is_not_found());
        assert!(!CacheError::from(FormatError::IncompleteDefinition("values")).is_not_found());
        let corrupt = StorageError::CorruptChain {
            category: 1,
            file_id: 2,
            chunk: 0,
            reason: "x".into(),
        };
        assert!(!CacheError::from(corrupt).is_not_found());
        // Only cache lookups count, not missing files on the local disk
        let io = std::io::Error::from(std::io::ErrorKind::NotFound);
        assert!(!CacheError::from(io).is_not_found());
    }
}
