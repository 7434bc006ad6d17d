//! Error types for protocol operations

use rscache_formats::FormatError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Request for file {file_id} in category {category} was already completed")]
    AlreadyCompleted { category: u8, file_id: u32 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Request was dropped before completion")]
    Cancelled,

    #[error("Format error: {0}")]
    Format(#[from] FormatError),
}

impl ProtocolError {
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
