//! Delivery of request bytes
//!
//! The protocol does not prescribe how bytes reach a [`FileRequest`]; a
//! transport receives submitted requests and feeds them with
//! [`FileRequest::write`] and [`FileRequest::complete`].

use crate::error::{ProtocolError, Result};
use crate::request::FileRequest;
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{trace, warn};

/// Something that resolves file requests
#[async_trait]
pub trait Transport: Send + Sync {
    /// Start delivering `request`.
    ///
    /// Returning `Ok` means the request will be completed later; a file the
    /// remote does not have fails with [`ProtocolError::NotFound`].
    async fn submit(&self, request: Arc<FileRequest>) -> Result<()>;
}

/// Serves stored containers from memory, delivering them in chunks from a
/// spawned task.
#[derive(Debug)]
pub struct MemoryTransport {
    files: DashMap<(u8, u32), Bytes>,
    chunk_size: usize,
    submissions: AtomicUsize,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            files: DashMap::new(),
            chunk_size: 512,
            submissions: AtomicUsize::new(0),
        }
    }

    /// Deliver responses in pieces of `chunk_size` bytes.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Serve `data` for `category`/`file_id`.
    pub fn insert(&self, category: u8, file_id: u32, data: impl Into<Bytes>) {
        self.files.insert((category, file_id), data.into());
    }

    pub fn remove(&self, category: u8, file_id: u32) -> Option<Bytes> {
        self.files
            .remove(&(category, file_id))
            .map(|(_, data)| data)
    }

    /// Number of requests submitted so far.
    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn submit(&self, request: Arc<FileRequest>) -> Result<()> {
        self.submissions.fetch_add(1, Ordering::Relaxed);

        let key = (request.category(), request.file_id());
        let data = self
            .files
            .get(&key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                ProtocolError::NotFound(format!("file {} in category {}", key.1, key.0))
            })?;

        let chunk_size = self.chunk_size;
        tokio::spawn(async move {
            for chunk in data.chunks(chunk_size) {
                if let Err(e) = request.write(chunk) {
                    warn!("Dropping delivery: {}", e);
                    return;
                }
                tokio::task::yield_now().await;
            }
            trace!(
                "Delivered {} bytes for {}/{}",
                data.len(),
                request.category(),
                request.file_id()
            );
            if let Err(e) = request.complete() {
                warn!("Dropping delivery: {}", e);
            }
        });
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_chunked_delivery() {
        let transport = MemoryTransport::new().with_chunk_size(3);
        transport.insert(5, 1, Bytes::from_static(b"0123456789"));

        let request = Arc::new(FileRequest::new(5, 1));
        transport.submit(Arc::clone(&request)).await.unwrap();
        assert_eq!(
            request.wait_for_completion().await.unwrap(),
            Bytes::from_static(b"0123456789")
        );
        assert_eq!(transport.submissions(), 1);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let transport = MemoryTransport::new();
        let err = transport
            .submit(Arc::new(FileRequest::new(5, 1)))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(transport.submissions(), 1);
    }
}
