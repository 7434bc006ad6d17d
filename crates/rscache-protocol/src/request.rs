//! One in-flight file download
//!
//! A transport appends bytes with [`FileRequest::write`] as they arrive and
//! calls [`FileRequest::complete`] once. Any number of tasks may wait for the
//! result, before or after completion.

use crate::error::{ProtocolError, Result};
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use rscache_formats::CacheFileInfo;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug)]
pub struct FileRequest {
    info: CacheFileInfo,
    buffer: Mutex<BytesMut>,
    /// Written once, by `complete`
    completion: watch::Sender<Option<Bytes>>,
}

impl FileRequest {
    pub fn new(category: u8, file_id: u32) -> Self {
        Self::with_info(CacheFileInfo::new(category, file_id))
    }

    pub fn with_info(info: CacheFileInfo) -> Self {
        let (completion, _) = watch::channel(None);
        Self {
            info,
            buffer: Mutex::new(BytesMut::new()),
            completion,
        }
    }

    pub fn category(&self) -> u8 {
        self.info.category
    }

    pub fn file_id(&self) -> u32 {
        self.info.file_id
    }

    pub fn info(&self) -> &CacheFileInfo {
        &self.info
    }

    pub fn is_completed(&self) -> bool {
        self.completion.borrow().is_some()
    }

    fn already_completed(&self) -> ProtocolError {
        ProtocolError::AlreadyCompleted {
            category: self.info.category,
            file_id: self.info.file_id,
        }
    }

    /// Append received bytes.
    pub fn write(&self, data: &[u8]) -> Result<()> {
        let mut buffer = self.buffer.lock();
        if self.is_completed() {
            return Err(self.already_completed());
        }
        buffer.extend_from_slice(data);
        Ok(())
    }

    /// Resolve the request with everything written so far.
    ///
    /// Fails with [`ProtocolError::AlreadyCompleted`] on a second call.
    pub fn complete(&self) -> Result<Bytes> {
        let mut buffer = self.buffer.lock();
        if self.is_completed() {
            return Err(self.already_completed());
        }
        let data = buffer.split().freeze();
        self.completion.send_replace(Some(data.clone()));
        Ok(data)
    }

    /// Wait for [`FileRequest::complete`] and return the resolved bytes.
    pub async fn wait_for_completion(&self) -> Result<Bytes> {
        let mut receiver = self.completion.subscribe();
        let resolved = receiver
            .wait_for(Option::is_some)
            .await
            .map_err(|_| ProtocolError::Cancelled)?;
        resolved.clone().ok_or(ProtocolError::Cancelled)
    }

    /// [`FileRequest::wait_for_completion`], giving up after `timeout`.
    pub async fn wait_for_completion_timeout(&self, timeout: Duration) -> Result<Bytes> {
        tokio::time::timeout(timeout, self.wait_for_completion())
            .await
            .map_err(|_| ProtocolError::Timeout(timeout))?
    }
}
