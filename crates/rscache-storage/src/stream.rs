//! Read-only memory-mapped files
//!
//! Every read is a positioned slice of the mapping, so a stream can be
//! shared between threads without a cursor or lock.

use crate::error::Result;
use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A file mapped into memory for positioned reads
#[derive(Debug)]
pub struct MappedStream {
    path: PathBuf,
    /// `None` for zero-length files, which cannot be mapped
    mmap: Option<Mmap>,
}

impl MappedStream {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();

        // SAFETY: the cache is opened read-only and the mapping lives no
        // longer than this stream. Concurrent modification of the files by
        // another process is not supported.
        #[allow(unsafe_code)]
        let mmap = if size > 0 {
            Some(unsafe { MmapOptions::new().map(&file)? })
        } else {
            None
        };

        debug!("Mapped {:?} ({} bytes)", path, size);
        Ok(Self {
            path: path.to_path_buf(),
            mmap,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> u64 {
        self.bytes().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }

    fn bytes(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or_default()
    }

    /// Exactly `len` bytes at `offset`, or `None` if they are not all present.
    pub fn read_at(&self, offset: u64, len: usize) -> Option<&[u8]> {
        let start = usize::try_from(offset).ok()?;
        let end = start.checked_add(len)?;
        self.bytes().get(start..end)
    }

    /// Up to `len` bytes at `offset`; `None` if `offset` is at or past the end.
    pub fn read_up_to(&self, offset: u64, len: usize) -> Option<&[u8]> {
        let bytes = self.bytes();
        let start = usize::try_from(offset).ok()?;
        if start >= bytes.len() {
            return None;
        }
        let end = start.saturating_add(len).min(bytes.len());
        Some(&bytes[start..end])
    }
}
