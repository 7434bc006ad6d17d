//! On-disk storage for RuneTek5 caches
//!
//! A cache directory holds one data file split into fixed-size sectors and
//! one index file per category:
//!
//! ```text
//! main_file_cache.dat2        sectors
//! main_file_cache.idx0..253   per-category index records
//! main_file_cache.idx255      reference tables (meta category)
//! ```
//!
//! An index record gives a file's size and first sector; each sector header
//! names the next one. [`FileStore`] walks that chain and checks every sector
//! header against the requested file.

pub mod error;
pub mod file_store;
pub mod index;
pub mod sector;
pub mod stream;

pub use error::{Result, StorageError};
pub use file_store::{DATA_FILE_NAME, FileStore, index_file_name};
pub use index::{INDEX_RECORD_SIZE, IndexRecord};
pub use sector::{EXTENDED_FILE_ID_THRESHOLD, SECTOR_SIZE, Sector, sector_payload_capacity};
pub use stream::MappedStream;
