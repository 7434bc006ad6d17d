//! Request/completion protocol for remote RuneTek5 caches
//!
//! A [`FileRequest`] is created per `(category, file id)` lookup and handed to
//! a [`Transport`], which appends bytes as they arrive and completes it once.
//! The [`Downloader`] builds on that to fetch, decompress and split files,
//! keeping decoded reference tables for its lifetime.
//!
//! ```rust,no_run
//! use rscache_protocol::{Downloader, MemoryTransport};
//! use std::sync::Arc;
//!
//! # async fn example() -> rscache_protocol::Result<()> {
//! let transport = Arc::new(MemoryTransport::new());
//! let downloader = Downloader::new(transport);
//! let enums = downloader.get_reference_table(17).await?;
//! println!("{} enum files", enums.file_ids().len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod downloader;
pub mod error;
pub mod request;
pub mod transport;

pub use config::DownloaderConfig;
pub use downloader::{Downloader, MASTER_TABLE_FILE_ID};
pub use error::{ProtocolError, Result};
pub use request::FileRequest;
pub use transport::{MemoryTransport, Transport};
