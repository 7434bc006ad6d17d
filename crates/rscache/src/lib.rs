//! Read, decode and extract files from RuneTek5 game caches
//!
//! [`Cache`] is the entry point. It reads through a [`CacheSource`]: either a
//! [`LocalCache`] over a cache directory, or a
//! [`Downloader`](rscache_protocol::Downloader) fed by a transport.
//!
//! ```rust,no_run
//! use rscache::{Cache, CacheConfig, LocalCache};
//! use rscache::formats::enum_file::EnumFile;
//!
//! # async fn example() -> rscache::Result<()> {
//! let source = LocalCache::open("/path/to/cache")?;
//! let cache = Cache::new(source, CacheConfig::new().with_output_directory("out"));
//!
//! let enum_file: EnumFile = cache.get_typed(17, 5, Some(0)).await?;
//! println!("{} values", enum_file.len());
//!
//! let report = cache.extract_category(40, false, None).await?;
//! println!("{} files extracted", report.extracted.len());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod extension;
pub mod local;
pub mod progress;
pub mod source;

pub use cache::{BatchReport, Cache, ExtractOutcome};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use extension::{ExtendableExtensionGuesser, ExtensionGuesser};
pub use local::LocalCache;
pub use progress::{ExtractProgress, ProgressEvent};
pub use source::CacheSource;

pub use rscache_formats as formats;
pub use rscache_protocol as protocol;
pub use rscache_storage as storage;
