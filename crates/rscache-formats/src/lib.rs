//! File formats for RuneTek5 game caches
//!
#![allow(clippy::cast_possible_wrap)] // Intentional for binary format parsing
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::return_self_not_must_use)] // Builder patterns
#![allow(clippy::use_self)] // Type clarity
//! This crate decodes the layers a stored cache file passes through on its way
//! to a typed value:
//!
//! - **Container**: compression header, payload and optional version trailer
//! - **Archive**: multi-entry payloads split by a chunked size table
//! - **Reference table**: per-category file listing with versions and children
//! - **Master reference table**: one summary per category
//! - **Typed files**: decoders implementing [`CacheFile`], such as
//!   [`enum_file::EnumFile`]
//!
//! Decoders reject structurally invalid input with a [`FormatError`] and never
//! return partially decoded values.

pub mod archive;
/// Big-endian cursor and writer with the cache's variable-length encodings
pub mod buffer;
pub mod container;
/// Key/value enum definitions from the enums category
pub mod enum_file;
pub mod error;
pub mod file;
pub mod master_reference_table;
pub mod reference_table;

pub use container::{CompressionType, Container};
pub use error::{FormatError, Result};
pub use file::{CacheFile, CacheFileInfo, DataCacheFile};
pub use master_reference_table::{MasterEntry, MasterReferenceTable};
pub use reference_table::{ReferenceTable, ReferenceTableEntry};

/// Well-known category ids
pub mod category {
    /// Compiled client scripts
    pub const CLIENT_SCRIPTS: u8 = 12;
    /// Enum definitions, decoded by [`crate::enum_file::EnumFile`]
    pub const ENUMS: u8 = 17;
    /// Music tracks
    pub const MUSIC: u8 = 40;
    /// Meta category holding every reference table
    pub const REFERENCE_TABLES: u8 = 255;
}
