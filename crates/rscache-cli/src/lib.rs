//! Library side of the `rsct` command-line tool.
//!
//! Argument types live here so the command handlers can be driven from
//! tests without spawning the binary.

pub mod commands;

pub use crate::commands::{
    enum_file::handle as handle_enum, extract::handle as handle_extract,
    info::handle as handle_info,
};

use anyhow::Context;
use clap::Args;
use rscache::{CacheConfig, LocalCache};
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Directory holding main_file_cache.dat2 and its index files
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Directory holding main_file_cache.dat2 and its index files
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Root of the extraction tree
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Categories to extract (default: all)
    #[arg(short, long = "category", num_args = 1..)]
    pub categories: Vec<u8>,

    /// File ids to extract; requires exactly one category
    #[arg(short, long = "file", num_args = 1.., requires = "categories")]
    pub files: Vec<u32>,

    /// Replace files that were already extracted
    #[arg(long)]
    pub overwrite: bool,

    /// Files extracted at the same time
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Args, Debug)]
pub struct EnumArgs {
    /// Directory holding main_file_cache.dat2 and its index files
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Enum archive id
    #[arg(short, long)]
    pub file: u32,

    /// Entry within the archive
    #[arg(short, long, default_value_t = 0)]
    pub entry: usize,
}

/// Load the configuration file, or the defaults when none is given.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<CacheConfig> {
    match path {
        Some(path) => CacheConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(CacheConfig::default()),
    }
}

/// Open the cache named on the command line, falling back to the one in
/// the configuration.
pub fn open_cache(cache_dir: Option<&Path>, config: &CacheConfig) -> anyhow::Result<LocalCache> {
    let directory = cache_dir
        .or(config.cache_directory.as_deref())
        .context("No cache directory given; pass --cache-dir or set cache_directory")?;
    LocalCache::open(directory)
        .with_context(|| format!("Failed to open cache at {}", directory.display()))
}
