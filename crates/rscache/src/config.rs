//! Configuration for cache access and extraction

use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

/// Configuration for a [`crate::Cache`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Root of the extraction tree; extraction fails without one
    pub output_directory: Option<PathBuf>,

    /// Directory holding `main_file_cache.*`
    pub cache_directory: Option<PathBuf>,

    /// Files extracted at the same time in batch operations
    pub max_concurrent_extractions: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            output_directory: Some(PathBuf::from("output")),
            cache_directory: None,
            max_concurrent_extractions: std::thread::available_parallelism()
                .map_or(4, NonZeroUsize::get),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| CacheError::Config(e.to_string()))
    }

    /// Load a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| CacheError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Set the extraction root
    #[must_use]
    pub fn with_output_directory<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_directory = Some(path.as_ref().to_path_buf());
        self
    }

    /// Remove the extraction root, disabling extraction
    #[must_use]
    pub fn without_output_directory(mut self) -> Self {
        self.output_directory = None;
        self
    }

    #[must_use]
    pub fn with_cache_directory<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.cache_directory = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the batch concurrency; zero is raised to one
    #[must_use]
    pub fn with_max_concurrent_extractions(mut self, count: usize) -> Self {
        self.max_concurrent_extractions = count.max(1);
        self
    }

    /// The extraction root, or [`CacheError::Config`] if none is set.
    pub fn require_output_directory(&self) -> Result<&Path> {
        self.output_directory
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| {
                CacheError::Config("output directory must be set before extraction".into())
            })
    }
}
