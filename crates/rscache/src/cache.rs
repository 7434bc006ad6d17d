//! File access and extraction on top of a [`CacheSource`]

use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::extension::{ExtendableExtensionGuesser, ExtensionGuesser};
use crate::progress::{ExtractProgress, ProgressEvent};
use crate::source::CacheSource;
use futures::stream::{self, StreamExt};
use regex::Regex;
use rscache_formats::{CacheFile, CacheFileInfo, DataCacheFile};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Result of extracting one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// Paths of the entries written; empty when every entry was empty
    Extracted(Vec<PathBuf>),
    /// Entries already existed and overwriting was not requested
    AlreadyExtracted,
}

/// Per-file results of a batch extraction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// `(category, file id)` of files that were written
    pub extracted: Vec<(u8, u32)>,
    /// Files left alone because they were already extracted
    pub already_extracted: Vec<(u8, u32)>,
    /// Files that could not be found
    pub skipped: Vec<(u8, u32)>,
    /// Categories whose file list could not be obtained
    pub skipped_categories: Vec<u8>,
    /// Entry files written across the batch
    pub entries_written: usize,
}

impl BatchReport {
    fn merge(&mut self, other: Self) {
        self.extracted.extend(other.extracted);
        self.already_extracted.extend(other.already_extracted);
        self.skipped.extend(other.skipped);
        self.skipped_categories.extend(other.skipped_categories);
        self.entries_written += other.entries_written;
    }

    /// Number of files processed, skipped or not.
    pub fn file_count(&self) -> usize {
        self.extracted.len() + self.already_extracted.len() + self.skipped.len()
    }
}

/// Outcome of one item in a batch
enum ItemOutcome {
    Done(ExtractOutcome),
    NotFound,
}

/// Cache front end: typed file access and idempotent extraction into
/// `{output}/extracted/{category}/{file id}[-{entry id}][.{extension}]`.
pub struct Cache<S> {
    source: S,
    config: CacheConfig,
    guesser: Arc<dyn ExtensionGuesser>,
}

impl<S: std::fmt::Debug> std::fmt::Debug for Cache<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("source", &self.source)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: CacheSource> Cache<S> {
    pub fn new(source: S, config: CacheConfig) -> Self {
        Self {
            source,
            config,
            guesser: Arc::new(ExtendableExtensionGuesser::default()),
        }
    }

    /// Replace the extension guesser used during extraction.
    #[must_use]
    pub fn with_extension_guesser(mut self, guesser: impl ExtensionGuesser + 'static) -> Self {
        self.guesser = Arc::new(guesser);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub async fn categories(&self) -> Result<Vec<u8>> {
        self.source.categories().await
    }

    pub async fn file_ids(&self, category: u8) -> Result<Vec<u32>> {
        self.source.file_ids(category).await
    }

    /// Fetch a file, or one of its entries when `entry_id` is given.
    pub async fn get_file(
        &self,
        category: u8,
        file_id: u32,
        entry_id: Option<usize>,
    ) -> Result<DataCacheFile> {
        let mut file = self.source.fetch_file(category, file_id).await?;
        file.info.category = category;
        file.info.file_id = file_id;

        match entry_id {
            Some(entry_id) => Ok(file.select_entry(entry_id)?),
            None => Ok(file),
        }
    }

    /// Fetch a file and decode it as `T`.
    ///
    /// `T = DataCacheFile` returns the raw file unchanged.
    pub async fn get_typed<T: CacheFile>(
        &self,
        category: u8,
        file_id: u32,
        entry_id: Option<usize>,
    ) -> Result<T> {
        let file = self.get_file(category, file_id, entry_id).await?;
        Ok(T::from_data_file(file)?)
    }

    pub async fn get_file_info(&self, category: u8, file_id: u32) -> Result<CacheFileInfo> {
        self.source.file_info(category, file_id).await
    }

    fn category_dir(&self, category: u8) -> Result<PathBuf> {
        Ok(self
            .config
            .require_output_directory()?
            .join("extracted")
            .join(category.to_string()))
    }

    /// The extraction directory of `category`, if it exists.
    pub async fn extracted_category_path(&self, category: u8) -> Result<Option<PathBuf>> {
        let dir = self.category_dir(category)?;
        Ok(tokio::fs::try_exists(&dir).await?.then_some(dir))
    }

    /// Paths of the entries already extracted for `file_id`.
    ///
    /// The output tree is the only record of what has been extracted; this
    /// lists the category directory and keeps names of the form
    /// `{file_id}[-{entry}][.{ext}]`.
    pub async fn extracted_entry_paths(&self, category: u8, file_id: u32) -> Result<Vec<PathBuf>> {
        let dir = self.category_dir(category)?;
        let pattern = Regex::new(&format!(r"^{file_id}(-\d+)?(\..+)?$"))?;

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str()
                && pattern.is_match(name)
            {
                paths.push(entry.path());
            }
        }
        paths.sort();
        Ok(paths)
    }

    fn entry_path(dir: &Path, file_id: u32, entry_id: usize, extension: Option<&str>) -> PathBuf {
        let mut name = file_id.to_string();
        if entry_id > 0 {
            name.push_str(&format!("-{entry_id}"));
        }
        if let Some(extension) = extension {
            name.push('.');
            name.push_str(extension);
        }
        dir.join(name)
    }

    /// Extract every non-empty entry of a file.
    ///
    /// Without `overwrite`, a file with any extracted entry is left alone.
    /// With it, the file is fetched first and only then are the old entries
    /// removed, so a failed fetch keeps the previous output.
    pub async fn extract_file(
        &self,
        category: u8,
        file_id: u32,
        overwrite: bool,
    ) -> Result<ExtractOutcome> {
        let dir = self.category_dir(category)?;
        let existing = self.extracted_entry_paths(category, file_id).await?;

        if !overwrite && !existing.is_empty() {
            info!(
                "Skipped extracting {}/{} because it is already extracted.",
                category, file_id
            );
            return Ok(ExtractOutcome::AlreadyExtracted);
        }

        let file = self.get_file(category, file_id, None).await?;

        for path in &existing {
            tokio::fs::remove_file(path).await?;
            debug!("Removed stale entry {:?}", path);
        }
        tokio::fs::create_dir_all(&dir).await?;

        let mut written = Vec::new();
        for (entry_id, data) in file.entries.iter().enumerate() {
            if data.is_empty() {
                continue;
            }
            let extension = self.guesser.guess_extension(data);
            let path = Self::entry_path(&dir, file_id, entry_id, extension.as_deref());
            tokio::fs::write(&path, data).await?;
            written.push(path);
        }

        if written.is_empty() {
            info!(
                "Did not extract {}/{} because it was empty.",
                category, file_id
            );
        } else {
            info!(
                "Extracted {}/{} ({} entries).",
                category,
                file_id,
                written.len()
            );
        }
        Ok(ExtractOutcome::Extracted(written))
    }

    async fn extract_item(
        &self,
        category: u8,
        file_id: u32,
        overwrite: bool,
    ) -> Result<ItemOutcome> {
        match self.extract_file(category, file_id, overwrite).await {
            Ok(outcome) => Ok(ItemOutcome::Done(outcome)),
            Err(e) if e.is_not_found() => {
                info!("Skipped {}/{} because it was not found.", category, file_id);
                Ok(ItemOutcome::NotFound)
            }
            Err(e) => Err(e),
        }
    }

    /// Extract `file_ids` from `category`, at most
    /// `max_concurrent_extractions` at a time.
    ///
    /// Missing files are skipped and reported; any other error stops the
    /// batch and is returned as is.
    pub async fn extract_files(
        &self,
        category: u8,
        file_ids: &[u32],
        overwrite: bool,
        progress: Option<&ExtractProgress>,
    ) -> Result<BatchReport> {
        // Fail before queueing anything when extraction cannot work at all
        self.config.require_output_directory()?;
        if let Some(progress) = progress {
            progress.add_total(file_ids.len() as u64);
        }

        let mut results = stream::iter(file_ids.iter().copied())
            .map(|file_id| async move {
                let result = self.extract_item(category, file_id, overwrite).await;
                (file_id, result)
            })
            .buffer_unordered(self.config.max_concurrent_extractions.max(1));

        let mut report = BatchReport::default();
        while let Some((file_id, result)) = results.next().await {
            let event = match result? {
                ItemOutcome::Done(ExtractOutcome::Extracted(paths)) => {
                    report.entries_written += paths.len();
                    report.extracted.push((category, file_id));
                    ProgressEvent::Extracted {
                        category,
                        file_id,
                        entries: paths.len(),
                    }
                }
                ItemOutcome::Done(ExtractOutcome::AlreadyExtracted) => {
                    report.already_extracted.push((category, file_id));
                    ProgressEvent::AlreadyExtracted { category, file_id }
                }
                ItemOutcome::NotFound => {
                    report.skipped.push((category, file_id));
                    ProgressEvent::Skipped { category, file_id }
                }
            };
            if let Some(progress) = progress {
                progress.report(event);
            }
        }

        debug!(
            "Category {}: {} extracted, {} already extracted, {} skipped",
            category,
            report.extracted.len(),
            report.already_extracted.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Extract every file the source lists for `category`.
    pub async fn extract_category(
        &self,
        category: u8,
        overwrite: bool,
        progress: Option<&ExtractProgress>,
    ) -> Result<BatchReport> {
        let file_ids = self.source.file_ids(category).await?;
        self.extract_files(category, &file_ids, overwrite, progress)
            .await
    }

    /// Extract several categories in turn.
    ///
    /// When more than one category is given, a category whose file list
    /// cannot be found is skipped; a single category propagates the error.
    pub async fn extract_categories(
        &self,
        categories: &[u8],
        overwrite: bool,
        progress: Option<&ExtractProgress>,
    ) -> Result<BatchReport> {
        let mut report = BatchReport::default();
        for &category in categories {
            match self.extract_category(category, overwrite, progress).await {
                Ok(category_report) => report.merge(category_report),
                Err(e) if categories.len() > 1 && e.is_not_found() => {
                    info!(
                        "Skipped extracting category {} because its file list was not found.",
                        category
                    );
                    report.skipped_categories.push(category);
                    if let Some(progress) = progress {
                        progress.report(ProgressEvent::CategorySkipped { category });
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }

    /// Extract every category the source lists.
    pub async fn extract_all(
        &self,
        overwrite: bool,
        progress: Option<&ExtractProgress>,
    ) -> Result<BatchReport> {
        let categories = self.source.categories().await?;
        if categories.is_empty() {
            return Err(CacheError::NotFound("no categories to extract".into()));
        }
        self.extract_categories(&categories, overwrite, progress)
            .await
    }
}
