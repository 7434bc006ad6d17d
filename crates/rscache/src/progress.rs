//! Progress reporting for batch extraction

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

/// Something that happened during a batch extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A file was written, with the number of non-empty entries
    Extracted {
        category: u8,
        file_id: u32,
        entries: usize,
    },
    /// A file was left alone because its entries already exist
    AlreadyExtracted { category: u8, file_id: u32 },
    /// A file could not be found and was skipped
    Skipped { category: u8, file_id: u32 },
    /// A category's file list could not be obtained
    CategorySkipped { category: u8 },
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extracted {
                category,
                file_id,
                entries,
            } => write!(f, "Extracted {category}/{file_id} ({entries} entries)."),
            Self::AlreadyExtracted { category, file_id } => write!(
                f,
                "Skipped {category}/{file_id} because it is already extracted."
            ),
            Self::Skipped { category, file_id } => {
                write!(f, "Skipped {category}/{file_id} because it was not found.")
            }
            Self::CategorySkipped { category } => write!(
                f,
                "Skipped category {category} because its file list could not be obtained."
            ),
        }
    }
}

/// Shared counters plus an optional event stream.
///
/// Safe to update from concurrent extraction tasks. `total` grows as batches
/// are queued; `processed` counts every finished item, skipped or not.
#[derive(Debug, Default)]
pub struct ExtractProgress {
    total: AtomicU64,
    processed: AtomicU64,
    skipped: AtomicU64,
    events: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ExtractProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Progress that also sends every event to the returned receiver.
    pub fn with_events() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let progress = Self {
            events: Some(sender),
            ..Self::default()
        };
        (progress, receiver)
    }

    pub fn add_total(&self, count: u64) {
        self.total.fetch_add(count, Ordering::Relaxed);
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Record one finished item.
    pub fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::CategorySkipped { .. } => {}
            ProgressEvent::Skipped { .. } => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
                self.processed.fetch_add(1, Ordering::Relaxed);
            }
            ProgressEvent::Extracted { .. } | ProgressEvent::AlreadyExtracted { .. } => {
                self.processed.fetch_add(1, Ordering::Relaxed);
            }
        }
        if let Some(events) = &self.events {
            // A dropped receiver only means nobody is listening
            let _ = events.send(event);
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_counters_and_events() {
        let (progress, mut events) = ExtractProgress::with_events();
        progress.add_total(3);
        progress.report(ProgressEvent::Extracted {
            category: 1,
            file_id: 1,
            entries: 2,
        });
        progress.report(ProgressEvent::Skipped {
            category: 1,
            file_id: 2,
        });
        progress.report(ProgressEvent::CategorySkipped { category: 4 });

        assert_eq!(progress.total(), 3);
        assert_eq!(progress.processed(), 2);
        assert_eq!(progress.skipped(), 1);

        let first = events.recv().await.unwrap();
        assert_eq!(first.to_string(), "Extracted 1/1 (2 entries).");
        assert_eq!(
            events.recv().await.unwrap().to_string(),
            "Skipped 1/2 because it was not found."
        );
    }

    #[test]
    fn test_dropped_receiver_is_ignored() {
        let (progress, events) = ExtractProgress::with_events();
        drop(events);
        progress.report(ProgressEvent::AlreadyExtracted {
            category: 0,
            file_id: 0,
        });
        assert_eq!(progress.processed(), 1);
    }
}
