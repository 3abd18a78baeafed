//! Audio library façade
//!
//! Ties tag extraction to the catalog store: `add_file` turns a media file
//! into a saved record, `find` turns a filter into records.

use crate::ingest::IngestStats;
use crate::models::TagRecord;
use crate::query::Filter;
use crate::services::{FileScanner, LoftyTagExtractor, TagExtractor};
use crate::store::{CatalogStore, SaveOutcome};
use af_common::{Error, Result};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default number of files ingested concurrently
pub const DEFAULT_WORKER_COUNT: usize = 5;

/// Catalog of audio files
#[derive(Clone)]
pub struct AudioLibrary {
    store: Arc<dyn CatalogStore>,
    extractor: Arc<dyn TagExtractor>,
    scanner: FileScanner,
    worker_count: usize,
}

impl AudioLibrary {
    /// Library over `store`, reading tags with lofty
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            store,
            extractor: Arc::new(LoftyTagExtractor::new()),
            scanner: FileScanner::default(),
            worker_count: DEFAULT_WORKER_COUNT,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn TagExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_scanner(mut self, scanner: FileScanner) -> Self {
        self.scanner = scanner;
        self
    }

    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count.max(1);
        self
    }

    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.store
    }

    pub fn scanner(&self) -> &FileScanner {
        &self.scanner
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Read the file's tags and save them under `base_path`
    ///
    /// Returns `Ok(None)` without touching the store when `path` is not an
    /// existing regular file. Unreadable tags are not an error: the record is
    /// saved with empty fields and the store skips it.
    pub async fn add_file(&self, path: &Path, base_path: &Path) -> Result<Option<SaveOutcome>> {
        if !path.is_file() {
            debug!(file = %path.display(), "Not a regular file, skipping");
            return Ok(None);
        }

        let record = self.read_record(path, base_path).await?;
        let outcome = self.store.save(&record).await?;

        match outcome {
            SaveOutcome::Saved { song_id } => {
                debug!(file = %path.display(), song_id, "Added to library")
            }
            SaveOutcome::Skipped(missing) => {
                info!(file = %path.display(), missing = %missing, "Not cataloged, missing {}", missing)
            }
        }

        Ok(Some(outcome))
    }

    /// Records matching every term of `filter`
    pub async fn find(&self, filter: &Filter) -> Result<Vec<TagRecord>> {
        let rows = self.store.query(filter).await?;
        Ok(rows.into_iter().map(TagRecord::from).collect())
    }

    /// Scan `root` and add every matching file, `worker_count` at a time
    ///
    /// A failure on one file is logged and counted; the rest still run.
    pub async fn add_directory(&self, root: &Path) -> Result<IngestStats> {
        let files = self.scanner.scan_in_background(root).await?;

        info!(root = %root.display(), files = files.len(), "Adding files to library");

        let mut stats = IngestStats {
            submitted: files.len(),
            ..IngestStats::default()
        };

        let mut results = stream::iter(files)
            .map(|path| async move {
                let result = self.add_file(&path, root).await;
                (path, result)
            })
            .buffer_unordered(self.worker_count);

        while let Some((path, result)) = results.next().await {
            match result {
                Ok(_) => stats.completed += 1,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Failed to add file");
                    stats.failed += 1;
                }
            }
        }

        info!(
            completed = stats.completed,
            failed = stats.failed,
            "Library additions finished"
        );
        Ok(stats)
    }

    async fn read_record(&self, path: &Path, base_path: &Path) -> Result<TagRecord> {
        let extractor = Arc::clone(&self.extractor);
        let file: PathBuf = path.to_path_buf();
        let extracted = tokio::task::spawn_blocking(move || extractor.extract(&file))
            .await
            .map_err(|e| Error::Internal(format!("Tag extraction task failed: {}", e)))?;

        let path_text = path.to_string_lossy().into_owned();
        let base_text = base_path.to_string_lossy().into_owned();

        Ok(match extracted {
            Ok(tags) => TagRecord::from_tags(tags, path_text, base_text),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Could not read tags");
                TagRecord::for_path(path_text, base_text)
            }
        })
    }
}
