//! Ingestion: worker pool and queue messages

pub mod messages;
pub mod pool;

pub use messages::{rename_file, MessageHandler, QueueMessage, ADD_FILE_QUEUE, RENAME_QUEUE};
pub use pool::{IngestPool, IngestStats, JobHandler};

use crate::services::FileScanner;
use af_common::Result;
use std::path::Path;
use tracing::info;

/// Scan `root` and queue an add-file message for every match
///
/// Returns the number of messages queued.
pub async fn submit_directory(
    pool: &IngestPool<QueueMessage>,
    scanner: &FileScanner,
    root: &Path,
) -> Result<usize> {
    let files = scanner.scan_in_background(root).await?;

    info!(root = %root.display(), files = files.len(), "Queueing library additions");

    let count = files.len();
    for path in files {
        pool.submit(QueueMessage::AddFile {
            path,
            base_path: root.to_path_buf(),
        })
        .await?;
    }
    Ok(count)
}
