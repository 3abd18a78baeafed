//! Queue message shapes and their handlers
//!
//! Two queues feed the catalog:
//! - `/audiofile/library_additions` carries `[path, basePath]`
//! - `/audiofile/file_renames` carries `[recordFields, pattern]`
//!
//! Payloads are JSON arrays. The broker connection itself lives outside this
//! crate; a consumer hands each payload to `MessageHandler::dispatch`.

use super::pool::JobHandler;
use crate::library::AudioLibrary;
use crate::models::TagRecord;
use crate::pattern::PathTemplate;
use af_common::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Queue receiving files to add to the catalog
pub const ADD_FILE_QUEUE: &str = "/audiofile/library_additions";
/// Queue receiving files to move to a templated path
pub const RENAME_QUEUE: &str = "/audiofile/file_renames";

/// Decoded queue message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueMessage {
    AddFile { path: PathBuf, base_path: PathBuf },
    Rename { record: TagRecord, pattern: String },
}

impl QueueMessage {
    /// Queue this message travels on
    pub fn queue(&self) -> &'static str {
        match self {
            QueueMessage::AddFile { .. } => ADD_FILE_QUEUE,
            QueueMessage::Rename { .. } => RENAME_QUEUE,
        }
    }

    /// Decode a payload received on `queue`
    pub fn decode(queue: &str, payload: &str) -> Result<Self> {
        match queue {
            ADD_FILE_QUEUE => {
                let (path, base_path): (PathBuf, PathBuf) = serde_json::from_str(payload)
                    .map_err(|e| Error::InvalidMessage(format!("{}: {}", queue, e)))?;
                Ok(QueueMessage::AddFile { path, base_path })
            }
            RENAME_QUEUE => {
                let (record, pattern): (TagRecord, String) = serde_json::from_str(payload)
                    .map_err(|e| Error::InvalidMessage(format!("{}: {}", queue, e)))?;
                Ok(QueueMessage::Rename { record, pattern })
            }
            other => Err(Error::InvalidMessage(format!("unknown queue {}", other))),
        }
    }

    /// JSON payload for this message
    pub fn encode(&self) -> Result<String> {
        let payload = match self {
            QueueMessage::AddFile { path, base_path } => serde_json::to_string(&(path, base_path)),
            QueueMessage::Rename { record, pattern } => serde_json::to_string(&(record, pattern)),
        };
        payload.map_err(|e| Error::InvalidMessage(e.to_string()))
    }
}

/// Move `record`'s file to the path `template` renders for it
///
/// Missing parent directories are created. An existing file at the
/// destination is never replaced: the rename fails with
/// `ErrorKind::AlreadyExists` instead. With `dry_run` nothing is touched and
/// the destination is only reported.
pub async fn rename_file(record: &TagRecord, template: &PathTemplate, dry_run: bool) -> Result<PathBuf> {
    if record.path.is_empty() {
        return Err(Error::InvalidMessage(
            "rename record carries no file path".to_string(),
        ));
    }

    let source = Path::new(&record.path);
    let destination = template.render_within(record)?;

    if dry_run {
        info!(from = %source.display(), to = %destination.display(), "Would rename");
        return Ok(destination);
    }

    if tokio::fs::try_exists(&destination).await? {
        if same_file(source, &destination).await {
            debug!(file = %source.display(), "Already at destination");
            return Ok(destination);
        }
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!(
                "refusing to rename {} over existing {}",
                source.display(),
                destination.display()
            ),
        )));
    }

    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::rename(source, &destination).await?;

    info!(from = %source.display(), to = %destination.display(), "Renamed");
    Ok(destination)
}

async fn same_file(a: &Path, b: &Path) -> bool {
    match (tokio::fs::canonicalize(a).await, tokio::fs::canonicalize(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Consumer side of both queues
#[derive(Clone)]
pub struct MessageHandler {
    library: AudioLibrary,
    dry_run: bool,
}

impl MessageHandler {
    pub fn new(library: AudioLibrary) -> Self {
        Self {
            library,
            dry_run: false,
        }
    }

    /// Report renames without moving files
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn library(&self) -> &AudioLibrary {
        &self.library
    }

    /// Act on one decoded message
    pub async fn handle(&self, message: QueueMessage) -> Result<()> {
        match message {
            QueueMessage::AddFile { path, base_path } => {
                self.library.add_file(&path, &base_path).await?;
                Ok(())
            }
            QueueMessage::Rename { record, pattern } => {
                let template = PathTemplate::compile(&pattern)?;
                rename_file(&record, &template, self.dry_run).await?;
                Ok(())
            }
        }
    }

    /// Decode and handle a raw payload
    ///
    /// Returns false when the payload was malformed or handling failed; the
    /// message is logged and dropped either way.
    pub async fn dispatch(&self, queue: &str, payload: &str) -> bool {
        let message = match QueueMessage::decode(queue, payload) {
            Ok(message) => message,
            Err(e) => {
                warn!(queue, error = %e, "Dropping malformed message");
                return false;
            }
        };

        match self.handle(message).await {
            Ok(()) => true,
            Err(e) if e.is_validation_error() => {
                warn!(queue, error = %e, "Dropping invalid message");
                false
            }
            Err(e) => {
                error!(queue, error = %e, "Message handling failed");
                false
            }
        }
    }
}

#[async_trait]
impl JobHandler<QueueMessage> for MessageHandler {
    async fn handle(&self, job: QueueMessage) -> Result<()> {
        MessageHandler::handle(self, job).await
    }
}
