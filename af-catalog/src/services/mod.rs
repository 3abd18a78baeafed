//! Collaborator services: tag extraction and library scanning

pub mod file_scanner;
pub mod metadata_extractor;

pub use file_scanner::{FileScanner, ScanError};
pub use metadata_extractor::{ExtractedTags, LoftyTagExtractor, MetadataError, TagExtractor};
