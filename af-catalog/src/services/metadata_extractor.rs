//! Audio tag extraction
//!
//! Reads the catalog facts (artist, album, title, track and disc numbering,
//! publisher, genre, release date) from a file's primary tag using lofty.

use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, Tag};
use std::borrow::Cow;
use std::path::Path;
use thiserror::Error;

/// Tag extraction errors
#[derive(Debug, Error)]
pub enum MetadataError {
    /// File could not be probed or parsed
    #[error("Failed to read file: {0}")]
    ReadError(String),

    /// File parsed but carries no tag
    #[error("No metadata found")]
    NoMetadata,

    /// I/O error (file read)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Raw tag facts for one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub track_num: Option<u32>,
    pub total_tracks: Option<u32>,
    pub disc_num: Option<u32>,
    pub total_discs: Option<u32>,
    pub publisher: Option<String>,
    pub genre: Option<String>,
    /// Best known release date, as written in the tag
    pub year: Option<String>,
}

/// Source of tag facts for a media file
pub trait TagExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<ExtractedTags, MetadataError>;
}

/// Tag extractor backed by lofty
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTagExtractor;

impl LoftyTagExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl TagExtractor for LoftyTagExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractedTags, MetadataError> {
        if !std::fs::metadata(path)?.is_file() {
            return Err(MetadataError::ReadError(format!(
                "{} is not a regular file",
                path.display()
            )));
        }

        let tagged_file = Probe::open(path)
            .map_err(|e| MetadataError::ReadError(e.to_string()))?
            .read()
            .map_err(|e| MetadataError::ReadError(e.to_string()))?;

        let tag = tagged_file
            .primary_tag()
            .or_else(|| tagged_file.first_tag())
            .ok_or(MetadataError::NoMetadata)?;

        let tags = tags_from(tag);

        tracing::debug!(
            file = %path.display(),
            artist = ?tags.artist,
            album = ?tags.album,
            title = ?tags.title,
            "Extracted tags"
        );

        Ok(tags)
    }
}

fn text(value: Option<Cow<'_, str>>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn tags_from(tag: &Tag) -> ExtractedTags {
    let item = |key: &ItemKey| text(tag.get_string(key).map(Cow::Borrowed));

    ExtractedTags {
        title: text(tag.title()),
        artist: text(tag.artist()),
        album: text(tag.album()),
        track_num: tag.track(),
        total_tracks: tag.track_total(),
        disc_num: tag.disk(),
        total_discs: tag.disk_total(),
        publisher: item(&ItemKey::Publisher).or_else(|| item(&ItemKey::Label)),
        genre: text(tag.genre()),
        year: item(&ItemKey::ReleaseDate)
            .or_else(|| item(&ItemKey::OriginalReleaseDate))
            .or_else(|| item(&ItemKey::RecordingDate))
            .or_else(|| tag.year().map(|year| year.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lofty::tag::TagType;

    #[test]
    fn test_extract_nonexistent_file() {
        let result = LoftyTagExtractor::new().extract(Path::new("/nonexistent/file.mp3"));
        assert!(matches!(result, Err(MetadataError::IoError(_))));
    }

    #[test]
    fn test_extract_non_audio_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.mp3");
        std::fs::write(&path, b"definitely not mpeg audio").unwrap();

        assert!(LoftyTagExtractor::new().extract(&path).is_err());
    }

    #[test]
    fn test_tags_from_id3v2() {
        let mut tag = Tag::new(TagType::Id3v2);
        tag.set_title("Airbag".to_string());
        tag.set_artist("Radiohead".to_string());
        tag.set_album("OK Computer".to_string());
        tag.set_genre("Alternative".to_string());
        tag.set_track(1);
        tag.set_track_total(12);
        tag.insert_text(ItemKey::Publisher, "Parlophone".to_string());
        tag.insert_text(ItemKey::RecordingDate, "1997".to_string());

        let tags = tags_from(&tag);
        assert_eq!(tags.title.as_deref(), Some("Airbag"));
        assert_eq!(tags.artist.as_deref(), Some("Radiohead"));
        assert_eq!(tags.track_num, Some(1));
        assert_eq!(tags.total_tracks, Some(12));
        assert_eq!(tags.disc_num, None);
        assert_eq!(tags.publisher.as_deref(), Some("Parlophone"));
        assert_eq!(tags.year.as_deref(), Some("1997"));
    }

    #[test]
    fn test_blank_values_are_absent() {
        let mut tag = Tag::new(TagType::Id3v2);
        tag.set_artist("   ".to_string());

        let tags = tags_from(&tag);
        assert_eq!(tags.artist, None);
        assert_eq!(tags, ExtractedTags::default());
    }
}
