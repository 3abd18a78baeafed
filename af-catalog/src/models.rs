//! Catalog data types
//!
//! `TagRecord` is the transient value passed between tag extraction, the
//! store and the path templates. `CatalogRow` is one row of the joined
//! catalog query.

use crate::services::metadata_extractor::ExtractedTags;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Facts about one media file
///
/// Text fields use the empty string for "absent"; numeric fields use `None`.
/// Field names double as the JSON keys of rename messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagRecord {
    #[serde(deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub path: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub base_path: String,
    pub track_num: Option<u32>,
    pub disc_num: Option<u32>,
    #[serde(deserialize_with = "null_as_empty")]
    pub album: String,
    pub total_tracks: Option<u32>,
    pub total_discs: Option<u32>,
    #[serde(deserialize_with = "null_as_empty")]
    pub year: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub artist: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub publisher: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub genre: String,
}

impl TagRecord {
    /// Empty record for a file, as produced when extraction fails
    pub fn for_path(path: impl Into<String>, base_path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            base_path: base_path.into(),
            ..Self::default()
        }
    }

    /// Build a record from extracted tags, applying catalog defaults
    ///
    /// - no track number means the track total is meaningless and is dropped
    /// - disc number and disc total default to 1 when missing or zero
    pub fn from_tags(tags: ExtractedTags, path: impl Into<String>, base_path: impl Into<String>) -> Self {
        let track_num = tags.track_num.filter(|n| *n > 0);
        let total_tracks = if track_num.is_some() {
            tags.total_tracks.filter(|n| *n > 0)
        } else {
            None
        };

        Self {
            title: tags.title.unwrap_or_default(),
            path: path.into(),
            base_path: base_path.into(),
            track_num,
            disc_num: Some(tags.disc_num.filter(|n| *n > 0).unwrap_or(1)),
            album: tags.album.unwrap_or_default(),
            total_tracks,
            total_discs: Some(tags.total_discs.filter(|n| *n > 0).unwrap_or(1)),
            year: tags.year.unwrap_or_default(),
            artist: tags.artist.unwrap_or_default(),
            publisher: tags.publisher.unwrap_or_default(),
            genre: tags.genre.unwrap_or_default(),
        }
    }
}

impl fmt::Display for TagRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} by {}", self.title, self.artist)?;

        write!(f, "\tFound on {}", self.album)?;
        if let Some(track) = self.track_num.filter(|n| *n > 0) {
            write!(f, ", track {}", track)?;
            if let Some(total) = self.total_tracks.filter(|n| *n > 0) {
                write!(f, " of {}", total)?;
            }
        }
        if let Some(disc) = self.disc_num.filter(|n| *n > 0) {
            write!(f, ", disc {}", disc)?;
            if let Some(total) = self.total_discs.filter(|n| *n > 0) {
                write!(f, " of {}", total)?;
            }
        }
        writeln!(f)?;

        writeln!(f, "\tReleased by {} in {}", self.publisher, self.year)?;
        write!(f, "\tGenre: {}", self.genre)
    }
}

/// Album row to resolve, keyed on (name, artist_id)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAlbum {
    pub name: String,
    pub artist_id: i64,
    pub track_count: Option<u32>,
    pub disc_count: u32,
    pub publisher_id: i64,
    pub year: Option<String>,
}

/// Song row to resolve, keyed on (name, album_id)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSong {
    pub name: String,
    pub path: String,
    pub base_path: String,
    pub album_id: i64,
    pub artist_id: i64,
    pub genre_id: i64,
    pub track_num: Option<u32>,
    pub disc_num: u32,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// One row of the joined catalog query, shaped as the twelve query fields
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CatalogRow {
    pub title: String,
    pub path: Option<String>,
    pub base_path: Option<String>,
    pub track_num: Option<i64>,
    pub disc_num: Option<i64>,
    pub album: String,
    pub track_count: Option<i64>,
    pub disc_count: Option<i64>,
    pub year: Option<String>,
    pub artist: String,
    pub publisher: String,
    pub genre: String,
}

impl From<CatalogRow> for TagRecord {
    fn from(row: CatalogRow) -> Self {
        let number = |value: Option<i64>| value.and_then(|v| u32::try_from(v).ok());
        Self {
            title: row.title,
            path: row.path.unwrap_or_default(),
            base_path: row.base_path.unwrap_or_default(),
            track_num: number(row.track_num),
            disc_num: number(row.disc_num),
            album: row.album,
            total_tracks: number(row.track_count),
            total_discs: number(row.disc_count),
            year: row.year.unwrap_or_default(),
            artist: row.artist,
            publisher: row.publisher,
            genre: row.genre,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn airbag() -> TagRecord {
        TagRecord {
            title: "Airbag".to_string(),
            path: "/music/in/airbag.mp3".to_string(),
            base_path: "/music".to_string(),
            track_num: Some(1),
            disc_num: Some(1),
            album: "OK Computer".to_string(),
            total_tracks: Some(12),
            total_discs: Some(1),
            year: "1997".to_string(),
            artist: "Radiohead".to_string(),
            publisher: "Parlophone".to_string(),
            genre: "Alternative".to_string(),
        }
    }

    #[test]
    fn test_display_summary() {
        let expected = "Airbag by Radiohead\n\
                        \tFound on OK Computer, track 1 of 12, disc 1 of 1\n\
                        \tReleased by Parlophone in 1997\n\
                        \tGenre: Alternative";
        assert_eq!(airbag().to_string(), expected);
    }

    #[test]
    fn test_display_omits_missing_numbers() {
        let record = TagRecord {
            track_num: None,
            total_tracks: Some(12),
            disc_num: None,
            ..airbag()
        };
        let text = record.to_string();
        assert!(text.contains("\tFound on OK Computer\n"));
    }

    #[test]
    fn test_from_tags_applies_defaults() {
        let tags = ExtractedTags {
            title: Some("Song".to_string()),
            total_tracks: Some(10),
            disc_num: Some(0),
            ..ExtractedTags::default()
        };

        let record = TagRecord::from_tags(tags, "/m/a.mp3", "/m");
        assert_eq!(record.track_num, None);
        assert_eq!(record.total_tracks, None, "Track total needs a track number");
        assert_eq!(record.disc_num, Some(1));
        assert_eq!(record.total_discs, Some(1));
        assert_eq!(record.artist, "");
        assert_eq!(record.base_path, "/m");
    }

    #[test]
    fn test_deserialize_null_fields() {
        let json = r#"{"title": "Airbag", "artist": null, "track_num": 3, "path": "/x.mp3"}"#;
        let record: TagRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.title, "Airbag");
        assert_eq!(record.artist, "");
        assert_eq!(record.track_num, Some(3));
        assert_eq!(record.genre, "");
    }

    #[test]
    fn test_row_conversion() {
        let row = CatalogRow {
            title: "Airbag".to_string(),
            path: Some("/music/in/airbag.mp3".to_string()),
            base_path: Some("/music".to_string()),
            track_num: Some(1),
            disc_num: Some(1),
            album: "OK Computer".to_string(),
            track_count: Some(12),
            disc_count: Some(1),
            year: Some("1997".to_string()),
            artist: "Radiohead".to_string(),
            publisher: "Parlophone".to_string(),
            genre: "Alternative".to_string(),
        };
        assert_eq!(TagRecord::from(row), airbag());
    }
}
