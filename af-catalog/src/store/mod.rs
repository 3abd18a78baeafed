//! Catalog store contract
//!
//! `CatalogStore` is the narrow interface the library and ingest layers work
//! against. `SqliteCatalogStore` is the production store; `MemoryCatalogStore`
//! keeps the same semantics in process memory for tests.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryCatalogStore;
pub use sqlite::SqliteCatalogStore;

pub use crate::db::Entity;
pub use crate::models::{NewAlbum, NewSong};

use crate::models::{CatalogRow, TagRecord};
use crate::query::Filter;
use af_common::db::SchemaStatus;
use af_common::Result;
use async_trait::async_trait;
use std::fmt;

/// Prerequisite that stopped a record from becoming a song row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingLink {
    Artist,
    Publisher,
    Album,
    Genre,
    Title,
}

impl fmt::Display for MissingLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MissingLink::Artist => "artist",
            MissingLink::Publisher => "publisher",
            MissingLink::Album => "album",
            MissingLink::Genre => "genre",
            MissingLink::Title => "title",
        };
        f.write_str(name)
    }
}

/// How far a `save` got
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Song row exists (newly inserted or already present)
    Saved { song_id: i64 },
    /// Song skipped because a prerequisite was empty
    Skipped(MissingLink),
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved { .. })
    }

    pub fn song_id(&self) -> Option<i64> {
        match self {
            SaveOutcome::Saved { song_id } => Some(*song_id),
            SaveOutcome::Skipped(_) => None,
        }
    }
}

/// Normalizing catalog store
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Make sure the store holds exactly the catalog schema
    async fn ensure_schema(&self) -> Result<SchemaStatus>;

    /// Drop everything and start from an empty catalog
    async fn reset(&self) -> Result<()>;

    /// Resolve a publisher, genre or artist name to its id
    ///
    /// # Returns
    /// - `Ok(Some(id))` for the one row carrying this name
    /// - `Ok(None)` if `name` is empty
    async fn get_or_create(&self, entity: Entity, name: &str) -> Result<Option<i64>>;

    /// Resolve an album by (name, artist_id)
    async fn get_or_create_album(&self, album: &NewAlbum) -> Result<Option<i64>>;

    /// Resolve a song by (name, album_id)
    async fn get_or_create_song(&self, song: &NewSong) -> Result<Option<i64>>;

    /// Normalize one record into the catalog as a single atomic unit
    ///
    /// Publisher, genre and artist are resolved first, then the album (needs
    /// artist and publisher), then the song (needs album, artist and genre).
    /// A missing prerequisite stops the chain without error; rows resolved
    /// before that point are kept.
    async fn save(&self, record: &TagRecord) -> Result<SaveOutcome>;

    /// All catalog rows matching every term of `filter`
    async fn query(&self, filter: &Filter) -> Result<Vec<CatalogRow>>;
}

/// Row-level operations the save chain runs against
#[async_trait]
pub(crate) trait EntityLinker: Send {
    async fn link_entity(&mut self, entity: Entity, name: &str) -> Result<Option<i64>>;
    async fn link_album(&mut self, album: &NewAlbum) -> Result<Option<i64>>;
    async fn link_song(&mut self, song: &NewSong) -> Result<Option<i64>>;
}

/// Save chain shared by every store
pub(crate) async fn link_record<L>(linker: &mut L, record: &TagRecord) -> Result<SaveOutcome>
where
    L: EntityLinker + ?Sized,
{
    let publisher_id = linker.link_entity(Entity::Publisher, &record.publisher).await?;
    let genre_id = linker.link_entity(Entity::Genre, &record.genre).await?;
    let artist_id = linker.link_entity(Entity::Artist, &record.artist).await?;

    let Some(artist_id) = artist_id else {
        return Ok(SaveOutcome::Skipped(MissingLink::Artist));
    };
    let Some(publisher_id) = publisher_id else {
        return Ok(SaveOutcome::Skipped(MissingLink::Publisher));
    };

    let album = NewAlbum {
        name: record.album.clone(),
        artist_id,
        track_count: record.total_tracks,
        disc_count: record.total_discs.unwrap_or(1),
        publisher_id,
        year: Some(record.year.clone()).filter(|year| !year.is_empty()),
    };
    let Some(album_id) = linker.link_album(&album).await? else {
        return Ok(SaveOutcome::Skipped(MissingLink::Album));
    };
    let Some(genre_id) = genre_id else {
        return Ok(SaveOutcome::Skipped(MissingLink::Genre));
    };

    let song = NewSong {
        name: record.title.clone(),
        path: record.path.clone(),
        base_path: record.base_path.clone(),
        album_id,
        artist_id,
        genre_id,
        track_num: record.track_num,
        disc_num: record.disc_num.unwrap_or(1),
    };
    match linker.link_song(&song).await? {
        Some(song_id) => Ok(SaveOutcome::Saved { song_id }),
        None => Ok(SaveOutcome::Skipped(MissingLink::Title)),
    }
}
