//! In-memory catalog store
//!
//! Mirrors the SQLite store's semantics without a database: name keys,
//! compound album/song keys, foreign key checks, atomic saves and the same
//! result ordering.

use super::{link_record, CatalogStore, Entity, EntityLinker, NewAlbum, NewSong, SaveOutcome};
use crate::models::{CatalogRow, TagRecord};
use crate::query::{Filter, QueryField};
use af_common::db::SchemaStatus;
use af_common::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Default)]
struct NameTable {
    ids: HashMap<String, i64>,
}

impl NameTable {
    fn get_or_insert(&mut self, name: &str) -> i64 {
        let next_id = self.ids.len() as i64 + 1;
        *self.ids.entry(name.to_string()).or_insert(next_id)
    }

    fn name_of(&self, id: i64) -> Option<&str> {
        self.ids
            .iter()
            .find(|(_, row_id)| **row_id == id)
            .map(|(name, _)| name.as_str())
    }

    fn contains_id(&self, id: i64) -> bool {
        id >= 1 && id <= self.ids.len() as i64
    }
}

#[derive(Debug, Clone)]
struct AlbumRow {
    id: i64,
    album: NewAlbum,
}

#[derive(Debug, Clone)]
struct SongRow {
    id: i64,
    song: NewSong,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    publishers: NameTable,
    genres: NameTable,
    artists: NameTable,
    albums: Vec<AlbumRow>,
    songs: Vec<SongRow>,
}

impl Tables {
    fn names(&mut self, entity: Entity) -> &mut NameTable {
        match entity {
            Entity::Publisher => &mut self.publishers,
            Entity::Genre => &mut self.genres,
            Entity::Artist => &mut self.artists,
        }
    }

    fn check_reference(&self, table: &NameTable, entity: Entity, id: i64) -> Result<()> {
        if table.contains_id(id) {
            Ok(())
        } else {
            Err(Error::Internal(format!(
                "FOREIGN KEY constraint failed: no {} with id {}",
                entity, id
            )))
        }
    }

    fn insert_album(&mut self, album: &NewAlbum) -> Result<Option<i64>> {
        if album.name.is_empty() {
            return Ok(None);
        }
        self.check_reference(&self.artists, Entity::Artist, album.artist_id)?;
        self.check_reference(&self.publishers, Entity::Publisher, album.publisher_id)?;

        if let Some(existing) = self
            .albums
            .iter()
            .find(|row| row.album.name == album.name && row.album.artist_id == album.artist_id)
        {
            return Ok(Some(existing.id));
        }

        let id = self.albums.len() as i64 + 1;
        let mut stored = album.clone();
        stored.disc_count = stored.disc_count.max(1);
        stored.year = stored.year.filter(|year| !year.is_empty());
        self.albums.push(AlbumRow { id, album: stored });
        Ok(Some(id))
    }

    fn insert_song(&mut self, song: &NewSong) -> Result<Option<i64>> {
        if song.name.is_empty() {
            return Ok(None);
        }
        if !self.albums.iter().any(|row| row.id == song.album_id) {
            return Err(Error::Internal(format!(
                "FOREIGN KEY constraint failed: no album with id {}",
                song.album_id
            )));
        }
        self.check_reference(&self.artists, Entity::Artist, song.artist_id)?;
        self.check_reference(&self.genres, Entity::Genre, song.genre_id)?;

        if let Some(existing) = self
            .songs
            .iter()
            .find(|row| row.song.name == song.name && row.song.album_id == song.album_id)
        {
            return Ok(Some(existing.id));
        }

        let id = self.songs.len() as i64 + 1;
        let mut stored = song.clone();
        stored.disc_num = stored.disc_num.max(1);
        self.songs.push(SongRow { id, song: stored });
        Ok(Some(id))
    }

    fn joined_rows(&self) -> Vec<CatalogRow> {
        self.songs
            .iter()
            .filter_map(|row| {
                let song = &row.song;
                let album = &self.albums.iter().find(|a| a.id == song.album_id)?.album;
                if album.artist_id != song.artist_id {
                    return None;
                }
                Some(CatalogRow {
                    title: song.name.clone(),
                    path: Some(song.path.clone()),
                    base_path: Some(song.base_path.clone()),
                    track_num: song.track_num.map(i64::from),
                    disc_num: Some(i64::from(song.disc_num)),
                    album: album.name.clone(),
                    track_count: album.track_count.map(i64::from),
                    disc_count: Some(i64::from(album.disc_count)),
                    year: album.year.clone(),
                    artist: self.artists.name_of(song.artist_id)?.to_string(),
                    publisher: self.publishers.name_of(album.publisher_id)?.to_string(),
                    genre: self.genres.name_of(song.genre_id)?.to_string(),
                })
            })
            .collect()
    }
}

#[async_trait]
impl EntityLinker for Tables {
    async fn link_entity(&mut self, entity: Entity, name: &str) -> Result<Option<i64>> {
        if name.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.names(entity).get_or_insert(name)))
    }

    async fn link_album(&mut self, album: &NewAlbum) -> Result<Option<i64>> {
        self.insert_album(album)
    }

    async fn link_song(&mut self, song: &NewSong) -> Result<Option<i64>> {
        self.insert_song(song)
    }
}

/// Exact match with SQLite's comparison rules for the column type
fn field_matches(row: &CatalogRow, field: QueryField, value: &str) -> bool {
    let text = |column: &Option<String>| column.as_deref() == Some(value);
    let number = |column: Option<i64>| match (column, value.trim().parse::<i64>()) {
        (Some(stored), Ok(wanted)) => stored == wanted,
        _ => false,
    };

    match field {
        QueryField::Title => row.title == value,
        QueryField::Path => text(&row.path),
        QueryField::BasePath => text(&row.base_path),
        QueryField::TrackNum => number(row.track_num),
        QueryField::DiscNum => number(row.disc_num),
        QueryField::Album => row.album == value,
        QueryField::TrackCount => number(row.track_count),
        QueryField::DiscCount => number(row.disc_count),
        QueryField::Year => text(&row.year),
        QueryField::Artist => row.artist == value,
        QueryField::Publisher => row.publisher == value,
        QueryField::Genre => row.genre == value,
    }
}

/// Catalog store held entirely in process memory
#[derive(Default)]
pub struct MemoryCatalogStore {
    tables: Mutex<Tables>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn ensure_schema(&self) -> Result<SchemaStatus> {
        Ok(SchemaStatus::Ready)
    }

    async fn reset(&self) -> Result<()> {
        *self.tables.lock().await = Tables::default();
        Ok(())
    }

    async fn get_or_create(&self, entity: Entity, name: &str) -> Result<Option<i64>> {
        self.tables.lock().await.link_entity(entity, name).await
    }

    async fn get_or_create_album(&self, album: &NewAlbum) -> Result<Option<i64>> {
        self.tables.lock().await.insert_album(album)
    }

    async fn get_or_create_song(&self, song: &NewSong) -> Result<Option<i64>> {
        self.tables.lock().await.insert_song(song)
    }

    async fn save(&self, record: &TagRecord) -> Result<SaveOutcome> {
        let mut tables = self.tables.lock().await;

        // Work on a copy so a failed chain leaves no partial rows
        let mut staged = tables.clone();
        let outcome = link_record(&mut staged, record).await?;
        *tables = staged;

        Ok(outcome)
    }

    async fn query(&self, filter: &Filter) -> Result<Vec<CatalogRow>> {
        let tables = self.tables.lock().await;

        let mut rows: Vec<CatalogRow> = tables
            .joined_rows()
            .into_iter()
            .filter(|row| filter.iter().all(|(field, value)| field_matches(row, field, value)))
            .collect();

        rows.sort_by(|a, b| {
            (&a.artist, &a.album, a.disc_num, a.track_num, &a.title)
                .cmp(&(&b.artist, &b.album, b.disc_num, b.track_num, &b.title))
        });
        Ok(rows)
    }
}
