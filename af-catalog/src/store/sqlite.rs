//! SQLite catalog store

use super::{link_record, CatalogStore, Entity, EntityLinker, NewAlbum, NewSong, SaveOutcome};
use crate::db;
use crate::models::{CatalogRow, TagRecord};
use crate::query::Filter;
use crate::utils::retry_on_lock;
use af_common::config::StoreSettings;
use af_common::db::{init_database, init_memory_database, SchemaStatus};
use af_common::Result;
use async_trait::async_trait;
use sqlx::{SqliteConnection, SqlitePool};
use std::path::Path;
use tracing::debug;

/// Catalog store backed by a SQLite pool
///
/// Each `save` runs in its own transaction; lock contention is retried with
/// backoff for up to `max_lock_wait_ms`.
#[derive(Clone)]
pub struct SqliteCatalogStore {
    pool: SqlitePool,
    max_lock_wait_ms: u64,
}

impl SqliteCatalogStore {
    pub fn new(pool: SqlitePool, max_lock_wait_ms: u64) -> Self {
        Self {
            pool,
            max_lock_wait_ms,
        }
    }

    /// Open (or create) the catalog file and bootstrap its schema
    pub async fn open(db_path: &Path, settings: &StoreSettings) -> Result<Self> {
        let pool = init_database(db_path, settings).await?;
        Ok(Self::new(pool, settings.max_lock_wait_ms))
    }

    /// Private in-memory catalog
    pub async fn open_in_memory() -> Result<Self> {
        let pool = init_memory_database().await?;
        Ok(Self::new(pool, StoreSettings::default().max_lock_wait_ms))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Save chain bound to one open transaction
struct TxLinker<'c> {
    conn: &'c mut SqliteConnection,
}

#[async_trait]
impl EntityLinker for TxLinker<'_> {
    async fn link_entity(&mut self, entity: Entity, name: &str) -> Result<Option<i64>> {
        db::get_or_create_entity(self.conn, entity, name).await
    }

    async fn link_album(&mut self, album: &NewAlbum) -> Result<Option<i64>> {
        db::get_or_create_album(self.conn, album).await
    }

    async fn link_song(&mut self, song: &NewSong) -> Result<Option<i64>> {
        db::get_or_create_song(self.conn, song).await
    }
}

#[async_trait]
impl CatalogStore for SqliteCatalogStore {
    async fn ensure_schema(&self) -> Result<SchemaStatus> {
        af_common::db::ensure_schema(&self.pool).await
    }

    async fn reset(&self) -> Result<()> {
        af_common::db::reset_schema(&self.pool).await?;
        Ok(())
    }

    async fn get_or_create(&self, entity: Entity, name: &str) -> Result<Option<i64>> {
        let pool = &self.pool;
        retry_on_lock("get_or_create", self.max_lock_wait_ms, || async move {
            let mut conn = pool.acquire().await?;
            db::get_or_create_entity(&mut conn, entity, name).await
        })
        .await
    }

    async fn get_or_create_album(&self, album: &NewAlbum) -> Result<Option<i64>> {
        let pool = &self.pool;
        retry_on_lock("get_or_create_album", self.max_lock_wait_ms, || async move {
            let mut conn = pool.acquire().await?;
            db::get_or_create_album(&mut conn, album).await
        })
        .await
    }

    async fn get_or_create_song(&self, song: &NewSong) -> Result<Option<i64>> {
        let pool = &self.pool;
        retry_on_lock("get_or_create_song", self.max_lock_wait_ms, || async move {
            let mut conn = pool.acquire().await?;
            db::get_or_create_song(&mut conn, song).await
        })
        .await
    }

    async fn save(&self, record: &TagRecord) -> Result<SaveOutcome> {
        let pool = &self.pool;
        let outcome = retry_on_lock("catalog save", self.max_lock_wait_ms, || async move {
            let mut tx = pool.begin().await?;
            let outcome = link_record(&mut TxLinker { conn: &mut *tx }, record).await?;
            tx.commit().await?;
            Ok(outcome)
        })
        .await?;

        debug!(file = %record.path, outcome = ?outcome, "Record saved");
        Ok(outcome)
    }

    async fn query(&self, filter: &Filter) -> Result<Vec<CatalogRow>> {
        let pool = &self.pool;
        retry_on_lock("catalog query", self.max_lock_wait_ms, || async move {
            db::fetch_catalog(pool, filter).await
        })
        .await
    }
}
