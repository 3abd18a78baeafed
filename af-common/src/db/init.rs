//! Database initialization
//!
//! Opens the catalog store, applies connection pragmas and bootstraps the
//! schema. Any failure here leaves the store unusable and is reported as
//! `Error::StoreUnavailable`.

use crate::config::StoreSettings;
use crate::db::schema;
use crate::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Open (creating if needed) the catalog database and ensure its schema
pub async fn init_database(db_path: &Path, settings: &StoreSettings) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::StoreUnavailable(format!("Cannot create {}: {}", parent.display(), e))
            })?;
        }
    }

    // WAL allows concurrent readers with one writer; busy_timeout makes
    // writers from other processes wait briefly before reporting SQLITE_BUSY
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_millis(settings.lock_retry_ms));

    let pool = SqlitePoolOptions::new()
        .max_connections(settings.max_connections.max(1))
        .acquire_timeout(Duration::from_millis(settings.max_lock_wait_ms.max(1)))
        .connect_with(options)
        .await
        .map_err(|e| {
            Error::StoreUnavailable(format!("Cannot open {}: {}", db_path.display(), e))
        })?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    bootstrap(&pool).await?;

    info!(
        "Database busy timeout set to {} ms (retry budget {} ms)",
        settings.lock_retry_ms, settings.max_lock_wait_ms
    );

    Ok(pool)
}

/// Open a private in-memory catalog
///
/// SQLite gives every connection to `:memory:` its own database, so the pool
/// is pinned to a single connection that is never recycled.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(|e| Error::StoreUnavailable(format!("Cannot open in-memory store: {}", e)))?;

    bootstrap(&pool).await?;
    Ok(pool)
}

async fn bootstrap(pool: &SqlitePool) -> Result<()> {
    schema::ensure_schema(pool)
        .await
        .map(|_| ())
        .map_err(|e| match e {
            Error::StoreUnavailable(_) => e,
            other => Error::StoreUnavailable(format!("Schema bootstrap failed: {}", other)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("dir").join("lib.db");

        let pool = init_database(&db_path, &StoreSettings::default())
            .await
            .expect("Database initialization failed");

        assert!(db_path.exists(), "Database file was not created");
        pool.close().await;
    }

    #[tokio::test]
    async fn test_connection_pragmas() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("lib.db");
        let settings = StoreSettings {
            lock_retry_ms: 400,
            ..StoreSettings::default()
        };

        let pool = init_database(&db_path, &settings).await.unwrap();

        let timeout: i64 = sqlx::query_scalar("PRAGMA busy_timeout")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(timeout, 400);

        let foreign_keys: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(foreign_keys, 1);

        let journal_mode: String = sqlx::query_scalar("PRAGMA journal_mode")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(journal_mode.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn test_memory_database_has_schema() {
        let pool = init_memory_database().await.unwrap();
        assert!(schema::have_schema(&pool).await.unwrap());
    }

    #[tokio::test]
    async fn test_unwritable_location_is_store_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("file");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let result = init_database(&blocker.join("lib.db"), &StoreSettings::default()).await;
        assert!(matches!(result, Err(Error::StoreUnavailable(_))));
    }
}
