//! Catalog schema bootstrap tests
//!
//! The store must come up with exactly the five catalog tables, whatever it
//! held before: fresh file, correct schema, a foreign schema, or a damaged one.

use af_common::config::StoreSettings;
use af_common::db::init::init_database;
use af_common::db::schema::{self, ensure_schema, list_tables, reset_schema, SchemaStatus};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tempfile::TempDir;

async fn raw_pool(db_path: &Path) -> SqlitePool {
    let url = format!("sqlite://{}?mode=rwc", db_path.display());
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .expect("Failed to open raw database")
}

#[tokio::test]
async fn test_fresh_store_gets_five_tables() {
    let temp_dir = TempDir::new().unwrap();
    let pool = raw_pool(&temp_dir.path().join("lib.db")).await;

    let status = ensure_schema(&pool).await.unwrap();
    assert_eq!(status, SchemaStatus::Created);

    let tables = list_tables(&pool).await.unwrap();
    assert_eq!(tables, vec!["album", "artist", "genre", "publisher", "song"]);
}

#[tokio::test]
async fn test_ensure_schema_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let pool = raw_pool(&temp_dir.path().join("lib.db")).await;

    ensure_schema(&pool).await.unwrap();
    sqlx::query("INSERT INTO artist (name) VALUES ('Keep Me')")
        .execute(&pool)
        .await
        .unwrap();

    let status = ensure_schema(&pool).await.unwrap();
    assert_eq!(status, SchemaStatus::Ready);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM artist")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1, "An intact schema must not be rebuilt");
}

#[tokio::test]
async fn test_extra_table_triggers_rebuild() {
    let temp_dir = TempDir::new().unwrap();
    let pool = raw_pool(&temp_dir.path().join("lib.db")).await;

    ensure_schema(&pool).await.unwrap();
    sqlx::query("CREATE TABLE songs_backup (id INTEGER)")
        .execute(&pool)
        .await
        .unwrap();

    let status = ensure_schema(&pool).await.unwrap();
    assert_eq!(status, SchemaStatus::Rebuilt { dropped_tables: 6 });

    let tables = list_tables(&pool).await.unwrap();
    assert_eq!(tables.len(), 5);
    assert!(!tables.contains(&"songs_backup".to_string()));
}

#[tokio::test]
async fn test_foreign_schema_is_dropped() {
    let temp_dir = TempDir::new().unwrap();
    let pool = raw_pool(&temp_dir.path().join("lib.db")).await;

    sqlx::query("CREATE TABLE songs (title TEXT)")
        .execute(&pool)
        .await
        .unwrap();

    let status = ensure_schema(&pool).await.unwrap();
    assert_eq!(status, SchemaStatus::Rebuilt { dropped_tables: 1 });
    assert!(schema::have_schema(&pool).await.unwrap());
}

#[tokio::test]
async fn test_missing_column_triggers_rebuild() {
    let temp_dir = TempDir::new().unwrap();
    let pool = raw_pool(&temp_dir.path().join("lib.db")).await;

    // Right table names, but album lacks the year column
    for table in schema::CATALOG_TABLES.iter().filter(|t| t.name != "album") {
        sqlx::query(table.create).execute(&pool).await.unwrap();
    }
    sqlx::query("CREATE TABLE album (id INTEGER PRIMARY KEY, name TEXT)")
        .execute(&pool)
        .await
        .unwrap();

    assert!(!schema::have_schema(&pool).await.unwrap());

    let status = ensure_schema(&pool).await.unwrap();
    assert_eq!(status, SchemaStatus::Rebuilt { dropped_tables: 5 });
    assert!(schema::have_schema(&pool).await.unwrap());
}

#[tokio::test]
async fn test_name_without_unique_constraint_triggers_rebuild() {
    let temp_dir = TempDir::new().unwrap();
    let pool = raw_pool(&temp_dir.path().join("lib.db")).await;

    // Right tables and columns, but artist names are not unique
    for table in schema::CATALOG_TABLES.iter().filter(|t| t.name != "artist") {
        sqlx::query(table.create).execute(&pool).await.unwrap();
    }
    sqlx::query("CREATE TABLE artist (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")
        .execute(&pool)
        .await
        .unwrap();
    for index in schema::CATALOG_INDICES {
        sqlx::query(index).execute(&pool).await.unwrap();
    }

    assert!(!schema::have_schema(&pool).await.unwrap());

    let status = ensure_schema(&pool).await.unwrap();
    assert_eq!(status, SchemaStatus::Rebuilt { dropped_tables: 5 });

    sqlx::query("INSERT INTO artist (name) VALUES ('Radiohead')")
        .execute(&pool)
        .await
        .unwrap();
    let duplicate = sqlx::query("INSERT INTO artist (name) VALUES ('Radiohead')")
        .execute(&pool)
        .await;
    assert!(duplicate.is_err(), "Rebuilt artist table must reject duplicate names");
}

#[tokio::test]
async fn test_missing_album_index_with_duplicates_triggers_rebuild() {
    let temp_dir = TempDir::new().unwrap();
    let pool = raw_pool(&temp_dir.path().join("lib.db")).await;

    // Tables only; the compound album and song keys were never created
    for table in schema::CATALOG_TABLES {
        sqlx::query(table.create).execute(&pool).await.unwrap();
    }
    sqlx::query("INSERT INTO artist (name) VALUES ('A')").execute(&pool).await.unwrap();
    sqlx::query("INSERT INTO publisher (name) VALUES ('P')").execute(&pool).await.unwrap();
    for _ in 0..2 {
        sqlx::query("INSERT INTO album (name, artist_id, publisher_id) VALUES ('X', 1, 1)")
            .execute(&pool)
            .await
            .unwrap();
    }

    assert!(!schema::have_schema(&pool).await.unwrap());

    let status = ensure_schema(&pool).await.unwrap();
    assert_eq!(status, SchemaStatus::Rebuilt { dropped_tables: 5 });
    assert!(schema::have_schema(&pool).await.unwrap());

    let albums: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM album")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(albums, 0);
}

#[tokio::test]
async fn test_rebuild_with_populated_foreign_keys() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("lib.db");
    let pool = init_database(&db_path, &StoreSettings::default()).await.unwrap();

    sqlx::query("INSERT INTO artist (name) VALUES ('A')").execute(&pool).await.unwrap();
    sqlx::query("INSERT INTO publisher (name) VALUES ('P')").execute(&pool).await.unwrap();
    sqlx::query("INSERT INTO album (name, artist_id, publisher_id) VALUES ('B', 1, 1)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("CREATE TABLE stray (id INTEGER)").execute(&pool).await.unwrap();

    // Referenced parents must drop cleanly even with foreign keys enforced
    let status = ensure_schema(&pool).await.unwrap();
    assert!(matches!(status, SchemaStatus::Rebuilt { .. }));

    let albums: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM album")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(albums, 0);
}

#[tokio::test]
async fn test_unique_indices_exist() {
    let temp_dir = TempDir::new().unwrap();
    let pool = raw_pool(&temp_dir.path().join("lib.db")).await;
    ensure_schema(&pool).await.unwrap();

    let indices: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'index' AND name LIKE 'unique_%' ORDER BY name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert_eq!(indices, vec!["unique_album", "unique_song"]);
}

#[tokio::test]
async fn test_reset_schema_empties_store() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("lib.db");
    let pool = init_database(&db_path, &StoreSettings::default()).await.unwrap();

    sqlx::query("INSERT INTO genre (name) VALUES ('Rock')").execute(&pool).await.unwrap();

    let dropped = reset_schema(&pool).await.unwrap();
    assert_eq!(dropped, 5);

    let genres: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM genre")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(genres, 0);
    assert!(schema::have_schema(&pool).await.unwrap());
}

#[tokio::test]
async fn test_reopen_existing_store_keeps_rows() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("lib.db");

    let pool = init_database(&db_path, &StoreSettings::default()).await.unwrap();
    sqlx::query("INSERT INTO artist (name) VALUES ('Persisted')")
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;

    let pool = init_database(&db_path, &StoreSettings::default()).await.unwrap();
    let name: String = sqlx::query_scalar("SELECT name FROM artist")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(name, "Persisted");
}
