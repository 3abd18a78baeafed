//! Catalog schema definition and bootstrap
//!
//! Single source of truth for the five catalog tables. The schema carries no
//! version number: a store is either exactly this set of tables (with these
//! columns) or it is torn down and rebuilt from scratch on startup.

use crate::Result;
use sqlx::{Row, SqlitePool};
use tracing::{info, warn};

/// Expected definition of one catalog table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDefinition {
    /// Table name in database
    pub name: &'static str,
    /// Column names in declaration order
    pub columns: &'static [&'static str],
    /// Natural key that must be backed by a unique index
    pub unique_key: &'static [&'static str],
    /// CREATE TABLE statement
    pub create: &'static str,
}

pub const PUBLISHER_TABLE: TableDefinition = TableDefinition {
    name: "publisher",
    columns: &["id", "name"],
    unique_key: &["name"],
    create: "CREATE TABLE IF NOT EXISTS publisher (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    )",
};

pub const GENRE_TABLE: TableDefinition = TableDefinition {
    name: "genre",
    columns: &["id", "name"],
    unique_key: &["name"],
    create: "CREATE TABLE IF NOT EXISTS genre (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    )",
};

pub const ARTIST_TABLE: TableDefinition = TableDefinition {
    name: "artist",
    columns: &["id", "name"],
    unique_key: &["name"],
    create: "CREATE TABLE IF NOT EXISTS artist (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    )",
};

pub const ALBUM_TABLE: TableDefinition = TableDefinition {
    name: "album",
    columns: &[
        "id",
        "name",
        "artist_id",
        "track_count",
        "disc_count",
        "publisher_id",
        "year",
    ],
    unique_key: &["name", "artist_id"],
    create: "CREATE TABLE IF NOT EXISTS album (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        artist_id INTEGER NOT NULL REFERENCES artist(id),
        track_count INTEGER,
        disc_count INTEGER NOT NULL DEFAULT 1,
        publisher_id INTEGER NOT NULL REFERENCES publisher(id),
        year TEXT DEFAULT NULL
    )",
};

pub const SONG_TABLE: TableDefinition = TableDefinition {
    name: "song",
    columns: &[
        "id",
        "name",
        "path",
        "base_path",
        "album_id",
        "artist_id",
        "genre_id",
        "track_num",
        "disc_num",
    ],
    unique_key: &["name", "album_id"],
    create: "CREATE TABLE IF NOT EXISTS song (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        path TEXT,
        base_path TEXT,
        album_id INTEGER NOT NULL REFERENCES album(id),
        artist_id INTEGER NOT NULL REFERENCES artist(id),
        genre_id INTEGER NOT NULL REFERENCES genre(id),
        track_num INTEGER,
        disc_num INTEGER NOT NULL DEFAULT 1
    )",
};

/// All catalog tables, parents before children
pub const CATALOG_TABLES: &[TableDefinition] = &[
    PUBLISHER_TABLE,
    GENRE_TABLE,
    ARTIST_TABLE,
    ALBUM_TABLE,
    SONG_TABLE,
];

/// Compound natural keys for albums and songs
pub const CATALOG_INDICES: &[&str] = &[
    "CREATE UNIQUE INDEX IF NOT EXISTS unique_album ON album (name, artist_id)",
    "CREATE UNIQUE INDEX IF NOT EXISTS unique_song ON song (name, album_id)",
];

/// Result of a schema bootstrap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaStatus {
    /// Schema was already complete, nothing changed
    Ready,
    /// Store was empty, schema created
    Created,
    /// Store held a foreign or damaged schema; all tables dropped and recreated
    Rebuilt { dropped_tables: usize },
}

/// Make sure the store holds exactly the catalog schema
///
/// Safe to call on every startup.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<SchemaStatus> {
    if have_schema(pool).await? {
        return Ok(SchemaStatus::Ready);
    }

    let existing = list_tables(pool).await?;
    let status = if existing.is_empty() {
        SchemaStatus::Created
    } else {
        warn!(
            tables = ?existing,
            "Catalog schema mismatch, dropping all tables"
        );
        let dropped_tables = clear_database(pool).await?;
        SchemaStatus::Rebuilt { dropped_tables }
    };

    create_schema(pool).await?;
    info!(status = ?status, "Catalog schema initialized");

    Ok(status)
}

/// Drop every table and recreate the empty catalog
pub async fn reset_schema(pool: &SqlitePool) -> Result<usize> {
    let dropped = clear_database(pool).await?;
    create_schema(pool).await?;
    info!(dropped_tables = dropped, "Catalog reset");
    Ok(dropped)
}

/// True when the store contains exactly the five catalog tables with the
/// expected columns, each with a unique index over its natural key
pub async fn have_schema(pool: &SqlitePool) -> Result<bool> {
    let mut existing = list_tables(pool).await?;
    existing.sort();

    let mut expected: Vec<&str> = CATALOG_TABLES.iter().map(|t| t.name).collect();
    expected.sort_unstable();

    if existing != expected {
        return Ok(false);
    }

    for table in CATALOG_TABLES {
        let columns = table_columns(pool, table.name).await?;
        if columns != table.columns {
            warn!(
                table = table.name,
                found = ?columns,
                expected = ?table.columns,
                "Catalog table has unexpected columns"
            );
            return Ok(false);
        }

        if !has_unique_index(pool, table.name, table.unique_key).await? {
            warn!(
                table = table.name,
                key = ?table.unique_key,
                "Catalog table lost its unique key"
            );
            return Ok(false);
        }
    }

    Ok(true)
}

/// Names of all user tables in the store
pub async fn list_tables(pool: &SqlitePool) -> Result<Vec<String>> {
    let tables = sqlx::query_scalar::<_, String>(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    Ok(tables)
}

async fn table_columns(pool: &SqlitePool, table: &str) -> Result<Vec<String>> {
    // table is always a CATALOG_TABLES constant here
    let rows = sqlx::query(&format!("PRAGMA table_info({})", table))
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(|row| row.get::<String, _>("name")).collect())
}

/// True when a full (non-partial) unique index covers exactly `key`
async fn has_unique_index(pool: &SqlitePool, table: &str, key: &[&str]) -> Result<bool> {
    let mut wanted = key.to_vec();
    wanted.sort_unstable();

    let indexes = sqlx::query(&format!("PRAGMA index_list({})", table))
        .fetch_all(pool)
        .await?;

    for index in &indexes {
        let unique: i64 = index.get("unique");
        let partial: i64 = index.get("partial");
        if unique == 0 || partial != 0 {
            continue;
        }

        let name: String = index.get("name");
        let rows = sqlx::query(&format!(
            "PRAGMA index_info(\"{}\")",
            name.replace('"', "\"\"")
        ))
        .fetch_all(pool)
        .await?;

        // Expression columns have no name and never match a plain key
        let columns: Option<Vec<String>> = rows
            .iter()
            .map(|row| row.get::<Option<String>, _>("name"))
            .collect();
        if let Some(mut columns) = columns {
            columns.sort_unstable();
            if columns == wanted {
                return Ok(true);
            }
        }
    }

    Ok(false)
}

/// Drop every user table, returning how many were dropped
async fn clear_database(pool: &SqlitePool) -> Result<usize> {
    let tables = list_tables(pool).await?;

    // Foreign key enforcement would reject dropping a referenced parent; the
    // pragma is per connection and ignored inside a transaction, so the whole
    // teardown runs on one dedicated connection.
    let mut conn = pool.acquire().await?;
    sqlx::query("PRAGMA foreign_keys = OFF")
        .execute(&mut *conn)
        .await?;

    let mut dropped = 0;
    let mut result = Ok(());
    for table in &tables {
        let sql = format!("DROP TABLE IF EXISTS \"{}\"", table.replace('"', "\"\""));
        match sqlx::query(&sql).execute(&mut *conn).await {
            Ok(_) => dropped += 1,
            Err(e) => {
                result = Err(e);
                break;
            }
        }
    }

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&mut *conn)
        .await?;
    result?;

    Ok(dropped)
}

async fn create_schema(pool: &SqlitePool) -> Result<()> {
    let mut tx = pool.begin().await?;
    for table in CATALOG_TABLES {
        sqlx::query(table.create).execute(&mut *tx).await?;
    }
    for index in CATALOG_INDICES {
        sqlx::query(index).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    Ok(())
}
