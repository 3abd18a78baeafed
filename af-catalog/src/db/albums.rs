//! Album rows, keyed on (name, artist_id)

use super::is_unique_violation;
use crate::models::NewAlbum;
use af_common::Result;
use sqlx::SqliteConnection;

/// Resolve an album to its row id, inserting it if needed
///
/// The caller has already resolved the artist and publisher. An existing
/// album keeps its original track count, disc count and year. Returns `None`
/// for an album without a name.
pub async fn get_or_create_album(
    conn: &mut SqliteConnection,
    album: &NewAlbum,
) -> Result<Option<i64>> {
    if album.name.is_empty() {
        return Ok(None);
    }

    let disc_count = if album.disc_count == 0 { 1 } else { album.disc_count };

    let inserted = sqlx::query(
        r#"
        INSERT INTO album (name, artist_id, track_count, disc_count, publisher_id, year)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&album.name)
    .bind(album.artist_id)
    .bind(album.track_count.map(i64::from))
    .bind(i64::from(disc_count))
    .bind(album.publisher_id)
    .bind(album.year.as_deref().filter(|year| !year.is_empty()))
    .execute(&mut *conn)
    .await;

    match inserted {
        Ok(result) => Ok(Some(result.last_insert_rowid())),
        Err(e) if is_unique_violation(&e) => {
            let id: i64 = sqlx::query_scalar(
                "SELECT id FROM album WHERE name = ? AND artist_id = ? LIMIT 1",
            )
            .bind(&album.name)
            .bind(album.artist_id)
            .fetch_one(&mut *conn)
            .await?;
            Ok(Some(id))
        }
        Err(e) => Err(e.into()),
    }
}
