//! Song rows, keyed on (name, album_id)

use super::is_unique_violation;
use crate::models::NewSong;
use af_common::Result;
use sqlx::SqliteConnection;

/// Resolve a song to its row id, inserting it if needed
///
/// Returns `None` for a song without a title.
pub async fn get_or_create_song(conn: &mut SqliteConnection, song: &NewSong) -> Result<Option<i64>> {
    if song.name.is_empty() {
        return Ok(None);
    }

    let disc_num = if song.disc_num == 0 { 1 } else { song.disc_num };

    let inserted = sqlx::query(
        r#"
        INSERT INTO song (name, path, base_path, album_id, artist_id, genre_id, track_num, disc_num)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&song.name)
    .bind(&song.path)
    .bind(&song.base_path)
    .bind(song.album_id)
    .bind(song.artist_id)
    .bind(song.genre_id)
    .bind(song.track_num.map(i64::from))
    .bind(i64::from(disc_num))
    .execute(&mut *conn)
    .await;

    match inserted {
        Ok(result) => Ok(Some(result.last_insert_rowid())),
        Err(e) if is_unique_violation(&e) => {
            let id: i64 = sqlx::query_scalar(
                "SELECT id FROM song WHERE name = ? AND album_id = ? LIMIT 1",
            )
            .bind(&song.name)
            .bind(song.album_id)
            .fetch_one(&mut *conn)
            .await?;
            Ok(Some(id))
        }
        Err(e) => Err(e.into()),
    }
}
