//! Name-only catalog entities (publisher, genre, artist)

use super::is_unique_violation;
use af_common::Result;
use sqlx::SqliteConnection;
use std::fmt;

/// Catalog entity identified by name alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Publisher,
    Genre,
    Artist,
}

impl Entity {
    pub fn table(self) -> &'static str {
        match self {
            Entity::Publisher => "publisher",
            Entity::Genre => "genre",
            Entity::Artist => "artist",
        }
    }

    fn insert_sql(self) -> &'static str {
        match self {
            Entity::Publisher => "INSERT INTO publisher (name) VALUES (?)",
            Entity::Genre => "INSERT INTO genre (name) VALUES (?)",
            Entity::Artist => "INSERT INTO artist (name) VALUES (?)",
        }
    }

    fn select_sql(self) -> &'static str {
        match self {
            Entity::Publisher => "SELECT id FROM publisher WHERE name = ? LIMIT 1",
            Entity::Genre => "SELECT id FROM genre WHERE name = ? LIMIT 1",
            Entity::Artist => "SELECT id FROM artist WHERE name = ? LIMIT 1",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Resolve `name` to its row id, inserting the row if needed
///
/// Returns `None` for an empty name: the entity cannot be linked.
pub async fn get_or_create_entity(
    conn: &mut SqliteConnection,
    entity: Entity,
    name: &str,
) -> Result<Option<i64>> {
    if name.is_empty() {
        return Ok(None);
    }

    match sqlx::query(entity.insert_sql())
        .bind(name)
        .execute(&mut *conn)
        .await
    {
        Ok(result) => Ok(Some(result.last_insert_rowid())),
        Err(e) if is_unique_violation(&e) => {
            let id: i64 = sqlx::query_scalar(entity.select_sql())
                .bind(name)
                .fetch_one(&mut *conn)
                .await?;
            Ok(Some(id))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use af_common::db::init_memory_database;

    #[tokio::test]
    async fn test_same_name_same_id() {
        let pool = init_memory_database().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let first = get_or_create_entity(&mut conn, Entity::Artist, "Radiohead")
            .await
            .unwrap();
        let second = get_or_create_entity(&mut conn, Entity::Artist, "Radiohead")
            .await
            .unwrap();

        assert!(first.is_some());
        assert_eq!(first, second);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM artist")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_empty_name_is_not_linked() {
        let pool = init_memory_database().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let id = get_or_create_entity(&mut conn, Entity::Genre, "").await.unwrap();
        assert_eq!(id, None);
    }

    #[tokio::test]
    async fn test_entities_are_independent() {
        let pool = init_memory_database().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        // Same text in different tables must not collide
        let genre = get_or_create_entity(&mut conn, Entity::Genre, "Blues").await.unwrap();
        let artist = get_or_create_entity(&mut conn, Entity::Artist, "Blues").await.unwrap();
        let again = get_or_create_entity(&mut conn, Entity::Genre, "Blues").await.unwrap();

        assert!(genre.is_some() && artist.is_some());
        assert_eq!(genre, again);
    }

    #[tokio::test]
    async fn test_quote_in_name() {
        let pool = init_memory_database().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let id = get_or_create_entity(&mut conn, Entity::Publisher, "O'Brien Records")
            .await
            .unwrap()
            .unwrap();
        let name: String = sqlx::query_scalar("SELECT name FROM publisher WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(name, "O'Brien Records");
    }
}
