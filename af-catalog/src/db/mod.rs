//! Catalog row operations on a single SQLite connection
//!
//! Every get-or-create inserts first and only looks the row up after a
//! uniqueness violation. Selecting first would let two writers both miss and
//! both insert.

pub mod albums;
pub mod catalog;
pub mod entities;
pub mod songs;

pub use albums::get_or_create_album;
pub use catalog::fetch_catalog;
pub use entities::{get_or_create_entity, Entity};
pub use songs::get_or_create_song;

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}
