//! af-catalog library
//!
//! Normalizes audio file tags into a five-table catalog (publisher, genre,
//! artist, album, song), answers exact-match queries against it, and renders
//! `%x` path templates from catalog records.

pub mod db;
pub mod ingest;
pub mod library;
pub mod models;
pub mod pattern;
pub mod query;
pub mod services;
pub mod store;
pub mod utils;

pub use af_common::{Error, Result};
pub use library::AudioLibrary;
pub use models::{CatalogRow, TagRecord};
pub use pattern::PathTemplate;
pub use query::{parse_filter, Filter, QueryField};
pub use store::{CatalogStore, MemoryCatalogStore, SaveOutcome, SqliteCatalogStore};
