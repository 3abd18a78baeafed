//! Database initialization and catalog schema

pub mod init;
pub mod schema;

pub use init::*;
pub use schema::{ensure_schema, reset_schema, SchemaStatus, CATALOG_TABLES};
