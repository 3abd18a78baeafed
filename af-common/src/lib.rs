//! # audiofile common library
//!
//! Shared code for the audiofile catalog tools:
//! - Error types
//! - Configuration loading and database path resolution
//! - Database initialization and the catalog schema bootstrap

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
