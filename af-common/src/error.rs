//! Common error types for audiofile

use thiserror::Error;

/// Common result type for audiofile operations
pub type Result<T> = std::result::Result<T, Error>;

/// SQLite primary result codes for contention (SQLITE_BUSY, SQLITE_LOCKED)
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// Common error types across the catalog crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Store could not be opened, stayed locked, or failed its schema bootstrap
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Query filter key outside the exposed field set
    #[error("Invalid filter key: {0}")]
    InvalidFilterKey(String),

    /// Path template with an unrecognized token
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// Queue payload that does not match any known message shape
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True when the error is transient store contention worth retrying.
    pub fn is_lock_error(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::PoolTimedOut) => true,
            Error::Database(sqlx::Error::Database(db_err)) => {
                let primary_code = db_err
                    .code()
                    .and_then(|code| code.parse::<i32>().ok())
                    .map(|code| code & 0xff);
                matches!(primary_code, Some(SQLITE_BUSY) | Some(SQLITE_LOCKED))
                    || db_err.message().contains("database is locked")
            }
            _ => false,
        }
    }

    /// True for caller-side validation failures raised before any store access.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidFilterKey(_) | Error::InvalidPattern(_) | Error::InvalidMessage(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_not_lock_errors() {
        let err = Error::InvalidFilterKey("colour".to_string());
        assert!(err.is_validation_error());
        assert!(!err.is_lock_error());
    }

    #[test]
    fn test_pool_timeout_counts_as_contention() {
        assert!(Error::Database(sqlx::Error::PoolTimedOut).is_lock_error());
        assert!(!Error::Database(sqlx::Error::RowNotFound).is_lock_error());
    }

    #[test]
    fn test_error_messages() {
        let err = Error::StoreUnavailable("locked".to_string());
        assert_eq!(err.to_string(), "Store unavailable: locked");
    }
}
