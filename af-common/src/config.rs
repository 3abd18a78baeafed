//! Configuration loading and database path resolution
//!
//! Database path resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable overriding the catalog database location
pub const DATABASE_ENV_VAR: &str = "AUDIOFILE_DB";

/// Bootstrap configuration loaded from TOML file
///
/// Every key is optional; missing keys fall back to built-in defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Path to the SQLite catalog (relative or absolute)
    pub database_path: Option<PathBuf>,

    /// Ingest worker count
    ///
    /// Default: 5
    pub worker_count: usize,

    /// SQLite busy_timeout per connection, in milliseconds
    ///
    /// Default: 250
    pub lock_retry_ms: u64,

    /// Total retry budget for a locked store, in milliseconds
    ///
    /// Default: 5000
    pub max_lock_wait_ms: u64,

    /// File extensions picked up when scanning a library folder
    pub extensions: Vec<String>,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            worker_count: 5,
            lock_retry_ms: 250,
            max_lock_wait_ms: 5000,
            extensions: vec!["mp3".to_string()],
            logging: LoggingConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Store connection settings derived from this config
    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            lock_retry_ms: self.lock_retry_ms,
            max_lock_wait_ms: self.max_lock_wait_ms,
            ..StoreSettings::default()
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Connection settings for the catalog store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreSettings {
    /// SQLite busy_timeout - time to wait for a lock before returning busy
    pub lock_retry_ms: u64,
    /// Maximum total retry time for a contended operation
    pub max_lock_wait_ms: u64,
    /// Connection pool size
    pub max_connections: u32,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            lock_retry_ms: 250,
            max_lock_wait_ms: 5000,
            max_connections: 8,
        }
    }
}

/// Load the TOML configuration
///
/// An explicit path must exist and parse. Without one, the user config
/// (`~/.config/audiofile/config.toml`) and then the system config
/// (`/etc/audiofile/config.toml`) are tried; if neither exists the
/// built-in defaults are returned.
pub fn load_toml_config(explicit_path: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit_path {
        Some(path) => path.to_path_buf(),
        None => match find_config_file() {
            Some(path) => path,
            None => {
                debug!("No config file found, using defaults");
                return Ok(TomlConfig::default());
            }
        },
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    let config = parse_toml_config(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Parse TOML configuration text
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
}

fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("audiofile").join("config.toml"));
    let system_config = PathBuf::from("/etc/audiofile/config.toml");

    user_config
        .into_iter()
        .chain(std::iter::once(system_config))
        .find(|path| path.exists())
}

/// Resolve the catalog database path
pub fn resolve_database_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    config: &TomlConfig,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &config.database_path {
        return path.clone();
    }

    // Priority 4: compiled default
    default_database_path()
}

/// Per-user default catalog location: `~/.audiofile/lib.db`
pub fn default_database_path() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".audiofile"))
        .unwrap_or_else(|| PathBuf::from(".audiofile"))
        .join("lib.db")
}
