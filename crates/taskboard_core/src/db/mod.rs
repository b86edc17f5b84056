//! Board database bootstrap.
//!
//! # Responsibility
//! - Hand out SQLite connections that already carry the board schema.
//!
//! # Invariants
//! - `PRAGMA user_version` equals the last applied migration.
//! - No board row is read or written on a connection whose migrations
//!   failed; [`open_db`] returns the error instead.

use crate::config::ConfigError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory, open_db_with_config};

pub type DbResult<T> = Result<T, DbError>;

/// Connection bootstrap errors.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// Connection settings failed [`crate::CoreConfig::validate`].
    InvalidConfig(ConfigError),
    /// One migration script failed; earlier scripts of the same run are
    /// rolled back with it.
    Migration {
        version: u32,
        name: &'static str,
        source: rusqlite::Error,
    },
    /// The file was migrated by a newer build.
    UnsupportedSchemaVersion { db_version: u32, latest_supported: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::InvalidConfig(err) => write!(f, "invalid database config: {err}"),
            Self::Migration {
                version,
                name,
                source,
            } => write!(f, "board schema migration {version} ({name}) failed: {source}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "board schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Migration { source: err, .. } => Some(err),
            Self::InvalidConfig(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<ConfigError> for DbError {
    fn from(value: ConfigError) -> Self {
        Self::InvalidConfig(value)
    }
}
