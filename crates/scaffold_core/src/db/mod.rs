//! SQLite storage bootstrap, schema migrations and the shared store.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the scaffold core.
//! - Apply schema migrations in deterministic order.
//! - Own the process-wide `Store` and its scoped transactions.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - No entity data is read or written before migrations succeed.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod migrations;
mod open;
mod store;

pub use open::{open_db, open_db_in_memory};
pub use store::{Store, StoreLocation};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// Unusable application context or store argument.
    InvalidArgument(String),
    /// The process-wide store is already bound to another database.
    StoreConflict {
        active: StoreLocation,
        requested: PathBuf,
    },
    Io(std::io::Error),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::StoreConflict { active, requested } => write!(
                f,
                "store already initialized at `{active}`; refusing to switch to `{}`",
                requested.display()
            ),
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. }
            | Self::InvalidArgument(_)
            | Self::StoreConflict { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<std::io::Error> for DbError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
