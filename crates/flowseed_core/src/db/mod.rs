//! Engine store connections and schema.
//!
//! # Responsibility
//! - Hand out SQLite connections backing the identity and repository stores.
//! - Bring the store schema up to the version this binary understands.
//!
//! # Invariants
//! - The schema version lives in `PRAGMA user_version`.
//! - Stores never see a connection whose schema is behind or ahead of
//!   [`migrations::latest_version`].

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory, open_existing_db};

pub type DbResult<T> = Result<T, DbError>;

/// Failure to obtain a usable engine store connection.
#[derive(Debug)]
pub enum DbError {
    /// SQLite refused to open, configure or migrate the store.
    Sqlite(rusqlite::Error),
    /// The store was written by a newer build with more schema steps.
    UnsupportedSchemaVersion { found: u32, supported: u32 },
    /// A read-only caller pointed at a store file that is not there.
    StoreNotFound(PathBuf),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "engine store sqlite error: {err}"),
            Self::UnsupportedSchemaVersion { found, supported } => write!(
                f,
                "engine store is at schema v{found}, this build only knows up to v{supported}"
            ),
            Self::StoreNotFound(path) => {
                write!(f, "engine store `{}` does not exist", path.display())
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } | Self::StoreNotFound(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
