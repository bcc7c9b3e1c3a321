//! Profile store database: connection setup and schema versioning.
//!
//! # Responsibility
//! - Hand out SQLite connections whose profile schema is current.
//! - Report schema mismatches as typed errors instead of failing later in
//!   a query.
//!
//! # Invariants
//! - The profile schema version lives in `PRAGMA user_version`.
//! - `SqliteProfileStore` only accepts a connection at the latest version.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failure to open or verify the profile database.
#[derive(Debug)]
pub enum DbError {
    /// Driver-level failure (I/O, locking, malformed SQL).
    Sqlite(rusqlite::Error),
    /// The file carries profiles written by a newer specfinder build.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// Connection bypassed `open_db`, so migrations never ran on it.
    SchemaNotMigrated { db_version: u32, expected: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "profile database error: {err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "profile schema v{db_version} is from a newer build; this build reads up to v{latest_supported}"
            ),
            Self::SchemaNotMigrated {
                db_version,
                expected,
            } => write!(
                f,
                "profile schema is at v{db_version} but the store needs v{expected}; open it with `open_db`"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        if let Self::Sqlite(err) = self {
            return Some(err);
        }
        None
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
