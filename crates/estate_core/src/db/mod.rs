//! SQLite bootstrap for the document store adapter.
//!
//! Every catalog collection shares one `documents` table: `(collection, id)`
//! is unique, `body` holds the JSON document and `seq` records insertion
//! order, which is the default result order of unordered queries. Lookups on
//! reference fields (`floorId`, `apartmentId`) use partial expression
//! indexes over `json_extract(body, ...)`.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - No document is read or written before migrations succeed and the
//!   table plus its indexes are confirmed present.
//! - `body` is always valid JSON (`CHECK (json_valid(body))`).

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// A thread panicked while holding the shared connection.
    ConnectionPoisoned,
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// A migrated database lacks a table or index the document store needs.
    MissingSchemaObject {
        kind: &'static str,
        name: &'static str,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::ConnectionPoisoned => write!(f, "sqlite connection lock poisoned"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::MissingSchemaObject { kind, name } => {
                write!(f, "document schema is missing {kind} `{name}`")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::ConnectionPoisoned
            | Self::UnsupportedSchemaVersion { .. }
            | Self::MissingSchemaObject { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
