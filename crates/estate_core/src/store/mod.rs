//! Backing-store ports and adapters.
//!
//! # Responsibility
//! - Define the document-store and blob-store contracts consumed by repos.
//! - Provide concrete adapters (SQLite documents, in-memory and directory
//!   blobs) that are constructed once and injected.
//!
//! # Invariants
//! - Store types never leak past the repository layer.
//! - Adapters do not retry; retry policy belongs to transport clients.

pub mod blob;
pub mod document;
pub mod local_blob;
pub mod memory_blob;
pub mod sqlite;

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure reported by a backing store.
#[derive(Debug)]
pub enum StoreError {
    /// No object/document exists at the addressed location.
    NotFound(String),
    /// Create targeted a key that is already taken.
    AlreadyExists(String),
    /// Query shape the store cannot evaluate natively.
    UnsupportedQuery(String),
    /// Stored bytes could not be decoded.
    InvalidData(String),
    /// Store reachable but refused or failed the call (quota, permission, ...).
    Unavailable(String),
    Db(DbError),
    Io(std::io::Error),
    Json(serde_json::Error),
    /// Blocking worker was cancelled or panicked.
    Task(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(location) => write!(f, "not found in store: {location}"),
            Self::AlreadyExists(location) => write!(f, "already exists in store: {location}"),
            Self::UnsupportedQuery(message) => write!(f, "unsupported query: {message}"),
            Self::InvalidData(message) => write!(f, "invalid stored data: {message}"),
            Self::Unavailable(message) => write!(f, "store unavailable: {message}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::Json(err) => write!(f, "{err}"),
            Self::Task(message) => write!(f, "store task failed: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}
