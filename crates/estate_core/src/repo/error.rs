use crate::model::ValidationError;
use crate::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Catalog repository error.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    NotFound {
        collection: &'static str,
        id: String,
    },
    /// Delete blocked by documents that still reference the target.
    Conflict {
        collection: &'static str,
        id: String,
        dependents: u64,
    },
    /// Filter combination the document store cannot evaluate natively.
    UnsupportedQuery(String),
    /// Stored document does not decode into the entity type.
    InvalidData(String),
    Store(StoreError),
}

impl RepoError {
    pub(crate) fn not_found(collection: &'static str, id: &str) -> Self {
        Self::NotFound {
            collection,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { collection, id } => write!(f, "{collection} not found: {id}"),
            Self::Conflict {
                collection,
                id,
                dependents,
            } => write!(
                f,
                "cannot delete {collection}/{id}: {dependents} dependent document(s) remain"
            ),
            Self::UnsupportedQuery(message) => write!(f, "unsupported query: {message}"),
            Self::InvalidData(message) => write!(f, "invalid stored document: {message}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::UnsupportedQuery(message) => Self::UnsupportedQuery(message),
            StoreError::InvalidData(message) => Self::InvalidData(message),
            other => Self::Store(other),
        }
    }
}
