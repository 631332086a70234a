//! Catalog repository over a generic document store.
//!
//! # Responsibility
//! - Provide CRUD and relationship queries for floors, apartments, pictures
//!   and buyers (entity methods live in the sibling `*_repo` modules).
//! - Translate typed filters into native store predicates.
//!
//! # Invariants
//! - Write inputs are validated before any document is touched.
//! - Every update refreshes `updatedAt` (pictures carry no such field).
//! - Filters never emulate compound predicates the store rejects; they fail
//!   with `RepoError::UnsupportedQuery` instead.
//! - Documents that do not decode are reported, never skipped.

use super::error::{RepoError, RepoResult};
use crate::model::EpochMillis;
use crate::store::document::{Document, DocumentStore, Query};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

pub(crate) const FIELD_UPDATED_AT: &str = "updatedAt";

/// Typed access to the catalog collections.
pub struct CatalogRepository<S> {
    store: Arc<S>,
}

impl<S> Clone for CatalogRepository<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: DocumentStore> CatalogRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub(crate) fn store(&self) -> &S {
        self.store.as_ref()
    }

    pub(crate) async fn insert<T: Serialize>(
        &self,
        collection: &'static str,
        id: &str,
        entity: &T,
    ) -> RepoResult<()> {
        let document = to_document(entity)?;
        self.store.create(collection, id, document).await?;
        Ok(())
    }

    pub(crate) async fn fetch<T: DeserializeOwned>(
        &self,
        collection: &'static str,
        id: &str,
    ) -> RepoResult<Option<T>> {
        self.store
            .get(collection, id)
            .await?
            .map(|document| from_document(collection, document))
            .transpose()
    }

    pub(crate) async fn fetch_required<T: DeserializeOwned>(
        &self,
        collection: &'static str,
        id: &str,
    ) -> RepoResult<T> {
        self.fetch(collection, id)
            .await?
            .ok_or_else(|| RepoError::not_found(collection, id))
    }

    /// Merges `patch` into the stored document, optionally stamping
    /// `updatedAt`.
    pub(crate) async fn merge<P: Serialize>(
        &self,
        collection: &'static str,
        id: &str,
        patch: &P,
        updated_at: Option<EpochMillis>,
    ) -> RepoResult<()> {
        let mut document = to_document(patch)?;
        if let Some(updated_at) = updated_at {
            document.insert(FIELD_UPDATED_AT.to_string(), Value::from(updated_at));
        }
        if !self.store.update(collection, id, document).await? {
            return Err(RepoError::not_found(collection, id));
        }
        Ok(())
    }

    pub(crate) async fn remove(&self, collection: &'static str, id: &str) -> RepoResult<()> {
        if !self.store.delete(collection, id).await? {
            return Err(RepoError::not_found(collection, id));
        }
        Ok(())
    }

    pub(crate) async fn select<T: DeserializeOwned>(
        &self,
        collection: &'static str,
        query: &Query,
    ) -> RepoResult<Vec<T>> {
        self.store
            .query(collection, query)
            .await?
            .into_iter()
            .map(|document| from_document(collection, document))
            .collect()
    }

    pub(crate) async fn count_matching(&self, collection: &'static str, query: &Query) -> RepoResult<u64> {
        Ok(self.store.count(collection, query).await?)
    }
}

pub(crate) fn to_document<T: Serialize>(value: &T) -> RepoResult<Document> {
    match serde_json::to_value(value) {
        Ok(Value::Object(document)) => Ok(document),
        Ok(other) => Err(RepoError::InvalidData(format!(
            "entity did not serialize to an object: {other}"
        ))),
        Err(err) => Err(RepoError::InvalidData(err.to_string())),
    }
}

fn from_document<T: DeserializeOwned>(collection: &str, document: Document) -> RepoResult<T> {
    let id = document
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or("<no id>")
        .to_string();
    serde_json::from_value(Value::Object(document))
        .map_err(|err| RepoError::InvalidData(format!("{collection}/{id}: {err}")))
}

/// Inclusive numeric range; open ends are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NumericRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumericRange {
    pub fn between(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn at_least(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub fn at_most(max: f64) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    pub fn is_open(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }

    pub(crate) fn apply(&self, query: Query, field: &str) -> Query {
        let query = match self.min {
            Some(min) => query.gte(field, min),
            None => query,
        };
        match self.max {
            Some(max) => query.lte(field, max),
            None => query,
        }
    }
}

/// Inclusive epoch-millisecond range; open ends are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub from: Option<EpochMillis>,
    pub to: Option<EpochMillis>,
}

impl TimeRange {
    pub fn between(from: EpochMillis, to: EpochMillis) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn is_open(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    pub(crate) fn apply(&self, query: Query, field: &str) -> Query {
        let query = match self.from {
            Some(from) => query.gte(field, from),
            None => query,
        };
        match self.to {
            Some(to) => query.lte(field, to),
            None => query,
        }
    }
}
