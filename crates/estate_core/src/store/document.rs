//! Generic keyed-document store contract.
//!
//! # Responsibility
//! - Describe the CRUD + predicate-query surface repositories rely on.
//! - Validate query shapes against what a document store evaluates natively.
//!
//! # Invariants
//! - Range predicates (`Gte`/`Lte`) may target at most one field per query.
//! - At most one `ArrayContains` predicate per query.
//! - When a range field is present, `order_by` (if any) must use that field.
//! - Results without `order_by` are returned in insertion order.
//! - `update` merges top-level fields; the last writer wins.

use super::{StoreError, StoreResult};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

/// One stored document: a JSON object keyed by field name.
pub type Document = Map<String, Value>;

static FIELD_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid field name regex"));

/// Comparison operator of a query predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gte,
    Lte,
    ArrayContains,
}

impl FilterOp {
    fn is_range(self) -> bool {
        matches!(self, Self::Gte | Self::Lte)
    }
}

/// Single `{field, op, value}` predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

/// Sort direction of `order_by`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Conjunctive predicate query with optional ordering and limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub predicates: Vec<Predicate>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<u32>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: &str, op: FilterOp, value: impl Into<Value>) -> Self {
        self.predicates.push(Predicate {
            field: field.to_string(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Eq, value)
    }

    pub fn gte(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Gte, value)
    }

    pub fn lte(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Lte, value)
    }

    pub fn array_contains(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::ArrayContains, value)
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.to_string(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Field targeted by range predicates, if any.
    pub fn range_field(&self) -> Option<&str> {
        self.predicates
            .iter()
            .find(|predicate| predicate.op.is_range())
            .map(|predicate| predicate.field.as_str())
    }

    /// Rejects shapes a document store cannot evaluate natively.
    pub fn validate(&self) -> StoreResult<()> {
        for predicate in &self.predicates {
            validate_field_name(&predicate.field)?;
            if predicate.op.is_range() && !(predicate.value.is_number() || predicate.value.is_string())
            {
                return Err(StoreError::UnsupportedQuery(format!(
                    "range predicate on `{}` needs a number or string bound",
                    predicate.field
                )));
            }
        }

        let range_field = self.range_field();
        if let Some(range_field) = range_field {
            let second = self
                .predicates
                .iter()
                .find(|predicate| predicate.op.is_range() && predicate.field != range_field);
            if let Some(second) = second {
                return Err(StoreError::UnsupportedQuery(format!(
                    "range predicates on `{range_field}` and `{}` cannot be combined",
                    second.field
                )));
            }
        }

        let array_filters = self
            .predicates
            .iter()
            .filter(|predicate| predicate.op == FilterOp::ArrayContains)
            .count();
        if array_filters > 1 {
            return Err(StoreError::UnsupportedQuery(
                "at most one array-contains predicate per query".to_string(),
            ));
        }

        if let Some(order_by) = self.order_by.as_ref() {
            validate_field_name(&order_by.field)?;
            if let Some(range_field) = range_field {
                if order_by.field != range_field {
                    return Err(StoreError::UnsupportedQuery(format!(
                        "order_by `{}` must match range field `{range_field}`",
                        order_by.field
                    )));
                }
            }
        }

        Ok(())
    }
}

fn validate_field_name(field: &str) -> StoreResult<()> {
    if FIELD_NAME_RE.is_match(field) {
        return Ok(());
    }
    Err(StoreError::UnsupportedQuery(format!(
        "invalid field name `{field}`"
    )))
}

/// Outcome of a delete guarded by a dependent-reference check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardedDelete {
    Deleted,
    Missing,
    /// Delete refused; at least this many dependents still reference the id.
    Referenced(u64),
}

/// Keyed-document store consumed by the catalog repository.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a new document. Fails if `id` is already present.
    async fn create(&self, collection: &str, id: &str, fields: Document) -> StoreResult<()>;

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Merges `fields` into the stored document. Returns `false` when absent.
    async fn update(&self, collection: &str, id: &str, fields: Document) -> StoreResult<bool>;

    /// Removes a document. Returns `false` when absent.
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool>;

    async fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<Document>>;

    /// Number of documents matching the predicates of `query`. `limit` and
    /// `order_by` are ignored.
    async fn count(&self, collection: &str, query: &Query) -> StoreResult<u64> {
        let unbounded = Query {
            predicates: query.predicates.clone(),
            order_by: None,
            limit: None,
        };
        Ok(self.query(collection, &unbounded).await?.len() as u64)
    }

    /// Deletes `collection/id` only while no document in `dependents` has
    /// `field == id`.
    ///
    /// The default is check-then-delete and can race with a concurrent
    /// dependent insert. Adapters with transactions should override it.
    async fn delete_unless_referenced(
        &self,
        collection: &str,
        id: &str,
        dependents: &str,
        field: &str,
    ) -> StoreResult<GuardedDelete> {
        let referencing = self
            .query(dependents, &Query::new().eq(field, id).limit(1))
            .await?;
        if !referencing.is_empty() {
            return Ok(GuardedDelete::Referenced(referencing.len() as u64));
        }
        if self.delete(collection, id).await? {
            Ok(GuardedDelete::Deleted)
        } else {
            Ok(GuardedDelete::Missing)
        }
    }
}
