//! SQLite-backed document store.
//!
//! # Responsibility
//! - Persist JSON documents in the single `documents` table.
//! - Evaluate `Query` predicates with `json_extract` / `json_each`.
//!
//! # Invariants
//! - Every query is validated before SQL is built; field names never reach
//!   SQL text, they are bound as JSON paths.
//! - Connection work runs on the blocking pool, never on the async worker.
//! - `delete_unless_referenced` runs inside one IMMEDIATE transaction.

use super::document::{Direction, Document, DocumentStore, FilterOp, GuardedDelete, Query};
use super::{StoreError, StoreResult};
use crate::db::{open_db, open_db_in_memory, DbError};
use async_trait::async_trait;
use log::debug;
use rusqlite::types::Value as SqlValue;
use rusqlite::{
    params, params_from_iter, Connection, ErrorCode, OptionalExtension, TransactionBehavior,
};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Document store over one shared SQLite connection.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDocumentStore {
    /// Wraps an already migrated connection (see `crate::db::open_db`).
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    async fn run<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| StoreError::Db(DbError::ConnectionPoisoned))?;
            f(&mut guard)
        })
        .await
        .map_err(|err| StoreError::Task(err.to_string()))?
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn create(&self, collection: &str, id: &str, fields: Document) -> StoreResult<()> {
        let collection = collection.to_string();
        let id = id.to_string();
        let body = serde_json::to_string(&fields)?;
        self.run(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3);",
                params![collection, id, body],
            );
            match inserted {
                Ok(_) => Ok(()),
                Err(rusqlite::Error::SqliteFailure(failure, _))
                    if failure.code == ErrorCode::ConstraintViolation =>
                {
                    Err(StoreError::AlreadyExists(format!("{collection}/{id}")))
                }
                Err(err) => Err(err.into()),
            }
        })
        .await
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let collection = collection.to_string();
        let id = id.to_string();
        self.run(move |conn| {
            let body: Option<String> = conn
                .query_row(
                    "SELECT body FROM documents WHERE collection = ?1 AND id = ?2;",
                    params![collection, id],
                    |row| row.get(0),
                )
                .optional()?;
            body.map(|body| parse_body(&body)).transpose()
        })
        .await
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> StoreResult<bool> {
        let collection = collection.to_string();
        let id = id.to_string();
        let patch = serde_json::to_string(&fields)?;
        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE documents
                 SET body = json_patch(body, ?3)
                 WHERE collection = ?1 AND id = ?2;",
                params![collection, id, patch],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        let collection = collection.to_string();
        let id = id.to_string();
        self.run(move |conn| {
            let changed = conn.execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2;",
                params![collection, id],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    async fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<Document>> {
        query.validate()?;
        let (sql, binds) = build_select(collection, query, Projection::Body);
        debug!(
            "event=doc_query module=store collection={} predicates={}",
            collection,
            query.predicates.len()
        );
        self.run(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(binds))?;
            let mut documents = Vec::new();
            while let Some(row) = rows.next()? {
                let body: String = row.get(0)?;
                documents.push(parse_body(&body)?);
            }
            Ok(documents)
        })
        .await
    }

    async fn count(&self, collection: &str, query: &Query) -> StoreResult<u64> {
        query.validate()?;
        let (sql, binds) = build_select(collection, query, Projection::Count);
        self.run(move |conn| {
            let count: i64 = conn.query_row(&sql, params_from_iter(binds), |row| row.get(0))?;
            Ok(u64::try_from(count).unwrap_or(0))
        })
        .await
    }

    async fn delete_unless_referenced(
        &self,
        collection: &str,
        id: &str,
        dependents: &str,
        field: &str,
    ) -> StoreResult<GuardedDelete> {
        let guard = Query::new().eq(field, id);
        guard.validate()?;
        let (count_sql, binds) = build_select(dependents, &guard, Projection::Count);
        let collection = collection.to_string();
        let id = id.to_string();
        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let referencing: i64 =
                tx.query_row(&count_sql, params_from_iter(binds), |row| row.get(0))?;
            if referencing > 0 {
                return Ok(GuardedDelete::Referenced(
                    u64::try_from(referencing).unwrap_or(0),
                ));
            }
            let changed = tx.execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2;",
                params![collection, id],
            )?;
            tx.commit()?;
            if changed == 0 {
                Ok(GuardedDelete::Missing)
            } else {
                Ok(GuardedDelete::Deleted)
            }
        })
        .await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Projection {
    Body,
    Count,
}

/// Builds SQL text plus bind values for a validated query.
fn build_select(collection: &str, query: &Query, projection: Projection) -> (String, Vec<SqlValue>) {
    let mut sql = match projection {
        Projection::Body => String::from("SELECT body FROM documents WHERE collection = ?"),
        Projection::Count => String::from("SELECT COUNT(*) FROM documents WHERE collection = ?"),
    };
    let mut binds = vec![SqlValue::Text(collection.to_string())];

    for predicate in &query.predicates {
        let path = SqlValue::Text(format!("$.{}", predicate.field));
        match predicate.op {
            FilterOp::Eq if predicate.value.is_null() => {
                sql.push_str(" AND json_extract(body, ?) IS NULL");
                binds.push(path);
            }
            FilterOp::Eq => {
                sql.push_str(" AND json_extract(body, ?) = ?");
                binds.push(path);
                binds.push(json_to_sql(&predicate.value));
            }
            FilterOp::Gte => {
                sql.push_str(" AND json_extract(body, ?) >= ?");
                binds.push(path);
                binds.push(json_to_sql(&predicate.value));
            }
            FilterOp::Lte => {
                sql.push_str(" AND json_extract(body, ?) <= ?");
                binds.push(path);
                binds.push(json_to_sql(&predicate.value));
            }
            FilterOp::ArrayContains => {
                sql.push_str(
                    " AND EXISTS (SELECT 1 FROM json_each(documents.body, ?) AS item WHERE item.value = ?)",
                );
                binds.push(path);
                binds.push(json_to_sql(&predicate.value));
            }
        }
    }

    if projection == Projection::Body {
        if let Some(order_by) = query.order_by.as_ref() {
            let direction = match order_by.direction {
                Direction::Asc => "ASC",
                Direction::Desc => "DESC",
            };
            sql.push_str(&format!(" ORDER BY json_extract(body, ?) {direction}, seq ASC"));
            binds.push(SqlValue::Text(format!("$.{}", order_by.field)));
        } else {
            sql.push_str(" ORDER BY seq ASC");
        }

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            binds.push(SqlValue::Integer(i64::from(limit)));
        }
    }

    (sql, binds)
}

fn json_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(flag) => SqlValue::Integer(i64::from(*flag)),
        Value::Number(number) => match number.as_i64() {
            Some(integer) => SqlValue::Integer(integer),
            None => SqlValue::Real(number.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(text) => SqlValue::Text(text.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn parse_body(body: &str) -> StoreResult<Document> {
    match serde_json::from_str::<Value>(body)? {
        Value::Object(document) => Ok(document),
        other => Err(StoreError::InvalidData(format!(
            "document body is not an object: {other}"
        ))),
    }
}
