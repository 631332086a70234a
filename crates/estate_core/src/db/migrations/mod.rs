//! Schema migrations for the shared `documents` table.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - All pending migrations apply in one transaction.
//! - After migrating, every object in [`DOCUMENT_SCHEMA`] exists.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::{params, Connection};

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "documents",
        sql: include_str!("0001_documents.sql"),
    },
    Migration {
        version: 2,
        name: "collection_indexes",
        sql: include_str!("0002_collection_indexes.sql"),
    },
];

/// Tables and indexes the document store relies on, as `(kind, name)`.
pub const DOCUMENT_SCHEMA: &[(&str, &str)] = &[
    ("table", "documents"),
    ("index", "idx_documents_collection"),
    ("index", "idx_apartments_floor"),
    ("index", "idx_pictures_apartment"),
];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Brings the connection to the latest document schema.
///
/// A database already at the latest version is only checked against
/// [`DOCUMENT_SCHEMA`].
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let current_version = current_user_version(conn)?;
    let latest = latest_version();

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    if current_version < latest {
        let tx = conn.transaction()?;
        for migration in MIGRATIONS
            .iter()
            .filter(|migration| migration.version > current_version)
        {
            tx.execute_batch(migration.sql)?;
            tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
            debug!(
                "event=db_migration_apply module=db status=ok version={} name={}",
                migration.version, migration.name
            );
        }
        tx.commit()?;
        info!(
            "event=db_migrate module=db status=ok from_version={current_version} to_version={latest}"
        );
    }

    verify_document_schema(conn)
}

/// Fails with `DbError::MissingSchemaObject` for the first absent object.
pub fn verify_document_schema(conn: &Connection) -> DbResult<()> {
    let mut statement =
        conn.prepare("SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = ?1 AND name = ?2);")?;
    for &(kind, name) in DOCUMENT_SCHEMA {
        let present: bool = statement.query_row(params![kind, name], |row| row.get(0))?;
        if !present {
            return Err(DbError::MissingSchemaObject { kind, name });
        }
    }
    Ok(())
}

fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
