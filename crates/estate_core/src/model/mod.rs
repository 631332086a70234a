//! Catalog domain model.
//!
//! # Responsibility
//! - Define the persisted shapes of floors, apartments, pictures and buyers,
//!   plus the hotspots that place apartments on floor images.
//! - Validate create inputs and partial updates before they reach a store.
//!
//! # Invariants
//! - Every entity carries a store-independent string id assigned at creation.
//! - Timestamps are Unix epoch milliseconds.
//! - Partial updates serialize only the fields they carry.

pub mod apartment;
pub mod buyer;
pub mod floor;
pub mod hotspot;
pub mod picture;
pub mod validation;

pub use validation::ValidationError;

use std::time::{SystemTime, UNIX_EPOCH};

/// Unix epoch milliseconds.
pub type EpochMillis = i64;

/// Current wall-clock time in epoch milliseconds.
pub fn now_epoch_ms() -> EpochMillis {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Fresh opaque identifier for a new document.
pub fn new_document_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
