//! Repository layer over the document and blob store ports.
//!
//! # Responsibility
//! - `CatalogRepository`: floors, apartments, pictures and buyers.
//! - `AssetRepository`: binary assets under canonical paths.
//!
//! # Invariants
//! - Write inputs are validated before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `Conflict`) in
//!   addition to store transport errors, and never retry.
//! - Callers only ever see plain entities and descriptors, never store
//!   handles.

pub mod apartment_repo;
pub mod assets;
pub mod buyer_repo;
pub mod catalog;
mod error;
pub mod floor_repo;
pub mod picture_repo;

pub use apartment_repo::ApartmentFilter;
pub use assets::{
    AssetDescriptor, AssetError, AssetListing, AssetRepository, AssetResult, CollisionPolicy,
    DefaultAssetLookup,
};
pub use buyer_repo::BuyerFilter;
pub use catalog::{CatalogRepository, NumericRange, TimeRange};
pub use error::{RepoError, RepoResult};
pub use floor_repo::FloorFilter;
pub use picture_repo::PictureFilter;
