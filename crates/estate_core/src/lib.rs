//! Core domain logic for the real-estate catalog.
//! This crate is the single source of truth for catalog invariants and the
//! canonical asset layout.

pub mod asset;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use asset::{resolve_path, AssetClass, AssetKind, DefaultAsset, PathError};
pub use config::{CatalogConfig, ConfigError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::apartment::{Apartment, ApartmentPatch, ApartmentRef, ApartmentStatus, NewApartment};
pub use model::buyer::{Buyer, BuyerContact, BuyerPatch, BuyerStatus, NewBuyer};
pub use model::floor::{Floor, FloorPatch, FloorStatus, NewFloor};
pub use model::hotspot::{AngleHotspots, Hotspot};
pub use model::picture::{NewPicture, Picture, PicturePatch, PictureType};
pub use model::ValidationError;
pub use repo::{
    ApartmentFilter, AssetDescriptor, AssetError, AssetRepository, BuyerFilter, CatalogRepository,
    CollisionPolicy, DefaultAssetLookup, FloorFilter, NumericRange, PictureFilter, RepoError,
    RepoResult, TimeRange,
};
pub use service::{CatalogService, CatalogServiceError, CatalogServiceResult};
pub use store::local_blob::LocalBlobStore;
pub use store::memory_blob::MemoryBlobStore;
pub use store::sqlite::SqliteDocumentStore;
pub use store::{StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
