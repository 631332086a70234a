//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep callers decoupled from storage details.

pub mod catalog_service;

pub use catalog_service::{
    ApartmentWithPictures, CatalogService, CatalogServiceError, CatalogServiceResult,
    FloorHotspots, FloorOverview, PanoramaView, PlacedHotspot,
};
