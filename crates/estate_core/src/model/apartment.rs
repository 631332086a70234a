//! Apartment domain model.
//!
//! # Invariants
//! - `floor_id` references an existing floor at write time.
//! - `lot_number` is unique within its floor (enforced by repo).
//! - `area > 0`, `price >= 0`.

use super::floor::FloorId;
use super::validation::{require_non_negative, require_positive, require_text, ValidationError};
use super::EpochMillis;
use serde::{Deserialize, Serialize};

/// Opaque apartment identifier.
pub type ApartmentId = String;

pub(crate) const COLLECTION: &str = "apartments";
pub(crate) const FIELD_FLOOR_ID: &str = "floorId";
pub(crate) const FIELD_LOT_NUMBER: &str = "lotNumber";
pub(crate) const FIELD_STATUS: &str = "status";
pub(crate) const FIELD_TYPE: &str = "type";
pub(crate) const FIELD_PRICE: &str = "price";
pub(crate) const FIELD_AREA: &str = "area";

/// Sales state of an apartment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApartmentStatus {
    Available,
    Reserved,
    Sold,
    UnderConstruction,
}

impl ApartmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Reserved => "RESERVED",
            Self::Sold => "SOLD",
            Self::UnderConstruction => "UNDER_CONSTRUCTION",
        }
    }
}

/// Stored apartment document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Apartment {
    pub id: ApartmentId,
    pub floor_id: FloorId,
    pub lot_number: String,
    /// Serialized as `type` to match the document schema.
    #[serde(rename = "type", default)]
    pub kind: String,
    pub area: f64,
    pub price: f64,
    pub status: ApartmentStatus,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub media_urls: Vec<String>,
    #[serde(rename = "model3dUrl", default, skip_serializing_if = "Option::is_none")]
    pub model_ref: Option<String>,
    pub created_at: EpochMillis,
    pub updated_at: EpochMillis,
}

/// Create input for an apartment.
#[derive(Debug, Clone, PartialEq)]
pub struct NewApartment {
    pub floor_id: FloorId,
    pub lot_number: String,
    pub kind: String,
    pub area: f64,
    pub price: f64,
    pub status: ApartmentStatus,
    pub description: String,
    pub media_urls: Vec<String>,
    pub model_ref: Option<String>,
}

impl NewApartment {
    /// Builds an input with the required fields; the rest start empty.
    pub fn new(
        floor_id: impl Into<FloorId>,
        lot_number: impl Into<String>,
        area: f64,
        price: f64,
        status: ApartmentStatus,
    ) -> Self {
        Self {
            floor_id: floor_id.into(),
            lot_number: lot_number.into(),
            kind: String::new(),
            area,
            price,
            status,
            description: String::new(),
            media_urls: Vec::new(),
            model_ref: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("floorId", &self.floor_id)?;
        require_text("lotNumber", &self.lot_number)?;
        require_positive("area", self.area)?;
        require_non_negative("price", self.price)
    }

    pub(crate) fn into_apartment(self, id: ApartmentId, now: EpochMillis) -> Apartment {
        Apartment {
            id,
            floor_id: self.floor_id,
            lot_number: self.lot_number,
            kind: self.kind,
            area: self.area,
            price: self.price,
            status: self.status,
            description: self.description,
            media_urls: self.media_urls,
            model_ref: self.model_ref,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for an apartment.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApartmentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor_id: Option<FloorId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lot_number: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ApartmentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_urls: Option<Vec<String>>,
    #[serde(rename = "model3dUrl", skip_serializing_if = "Option::is_none")]
    pub model_ref: Option<String>,
}

impl ApartmentPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(floor_id) = self.floor_id.as_deref() {
            require_text("floorId", floor_id)?;
        }
        if let Some(lot_number) = self.lot_number.as_deref() {
            require_text("lotNumber", lot_number)?;
        }
        if let Some(area) = self.area {
            require_positive("area", area)?;
        }
        if let Some(price) = self.price {
            require_non_negative("price", price)?;
        }
        Ok(())
    }
}

/// Display-side resolution of an apartment id that may dangle.
#[derive(Debug, Clone, PartialEq)]
pub enum ApartmentRef {
    Known(Apartment),
    Unknown(ApartmentId),
}

impl ApartmentRef {
    pub fn id(&self) -> &str {
        match self {
            Self::Known(apartment) => &apartment.id,
            Self::Unknown(id) => id,
        }
    }

    /// Human label: the lot number, or a placeholder for dangling ids.
    pub fn label(&self) -> String {
        match self {
            Self::Known(apartment) => apartment.lot_number.clone(),
            Self::Unknown(_) => "unknown apartment".to_string(),
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }
}
