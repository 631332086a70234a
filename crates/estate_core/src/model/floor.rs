//! Floor domain model.
//!
//! # Responsibility
//! - Define the building level record and its create/patch inputs.
//!
//! # Invariants
//! - `number` is a positive integer, unique across floors (enforced by repo).
//! - `apartment_count` is derived data. It is recounted from live apartments
//!   on every apartment write and is never accepted from callers.
//! - Hotspot lists are replaced as a whole on update; `angleHotspots` keys
//!   missing from an update are removed.

use super::hotspot::{validate_angle_hotspots, validate_hotspots, AngleHotspots, Hotspot};
use super::validation::{require_text, ValidationError};
use super::EpochMillis;
use serde::{Deserialize, Serialize};

/// Opaque floor identifier.
pub type FloorId = String;

pub(crate) const COLLECTION: &str = "floors";
pub(crate) const FIELD_NUMBER: &str = "number";
pub(crate) const FIELD_STATUS: &str = "status";
pub(crate) const FIELD_APARTMENT_COUNT: &str = "apartmentCount";
pub(crate) const FIELD_ANGLE_HOTSPOTS: &str = "angleHotspots";

/// Construction state of a floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FloorStatus {
    Active,
    UnderConstruction,
}

impl FloorStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::UnderConstruction => "UNDER_CONSTRUCTION",
        }
    }
}

/// Stored floor document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Floor {
    pub id: FloorId,
    pub number: u32,
    pub name: String,
    /// Download URL (or canonical path) of the floor's 3D model.
    #[serde(rename = "modelUrl", default, skip_serializing_if = "Option::is_none")]
    pub model_ref: Option<String>,
    pub status: FloorStatus,
    #[serde(default)]
    pub apartment_count: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top_view_hotspots: Vec<Hotspot>,
    #[serde(default, skip_serializing_if = "AngleHotspots::is_empty")]
    pub angle_hotspots: AngleHotspots,
    pub created_at: EpochMillis,
    pub updated_at: EpochMillis,
}

/// Create input for a floor.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFloor {
    pub number: u32,
    pub name: String,
    pub model_ref: Option<String>,
    pub status: FloorStatus,
}

impl NewFloor {
    pub fn new(number: u32, name: impl Into<String>, status: FloorStatus) -> Self {
        Self {
            number,
            name: name.into(),
            model_ref: None,
            status,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_number(self.number)?;
        require_text("name", &self.name)
    }

    pub(crate) fn into_floor(self, id: FloorId, now: EpochMillis) -> Floor {
        Floor {
            id,
            number: self.number,
            name: self.name,
            model_ref: self.model_ref,
            status: self.status,
            apartment_count: 0,
            top_view_hotspots: Vec::new(),
            angle_hotspots: AngleHotspots::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for a floor. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "modelUrl", skip_serializing_if = "Option::is_none")]
    pub model_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<FloorStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_view_hotspots: Option<Vec<Hotspot>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angle_hotspots: Option<AngleHotspots>,
}

impl FloorPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(number) = self.number {
            validate_number(number)?;
        }
        if let Some(name) = self.name.as_deref() {
            require_text("name", name)?;
        }
        if let Some(hotspots) = self.top_view_hotspots.as_deref() {
            validate_hotspots(hotspots)?;
        }
        if let Some(angles) = self.angle_hotspots.as_ref() {
            validate_angle_hotspots(angles)?;
        }
        Ok(())
    }
}

fn validate_number(number: u32) -> Result<(), ValidationError> {
    if number == 0 {
        return Err(ValidationError::NonPositive {
            field: "number",
            value: 0.0,
        });
    }
    Ok(())
}
