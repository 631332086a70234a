//! Hotspots placing apartments on floor images.
//!
//! # Invariants
//! - Coordinates and sizes are percentages of the image, within `0..=100`.
//! - `apartmentId` is not checked on write; dangling ids surface as
//!   `ApartmentRef::Unknown` when hotspots are resolved.

use super::apartment::ApartmentId;
use super::validation::{require_text, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hotspots per viewing angle, keyed by the angle label (e.g. `"90"`).
pub type AngleHotspots = BTreeMap<String, Vec<Hotspot>>;

/// Clickable region of a floor image linked to one apartment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotspot {
    pub apartment_id: ApartmentId,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl Hotspot {
    pub fn new(apartment_id: impl Into<ApartmentId>, x: f64, y: f64) -> Self {
        Self {
            apartment_id: apartment_id.into(),
            x,
            y,
            width: None,
            height: None,
        }
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("apartmentId", &self.apartment_id)?;
        require_percentage("x", self.x)?;
        require_percentage("y", self.y)?;
        if let Some(width) = self.width {
            require_percentage("width", width)?;
        }
        if let Some(height) = self.height {
            require_percentage("height", height)?;
        }
        Ok(())
    }
}

pub(crate) fn validate_hotspots(hotspots: &[Hotspot]) -> Result<(), ValidationError> {
    hotspots.iter().try_for_each(Hotspot::validate)
}

pub(crate) fn validate_angle_hotspots(angles: &AngleHotspots) -> Result<(), ValidationError> {
    for (angle, hotspots) in angles {
        require_text("angleHotspots", angle)?;
        validate_hotspots(hotspots)?;
    }
    Ok(())
}

fn require_percentage(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(ValidationError::InvalidValue {
            field,
            reason: format!("must be a percentage between 0 and 100, got {value}"),
        });
    }
    Ok(())
}
