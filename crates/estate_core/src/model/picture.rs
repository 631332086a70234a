//! Picture domain model.
//!
//! Pictures have no `updatedAt`; reordering rewrites `order` in place.

use super::apartment::ApartmentId;
use super::validation::{require_text, ValidationError};
use super::EpochMillis;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Opaque picture identifier.
pub type PictureId = String;

pub(crate) const COLLECTION: &str = "pictures";
pub(crate) const FIELD_APARTMENT_ID: &str = "apartmentId";
pub(crate) const FIELD_TYPE: &str = "type";

/// Presentation role of a picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PictureType {
    Main,
    Interior,
    Exterior,
    FloorPlan,
}

impl PictureType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Main => "MAIN",
            Self::Interior => "INTERIOR",
            Self::Exterior => "EXTERIOR",
            Self::FloorPlan => "FLOOR_PLAN",
        }
    }
}

/// Stored picture document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Picture {
    pub id: PictureId,
    pub apartment_id: ApartmentId,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: PictureType,
    pub order: i64,
    pub created_at: EpochMillis,
}

impl Picture {
    /// Display order: `order` ascending, then creation time ascending.
    pub fn display_cmp(&self, other: &Self) -> Ordering {
        self.order
            .cmp(&other.order)
            .then(self.created_at.cmp(&other.created_at))
    }
}

/// Create input for a picture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPicture {
    pub apartment_id: ApartmentId,
    pub url: String,
    pub kind: PictureType,
    pub order: i64,
}

impl NewPicture {
    pub fn new(
        apartment_id: impl Into<ApartmentId>,
        url: impl Into<String>,
        kind: PictureType,
        order: i64,
    ) -> Self {
        Self {
            apartment_id: apartment_id.into(),
            url: url.into(),
            kind,
            order,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("apartmentId", &self.apartment_id)?;
        require_text("url", &self.url)
    }

    pub(crate) fn into_picture(self, id: PictureId, now: EpochMillis) -> Picture {
        Picture {
            id,
            apartment_id: self.apartment_id,
            url: self.url,
            kind: self.kind,
            order: self.order,
            created_at: now,
        }
    }
}

/// Partial update for a picture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PicturePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<PictureType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl PicturePatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(url) = self.url.as_deref() {
            require_text("url", url)?;
        }
        Ok(())
    }
}

/// Sorts pictures into display order. The sort is stable, so pictures with
/// equal `order` and `created_at` keep their incoming (insertion) order.
pub fn sort_for_display(pictures: &mut [Picture]) {
    pictures.sort_by(Picture::display_cmp);
}
