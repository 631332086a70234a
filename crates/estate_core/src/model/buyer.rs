//! Buyer domain model.
//!
//! # Invariants
//! - `interested_apartment_ids` is an unowned back-reference list. Entries may
//!   dangle after an apartment is deleted and are resolved lazily.
//! - `status` uses one canonical vocabulary. Documents carrying any other
//!   status string fail to decode instead of being mapped onto this set.

use super::apartment::ApartmentId;
use super::validation::{require_non_negative, require_text, ValidationError};
use super::EpochMillis;
use serde::{Deserialize, Serialize};

/// Opaque buyer identifier.
pub type BuyerId = String;

pub(crate) const COLLECTION: &str = "buyers";
pub(crate) const FIELD_STATUS: &str = "status";
pub(crate) const FIELD_INTERESTED_APARTMENT_IDS: &str = "interestedApartmentIds";
pub(crate) const FIELD_CREATED_AT: &str = "createdAt";

/// Sales pipeline state of a buyer. Decoding goes through
/// [`BuyerStatus::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "String")]
pub enum BuyerStatus {
    Interested,
    Negotiating,
    Purchased,
    Cancelled,
}

impl BuyerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Interested => "INTERESTED",
            Self::Negotiating => "NEGOTIATING",
            Self::Purchased => "PURCHASED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parses the canonical wire value. Legacy values such as
    /// `VIEWING_SCHEDULED` or `CONTRACTED` are rejected.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value {
            "INTERESTED" => Ok(Self::Interested),
            "NEGOTIATING" => Ok(Self::Negotiating),
            "PURCHASED" => Ok(Self::Purchased),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(ValidationError::InvalidValue {
                field: "status",
                reason: format!(
                    "`{other}` is not one of INTERESTED|NEGOTIATING|PURCHASED|CANCELLED"
                ),
            }),
        }
    }
}

impl TryFrom<String> for BuyerStatus {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

/// Contact channels of a buyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerContact {
    pub email: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl BuyerContact {
    pub fn new(email: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            phone: phone.into(),
            address: None,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("contact.email", &self.email)?;
        if !self.email.contains('@') {
            return Err(ValidationError::InvalidValue {
                field: "contact.email",
                reason: format!("`{}` is not an email address", self.email),
            });
        }
        require_text("contact.phone", &self.phone)
    }
}

/// Stored buyer document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buyer {
    pub id: BuyerId,
    pub name: String,
    pub contact: BuyerContact,
    #[serde(default)]
    pub interested_apartment_ids: Vec<ApartmentId>,
    pub status: BuyerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_date: Option<EpochMillis>,
    pub created_at: EpochMillis,
    pub updated_at: EpochMillis,
}

/// Create input for a buyer.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBuyer {
    pub name: String,
    pub contact: BuyerContact,
    pub interested_apartment_ids: Vec<ApartmentId>,
    pub status: BuyerStatus,
    pub budget: Option<f64>,
    pub notes: String,
    pub assigned_agent: Option<String>,
    pub contact_date: Option<EpochMillis>,
}

impl NewBuyer {
    pub fn new(name: impl Into<String>, contact: BuyerContact, status: BuyerStatus) -> Self {
        Self {
            name: name.into(),
            contact,
            interested_apartment_ids: Vec::new(),
            status,
            budget: None,
            notes: String::new(),
            assigned_agent: None,
            contact_date: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        self.contact.validate()?;
        if let Some(budget) = self.budget {
            require_non_negative("budget", budget)?;
        }
        Ok(())
    }

    pub(crate) fn into_buyer(self, id: BuyerId, now: EpochMillis) -> Buyer {
        Buyer {
            id,
            name: self.name,
            contact: self.contact,
            interested_apartment_ids: self.interested_apartment_ids,
            status: self.status,
            budget: self.budget,
            notes: self.notes,
            assigned_agent: self.assigned_agent,
            contact_date: self.contact_date,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for a buyer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<BuyerContact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interested_apartment_ids: Option<Vec<ApartmentId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BuyerStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_date: Option<EpochMillis>,
}

impl BuyerPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = self.name.as_deref() {
            require_text("name", name)?;
        }
        if let Some(contact) = self.contact.as_ref() {
            contact.validate()?;
        }
        if let Some(budget) = self.budget {
            require_non_negative("budget", budget)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Buyer, BuyerContact, BuyerStatus, NewBuyer};
    use serde_json::json;

    #[test]
    fn legacy_status_values_are_rejected() {
        assert_eq!(
            BuyerStatus::parse("PURCHASED").unwrap(),
            BuyerStatus::Purchased
        );
        assert!(BuyerStatus::parse("VIEWING_SCHEDULED").is_err());
        assert!(BuyerStatus::parse("CONTRACTED").is_err());
    }

    #[test]
    fn legacy_status_document_fails_to_decode() {
        let doc = json!({
            "id": "B1",
            "name": "Ada",
            "contact": { "email": "ada@example.com", "phone": "123" },
            "status": "CONTRACTED",
            "createdAt": 1,
            "updatedAt": 1
        });
        let err = serde_json::from_value::<Buyer>(doc).unwrap_err();
        assert!(err.to_string().contains("`CONTRACTED` is not one of"));
    }

    #[test]
    fn buyer_requires_email_shape() {
        let bad = NewBuyer::new(
            "Ada",
            BuyerContact::new("not-an-email", "123"),
            BuyerStatus::Interested,
        );
        assert!(bad.validate().is_err());

        let mut good = NewBuyer::new(
            "Ada",
            BuyerContact::new("ada@example.com", "123"),
            BuyerStatus::Interested,
        );
        good.budget = Some(250_000.0);
        assert!(good.validate().is_ok());
    }
}
