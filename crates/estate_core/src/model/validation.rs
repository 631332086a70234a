//! Shared validation errors for catalog write inputs.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Validation failure raised before any document is written.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Required text field is missing or blank.
    MissingField(&'static str),
    /// Field must be strictly greater than zero.
    NonPositive { field: &'static str, value: f64 },
    /// Field must be zero or greater.
    Negative { field: &'static str, value: f64 },
    /// Field value is outside the accepted shape.
    InvalidValue {
        field: &'static str,
        reason: String,
    },
    /// A parent id on create/update does not resolve to a stored document.
    DanglingReference { field: &'static str, id: String },
    /// A value that must be unique is already taken.
    Duplicate { field: &'static str, value: String },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "required field `{field}` is missing"),
            Self::NonPositive { field, value } => {
                write!(f, "`{field}` must be positive, got {value}")
            }
            Self::Negative { field, value } => {
                write!(f, "`{field}` must not be negative, got {value}")
            }
            Self::InvalidValue { field, reason } => write!(f, "invalid `{field}`: {reason}"),
            Self::DanglingReference { field, id } => {
                write!(f, "`{field}` references unknown id `{id}`")
            }
            Self::Duplicate { field, value } => {
                write!(f, "`{field}` value `{value}` is already in use")
            }
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

pub(crate) fn require_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::NonPositive { field, value });
    }
    Ok(())
}

pub(crate) fn require_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::Negative { field, value });
    }
    Ok(())
}
