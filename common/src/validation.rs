//! Input Validation
//!
//! Field-level checks shared by project records, site records and stage inputs

use thiserror::Error;

/// Validation failures for planning inputs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field} is required")]
    Missing { field: &'static str },

    #[error("{field} must be a finite number, got {value}")]
    NotFinite { field: &'static str, value: f64 },

    #[error("{field} must be greater than zero, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("{field} out of range: {value} (expected {expected})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("Unsupported modulation scheme: {0}")]
    UnsupportedModulation(String),

    #[error("Unsupported zone type: {0}")]
    UnsupportedZone(String),

    #[error("Unsupported service: {0}")]
    UnsupportedService(String),

    #[error("Latitude and longitude must be provided together")]
    IncompleteLocation,
}

/// Unwrap an optional numeric field
pub fn required(field: &'static str, value: Option<f64>) -> Result<f64, ValidationError> {
    value.ok_or(ValidationError::Missing { field })
}

/// Reject NaN and infinities
pub fn finite(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValidationError::NotFinite { field, value })
    }
}

/// Require a finite, strictly positive value
pub fn positive(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    let value = finite(field, value)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(ValidationError::NotPositive { field, value })
    }
}

/// Require a present, finite, strictly positive value
pub fn required_positive(field: &'static str, value: Option<f64>) -> Result<f64, ValidationError> {
    positive(field, required(field, value)?)
}

/// Latitude in degrees (-90..=90)
pub fn latitude(value: f64) -> Result<f64, ValidationError> {
    let value = finite("latitude", value)?;
    if (-90.0..=90.0).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::OutOfRange {
            field: "latitude",
            value,
            expected: "-90 to 90 degrees",
        })
    }
}

/// Longitude in degrees (-180..=180)
pub fn longitude(value: f64) -> Result<f64, ValidationError> {
    let value = finite("longitude", value)?;
    if (-180.0..=180.0).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::OutOfRange {
            field: "longitude",
            value,
            expected: "-180 to 180 degrees",
        })
    }
}

/// Require a non-blank string, returning it trimmed
pub fn non_empty<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::Empty { field })
    } else {
        Ok(trimmed)
    }
}
