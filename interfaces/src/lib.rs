//! Planning Collaborator Interfaces Library
//!
//! This crate provides the storage and reverse-geocoding seams consumed by
//! the planning stages, along with in-memory and HTTP implementations.

pub mod geocoding;
pub mod memory_store;
pub mod storage;

pub use geocoding::{Geocoder, HttpGeocoder, HttpGeocoderConfig, OfflineGeocoder};
pub use memory_store::MemoryStore;
pub use storage::PlanningStore;

use thiserror::Error;

/// Interface errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterfaceError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Conflicting record: {0}")]
    Conflict(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
