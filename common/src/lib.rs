//! Common Utilities and Types Library
//!
//! This crate provides the domain records shared by the planning stages,
//! the storage and geocoding interfaces, and the planner binary.

pub mod report;
pub mod types;
pub mod utils;
pub mod validation;

// Re-export commonly used items
pub use report::*;
pub use types::*;
pub use utils::*;
pub use validation::ValidationError;
