//! Planning Stages Library
//!
//! This crate implements the planning pipeline: COST-231 Hata coverage,
//! Shannon capacity, station dimensioning and radial site placement, tied
//! together by an explicit stage dependency graph.

pub mod capacity;
pub mod dimensioning;
pub mod graph;
pub mod placement;
pub mod planner;
pub mod propagation;

pub use capacity::CapacityParams;
pub use dimensioning::CostParams;
pub use graph::{PipelineStage, Prerequisites};
pub use placement::PlacementSettings;
pub use planner::{PipelineInputs, PlanSummary, Planner, PlannerSettings};
pub use propagation::PropagationParams;

use common::{ProjectId, StageKind, ValidationError};
use interfaces::InterfaceError;
use thiserror::Error;

/// Errors raised by the planning stages
#[derive(Error, Debug)]
pub enum StageError {
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Project not found: {0}")]
    ProjectNotFound(ProjectId),

    #[error("{stage} stage requires results that are not available: {missing:?}")]
    PrerequisiteMissing {
        stage: PipelineStage,
        missing: Vec<StageKind>,
    },

    #[error("Project {0} has no reference latitude/longitude")]
    MissingReferenceLocation(ProjectId),

    #[error("Infeasible geometry: {0}")]
    InfeasibleGeometry(String),

    #[error("Placement of {requested} sites exceeds the limit of {limit}")]
    TooManySites { requested: u64, limit: u64 },

    #[error("Persistence error: {0}")]
    Persistence(#[from] InterfaceError),
}
