//! Dimensioning Reconciler
//!
//! Derives the station count from the coverage and capacity constraints and
//! keeps whichever is stricter.

use tracing::debug;

use common::validation;
use common::{
    format_amount, round_to, CapacityReport, CoverageReport, DimensioningReport, ProjectParams,
    StageKind, ValidationError,
};

use crate::graph::PipelineStage;
use crate::StageError;

/// Largest station count a plan may require
pub const MAX_STATIONS: u64 = 1_000_000;

/// Station pricing
#[derive(Debug, Clone, PartialEq)]
pub struct CostParams {
    pub cost_per_station: f64,
    /// Free-form currency label, e.g. "USD"
    pub currency: String,
}

impl CostParams {
    pub fn new(cost_per_station: f64, currency: &str) -> Result<Self, ValidationError> {
        let params = Self {
            cost_per_station,
            currency: currency.trim().to_string(),
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::positive("cost_per_station", self.cost_per_station)?;
        validation::non_empty("currency", &self.currency)?;
        Ok(())
    }
}

/// `ceil(ratio)` as a station count, bounded by [`MAX_STATIONS`]
fn station_count(constraint: &str, ratio: f64) -> Result<u64, StageError> {
    if !ratio.is_finite() || ratio > MAX_STATIONS as f64 {
        return Err(StageError::InfeasibleGeometry(format!(
            "{} needs {} stations, above the limit of {}",
            constraint,
            ratio.ceil(),
            MAX_STATIONS
        )));
    }
    Ok(ratio.ceil() as u64)
}

fn unusable(kind: StageKind) -> StageError {
    StageError::PrerequisiteMissing {
        stage: PipelineStage::Dimensioning,
        missing: vec![kind],
    }
}

/// Reconcile coverage and capacity into a station count and cost
///
/// Stored prerequisites that cannot drive a station count (zero coverage
/// area, zero users per cell) are treated as missing. Counts above
/// [`MAX_STATIONS`] are infeasible.
pub fn reconcile(
    project: &ProjectParams,
    coverage: &CoverageReport,
    capacity: &CapacityReport,
    cost: &CostParams,
) -> Result<DimensioningReport, StageError> {
    cost.validate()?;
    let area = validation::positive("area_km2", project.area_km2)?;
    let density = validation::positive("user_density", project.user_density)?;

    let coverage_per_station = coverage.coverage_area_km2;
    if !coverage_per_station.is_finite() || coverage_per_station <= 0.0 {
        return Err(unusable(StageKind::Coverage));
    }
    let max_users = capacity.max_users;
    if max_users == 0 {
        return Err(unusable(StageKind::Capacity));
    }

    let total_users = area * density;
    let for_coverage = station_count("coverage", area / coverage_per_station)?;
    let for_capacity = station_count("capacity", total_users / max_users as f64)?;
    let required = for_coverage.max(for_capacity);

    let coverage_efficiency = if required == 0 {
        0.0
    } else {
        round_to(for_coverage as f64 / required as f64 * 100.0, 1)
    };
    let estimated_cost = required as f64 * cost.cost_per_station;

    debug!(
        "Dimensioning: {} stations for coverage, {} for capacity, {} required",
        for_coverage, for_capacity, required
    );

    Ok(DimensioningReport {
        area_km2: area,
        user_density: density,
        total_users,
        coverage_per_station_km2: coverage_per_station,
        max_users_per_station: max_users,
        stations_for_coverage: for_coverage,
        stations_for_capacity: for_capacity,
        stations_required: required,
        coverage_efficiency_pct: coverage_efficiency,
        cost_per_station: cost.cost_per_station,
        currency: cost.currency.clone(),
        estimated_cost,
        estimated_cost_display: format_amount(estimated_cost, &cost.currency),
    })
}
