//! Stage Result Records
//!
//! Headline metrics and the audit reports written by each planning stage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Modulation, ProjectId, StageKind, ZoneType};

/// Headline metric of a stage result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "metric", content = "value", rename_all = "snake_case")]
pub enum Headline {
    /// Area covered by one cell
    CoverageAreaKm2(f64),
    /// Practical cell throughput
    CapacityMbps(f64),
    /// Stations required by the binding constraint
    StationCount(u64),
}

impl Headline {
    /// Stage kind this metric belongs to
    pub fn kind(&self) -> StageKind {
        match self {
            Headline::CoverageAreaKm2(_) => StageKind::Coverage,
            Headline::CapacityMbps(_) => StageKind::Capacity,
            Headline::StationCount(_) => StageKind::Gnodeb,
        }
    }
}

/// COST-231 Hata propagation report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub frequency_mhz: f64,
    pub zone_type: ZoneType,
    pub tx_power_dbm: f64,
    pub antenna_height_m: f64,
    pub user_height_m: f64,
    pub antenna_gain_dbi: f64,
    pub system_losses_db: f64,
    pub receiver_sensitivity_dbm: f64,
    /// a(hm) mobile antenna height correction
    pub mobile_height_correction_db: f64,
    /// Cm metropolitan correction
    pub zone_correction_db: f64,
    /// Lmax = power - sensitivity
    pub max_path_loss_db: f64,
    pub log10_radius: f64,
    pub radius_km: f64,
    pub coverage_area_km2: f64,
    /// Path loss recomputed at the solved radius
    pub path_loss_db: f64,
    pub link_budget_db: f64,
}

/// Shannon capacity report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityReport {
    pub modulation: Modulation,
    /// Bits per symbol (η)
    pub spectral_efficiency: u8,
    pub snr: f64,
    pub bandwidth_mhz: f64,
    pub theoretical_capacity_mbps: f64,
    pub practical_capacity_mbps: f64,
    pub practical_efficiency_factor: f64,
    pub per_user_throughput_mbps: f64,
    pub total_users: f64,
    pub total_demand_mbps: f64,
    pub max_users: u64,
    /// Practical over theoretical capacity, two decimals
    pub efficiency_pct: f64,
}

/// Dimensioning report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensioningReport {
    pub area_km2: f64,
    pub user_density: f64,
    pub total_users: f64,
    pub coverage_per_station_km2: f64,
    pub max_users_per_station: u64,
    pub stations_for_coverage: u64,
    pub stations_for_capacity: u64,
    /// max(stations_for_coverage, stations_for_capacity)
    pub stations_required: u64,
    /// Coverage-driven share of the binding count, one decimal
    pub coverage_efficiency_pct: f64,
    pub cost_per_station: f64,
    pub currency: String,
    pub estimated_cost: f64,
    /// e.g. "300,000 USD"
    pub estimated_cost_display: String,
}

/// Report payload, tagged by stage kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "UPPERCASE")]
pub enum StageReport {
    Coverage(CoverageReport),
    Capacity(CapacityReport),
    Gnodeb(DimensioningReport),
}

impl StageReport {
    pub fn kind(&self) -> StageKind {
        match self {
            StageReport::Coverage(_) => StageKind::Coverage,
            StageReport::Capacity(_) => StageKind::Capacity,
            StageReport::Gnodeb(_) => StageKind::Gnodeb,
        }
    }

    /// Headline metric derived from the report
    pub fn headline(&self) -> Headline {
        match self {
            StageReport::Coverage(r) => Headline::CoverageAreaKm2(r.coverage_area_km2),
            StageReport::Capacity(r) => Headline::CapacityMbps(r.practical_capacity_mbps),
            StageReport::Gnodeb(r) => Headline::StationCount(r.stations_required),
        }
    }
}

/// Persisted result of one stage for one project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub project_id: ProjectId,
    pub kind: StageKind,
    pub headline: Headline,
    pub report: StageReport,
    pub computed_at: DateTime<Utc>,
}

impl StageResult {
    pub fn coverage(&self) -> Option<&CoverageReport> {
        match &self.report {
            StageReport::Coverage(r) => Some(r),
            _ => None,
        }
    }

    pub fn capacity(&self) -> Option<&CapacityReport> {
        match &self.report {
            StageReport::Capacity(r) => Some(r),
            _ => None,
        }
    }

    pub fn dimensioning(&self) -> Option<&DimensioningReport> {
        match &self.report {
            StageReport::Gnodeb(r) => Some(r),
            _ => None,
        }
    }
}
