//! Capacity Model
//!
//! Shannon-bound cell throughput scaled by modulation efficiency, and the
//! user ceiling it supports.

use tracing::debug;

use common::validation;
use common::{round_to, CapacityReport, Modulation, ProjectParams, ValidationError};

use crate::StageError;

/// Share of the theoretical capacity left after protocol overhead
pub const PRACTICAL_EFFICIENCY: f64 = 0.70;

/// Per-call capacity parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapacityParams {
    /// Linear signal-to-noise ratio
    pub snr: f64,
    pub modulation: Modulation,
    /// Throughput each user must receive, in Mbps
    pub per_user_throughput_mbps: f64,
}

impl CapacityParams {
    /// Build from raw inputs; unknown modulation names are rejected
    pub fn new(
        snr: f64,
        modulation: &str,
        per_user_throughput_mbps: f64,
    ) -> Result<Self, ValidationError> {
        let params = Self {
            snr,
            modulation: modulation.parse()?,
            per_user_throughput_mbps,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::finite("snr", self.snr)?;
        validation::positive("per_user_throughput", self.per_user_throughput_mbps)?;
        Ok(())
    }
}

/// Spectrum and traffic fields taken from the project record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrafficProfile {
    pub bandwidth_mhz: f64,
    pub area_km2: f64,
    pub user_density: f64,
}

impl TrafficProfile {
    pub fn from_project(project: &ProjectParams) -> Result<Self, ValidationError> {
        Ok(Self {
            bandwidth_mhz: validation::positive("bandwidth_mhz", project.bandwidth_mhz)?,
            area_km2: validation::positive("area_km2", project.area_km2)?,
            user_density: validation::positive("user_density", project.user_density)?,
        })
    }

    pub fn total_users(&self) -> f64 {
        self.area_km2 * self.user_density
    }
}

/// Theoretical capacity in Mbps: B·log2(1 + SNR)·η
pub fn theoretical_capacity_mbps(bandwidth_mhz: f64, snr: f64, modulation: Modulation) -> f64 {
    let bandwidth_hz = bandwidth_mhz * 1e6;
    bandwidth_hz * (1.0 + snr).log2() * f64::from(modulation.bits_per_symbol()) / 1e6
}

/// Compute cell capacity and the number of users it can serve
pub fn compute_capacity(
    traffic: &TrafficProfile,
    params: &CapacityParams,
) -> Result<CapacityReport, StageError> {
    params.validate()?;

    let theoretical =
        theoretical_capacity_mbps(traffic.bandwidth_mhz, params.snr, params.modulation);
    if !theoretical.is_finite() || theoretical <= 0.0 {
        return Err(StageError::InfeasibleGeometry(format!(
            "theoretical capacity {} Mbps at SNR {} is not positive",
            theoretical, params.snr
        )));
    }

    let practical = theoretical * PRACTICAL_EFFICIENCY;
    let total_users = traffic.total_users();
    let total_demand = total_users * params.per_user_throughput_mbps;
    let max_users = (practical / params.per_user_throughput_mbps).floor() as u64;

    debug!(
        "Capacity: {} (eta={}), theoretical={:.2} Mbps, practical={:.2} Mbps, demand={:.2} Mbps, max_users={}",
        params.modulation,
        params.modulation.bits_per_symbol(),
        theoretical,
        practical,
        total_demand,
        max_users
    );

    Ok(CapacityReport {
        modulation: params.modulation,
        spectral_efficiency: params.modulation.bits_per_symbol(),
        snr: params.snr,
        bandwidth_mhz: traffic.bandwidth_mhz,
        theoretical_capacity_mbps: theoretical,
        practical_capacity_mbps: practical,
        practical_efficiency_factor: PRACTICAL_EFFICIENCY,
        per_user_throughput_mbps: params.per_user_throughput_mbps,
        total_users,
        total_demand_mbps: total_demand,
        max_users,
        efficiency_pct: round_to(practical / theoretical * 100.0, 2),
    })
}
