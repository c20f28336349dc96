//! Propagation Model
//!
//! COST-231 Hata path loss, inverted for the cell radius that exhausts the
//! maximum tolerable path loss.

use tracing::debug;

use common::validation;
use common::{CoverageReport, ProjectParams, ValidationError, ZoneType};

use crate::StageError;

/// Hata base loss term in dB
const HATA_BASE_DB: f64 = 46.3;
/// Frequency coefficient, dB per decade of MHz
const HATA_FREQUENCY_COEFF: f64 = 33.9;
/// Base station height coefficient, dB per decade of meters
const HATA_BS_HEIGHT_COEFF: f64 = 13.82;
/// Distance slope at a 1 m base station
const HATA_DISTANCE_SLOPE: f64 = 44.9;
/// Reduction of the distance slope per decade of base station height
const HATA_DISTANCE_SLOPE_HEIGHT_COEFF: f64 = 6.55;

/// Per-call link parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropagationParams {
    /// Transmit antenna gain in dBi
    pub antenna_gain_dbi: f64,
    /// Cable, connector and body losses in dB
    pub system_losses_db: f64,
    /// Receiver sensitivity in dBm
    pub receiver_sensitivity_dbm: f64,
}

impl PropagationParams {
    pub fn new(
        antenna_gain_dbi: f64,
        system_losses_db: f64,
        receiver_sensitivity_dbm: f64,
    ) -> Result<Self, ValidationError> {
        let params = Self {
            antenna_gain_dbi,
            system_losses_db,
            receiver_sensitivity_dbm,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::finite("antenna_gain", self.antenna_gain_dbi)?;
        validation::finite("system_losses", self.system_losses_db)?;
        validation::finite("receiver_sensitivity", self.receiver_sensitivity_dbm)?;
        Ok(())
    }
}

/// Radio fields taken from the project record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadioSetup {
    pub frequency_ghz: f64,
    pub zone_type: ZoneType,
    pub power_dbm: f64,
    pub antenna_height_m: f64,
    pub user_height_m: f64,
}

impl RadioSetup {
    /// Extract the radio fields, all of which must be present and positive
    pub fn from_project(project: &ProjectParams) -> Result<Self, ValidationError> {
        Ok(Self {
            frequency_ghz: validation::positive("frequency_ghz", project.frequency_ghz)?,
            zone_type: project.zone_type,
            power_dbm: validation::required_positive("power_dbm", project.power_dbm)?,
            antenna_height_m: validation::required_positive(
                "antenna_height_m",
                project.antenna_height_m,
            )?,
            user_height_m: validation::required_positive("user_height_m", project.user_height_m)?,
        })
    }
}

/// Mobile antenna height correction a(hm) in dB
pub fn mobile_height_correction(user_height_m: f64) -> f64 {
    3.2 * (11.75 * user_height_m).log10().powi(2) - 4.97
}

/// Metropolitan correction Cm in dB
pub fn zone_correction(zone: ZoneType) -> f64 {
    match zone {
        ZoneType::Urban => 3.0,
        ZoneType::Suburban | ZoneType::Rural => 0.0,
    }
}

/// Slope of the path loss against log10(distance)
fn distance_slope(antenna_height_m: f64) -> f64 {
    HATA_DISTANCE_SLOPE - HATA_DISTANCE_SLOPE_HEIGHT_COEFF * antenna_height_m.log10()
}

/// Path loss at `log10_distance_km`, with all terms precomputed
fn path_loss_terms(
    frequency_mhz: f64,
    antenna_height_m: f64,
    height_correction: f64,
    zone_correction: f64,
    log10_distance_km: f64,
) -> f64 {
    HATA_BASE_DB + HATA_FREQUENCY_COEFF * frequency_mhz.log10()
        - HATA_BS_HEIGHT_COEFF * antenna_height_m.log10()
        - height_correction
        + distance_slope(antenna_height_m) * log10_distance_km
        + zone_correction
}

/// COST-231 Hata path loss in dB at `distance_km`
pub fn hata_path_loss(
    frequency_mhz: f64,
    antenna_height_m: f64,
    user_height_m: f64,
    zone: ZoneType,
    distance_km: f64,
) -> f64 {
    path_loss_terms(
        frequency_mhz,
        antenna_height_m,
        mobile_height_correction(user_height_m),
        zone_correction(zone),
        distance_km.log10(),
    )
}

/// Solve the cell radius and coverage area
///
/// The radius must come out beyond 1 km (`log10(d) > 0`); anything else is
/// reported as infeasible geometry.
pub fn compute_coverage(
    radio: &RadioSetup,
    params: &PropagationParams,
) -> Result<CoverageReport, StageError> {
    params.validate()?;

    let frequency_mhz = radio.frequency_ghz * 1000.0;
    let height_correction = mobile_height_correction(radio.user_height_m);
    let zone_corr = zone_correction(radio.zone_type);
    let max_path_loss = radio.power_dbm - params.receiver_sensitivity_dbm;

    let slope = distance_slope(radio.antenna_height_m);
    if slope.is_nan() || slope <= 0.0 {
        return Err(StageError::InfeasibleGeometry(format!(
            "path loss does not grow with distance at antenna height {} m",
            radio.antenna_height_m
        )));
    }

    let log10_radius = (max_path_loss - HATA_BASE_DB
        - HATA_FREQUENCY_COEFF * frequency_mhz.log10()
        + HATA_BS_HEIGHT_COEFF * radio.antenna_height_m.log10()
        + height_correction
        - zone_corr)
        / slope;

    debug!(
        "Hata terms: f={:.1} MHz, a(hm)={:.4} dB, Cm={} dB, Lmax={:.2} dB, log10(d)={:.6}",
        frequency_mhz, height_correction, zone_corr, max_path_loss, log10_radius
    );

    if !log10_radius.is_finite() || log10_radius <= 0.0 {
        return Err(StageError::InfeasibleGeometry(format!(
            "solved log10(d) = {:.4} does not place the cell edge beyond 1 km",
            log10_radius
        )));
    }

    let radius_km = 10f64.powf(log10_radius);
    if !radius_km.is_finite() {
        return Err(StageError::InfeasibleGeometry(format!(
            "solved radius is not finite (log10(d) = {:.4})",
            log10_radius
        )));
    }

    let coverage_area_km2 = std::f64::consts::PI * radius_km * radius_km;
    let path_loss_db = path_loss_terms(
        frequency_mhz,
        radio.antenna_height_m,
        height_correction,
        zone_corr,
        log10_radius,
    );
    let link_budget_db = radio.power_dbm + params.antenna_gain_dbi
        - params.system_losses_db
        - path_loss_db
        - params.receiver_sensitivity_dbm;

    Ok(CoverageReport {
        frequency_mhz,
        zone_type: radio.zone_type,
        tx_power_dbm: radio.power_dbm,
        antenna_height_m: radio.antenna_height_m,
        user_height_m: radio.user_height_m,
        antenna_gain_dbi: params.antenna_gain_dbi,
        system_losses_db: params.system_losses_db,
        receiver_sensitivity_dbm: params.receiver_sensitivity_dbm,
        mobile_height_correction_db: height_correction,
        zone_correction_db: zone_corr,
        max_path_loss_db: max_path_loss,
        log10_radius,
        radius_km,
        coverage_area_km2,
        path_loss_db,
        link_budget_db,
    })
}
