//! Common Types for 5G RAN Planning
//!
//! Defines the project, site and identifier types used throughout the planner

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::validation::{self, ValidationError};

/// Project identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectId(pub i64);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Site identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SiteId(pub i64);

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owning user identifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// Deployment zone type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ZoneType {
    /// Dense urban
    Urban,
    /// Suburban
    Suburban,
    /// Rural
    Rural,
}

impl ZoneType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneType::Urban => "URBAN",
            ZoneType::Suburban => "SUBURBAN",
            ZoneType::Rural => "RURAL",
        }
    }
}

impl fmt::Display for ZoneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ZoneType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "URBAN" => Ok(ZoneType::Urban),
            "SUBURBAN" => Ok(ZoneType::Suburban),
            "RURAL" => Ok(ZoneType::Rural),
            _ => Err(ValidationError::UnsupportedZone(s.to_string())),
        }
    }
}

/// 5G service classes a project must support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Service {
    /// Enhanced Mobile Broadband
    Embb,
    /// Ultra-Reliable Low-Latency Communications
    Urllc,
    /// Massive Machine-Type Communications
    Mmtc,
}

impl FromStr for Service {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EMBB" => Ok(Service::Embb),
            "URLLC" => Ok(Service::Urllc),
            "MMTC" => Ok(Service::Mmtc),
            _ => Err(ValidationError::UnsupportedService(s.to_string())),
        }
    }
}

/// Modulation schemes and their spectral efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modulation {
    #[serde(rename = "QPSK")]
    Qpsk,
    #[serde(rename = "16QAM")]
    Qam16,
    #[serde(rename = "64QAM")]
    Qam64,
    #[serde(rename = "256QAM")]
    Qam256,
    #[serde(rename = "1024QAM")]
    Qam1024,
}

impl Modulation {
    pub const ALL: [Modulation; 5] = [
        Modulation::Qpsk,
        Modulation::Qam16,
        Modulation::Qam64,
        Modulation::Qam256,
        Modulation::Qam1024,
    ];

    /// Bits carried per symbol
    pub fn bits_per_symbol(&self) -> u8 {
        match self {
            Modulation::Qpsk => 2,
            Modulation::Qam16 => 4,
            Modulation::Qam64 => 6,
            Modulation::Qam256 => 8,
            Modulation::Qam1024 => 10,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Modulation::Qpsk => "QPSK",
            Modulation::Qam16 => "16QAM",
            Modulation::Qam64 => "64QAM",
            Modulation::Qam256 => "256QAM",
            Modulation::Qam1024 => "1024QAM",
        }
    }
}

impl fmt::Display for Modulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Modulation {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Modulation::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ValidationError::UnsupportedModulation(s.to_string()))
    }
}

/// Kinds of persisted stage results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StageKind {
    /// Propagation model output
    Coverage,
    /// Capacity model output
    Capacity,
    /// Dimensioning output
    Gnodeb,
}

impl StageKind {
    pub const ALL: [StageKind; 3] = [StageKind::Coverage, StageKind::Capacity, StageKind::Gnodeb];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Coverage => "COVERAGE",
            StageKind::Capacity => "CAPACITY",
            StageKind::Gnodeb => "GNODEB",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geographic coordinate in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check both coordinates are finite and in range
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::latitude(self.latitude)?;
        validation::longitude(self.longitude)?;
        Ok(())
    }
}

/// Editable project parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectParams {
    /// Owning user
    #[serde(default)]
    pub owner: UserId,
    /// Project name
    pub name: String,
    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Planned area in km²
    pub area_km2: f64,
    /// Users per km²
    pub user_density: f64,
    /// Carrier frequency in GHz
    pub frequency_ghz: f64,
    /// Channel bandwidth in MHz
    pub bandwidth_mhz: f64,
    /// Zone type
    pub zone_type: ZoneType,
    /// Services to be offered
    pub services: BTreeSet<Service>,
    /// gNodeB transmit power in dBm
    #[serde(default)]
    pub power_dbm: Option<f64>,
    /// gNodeB antenna height in meters
    #[serde(default)]
    pub antenna_height_m: Option<f64>,
    /// User equipment height in meters
    #[serde(default)]
    pub user_height_m: Option<f64>,
    /// Reference latitude for site placement
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Reference longitude for site placement
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl ProjectParams {
    /// Validate the record the way the project-management service does
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::non_empty("name", &self.name)?;
        validation::positive("area_km2", self.area_km2)?;
        validation::positive("user_density", self.user_density)?;
        validation::positive("frequency_ghz", self.frequency_ghz)?;
        validation::positive("bandwidth_mhz", self.bandwidth_mhz)?;

        if self.services.is_empty() {
            return Err(ValidationError::Empty { field: "services" });
        }

        if let Some(power) = self.power_dbm {
            validation::positive("power_dbm", power)?;
        }
        if let Some(height) = self.antenna_height_m {
            validation::positive("antenna_height_m", height)?;
        }
        if let Some(height) = self.user_height_m {
            validation::positive("user_height_m", height)?;
        }

        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => GeoPoint::new(lat, lng).validate(),
            (None, None) => Ok(()),
            _ => Err(ValidationError::IncompleteLocation),
        }
    }

    /// Reference coordinate, if both halves are present
    pub fn reference_point(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
            _ => None,
        }
    }

    /// Total users in the planned area
    pub fn total_users(&self) -> f64 {
        self.area_km2 * self.user_density
    }
}

/// Stored project record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    #[serde(flatten)]
    pub params: ProjectParams,
}

/// Site creation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSite {
    pub project_id: ProjectId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
}

impl NewSite {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::non_empty("name", &self.name)?;
        GeoPoint::new(self.latitude, self.longitude).validate()?;
        validation::positive("radius_km", self.radius_km)?;
        Ok(())
    }
}

/// gNodeB site placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,
    pub project_id: ProjectId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
    pub created_at: DateTime<Utc>,
}

impl Site {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}
