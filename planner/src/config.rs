//! Plan Configuration
//!
//! A YAML plan description layered with `PLANNER_*` environment variables,
//! e.g. `PLANNER_GEOCODING__API_KEY` overrides `geocoding.api_key`.

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use common::{ProjectParams, ValidationError};
use interfaces::geocoding::DEFAULT_GEOCODE_URL;
use interfaces::{Geocoder, HttpGeocoder, HttpGeocoderConfig, OfflineGeocoder};
use stages::{
    CapacityParams, CostParams, PipelineInputs, PlacementSettings, PlannerSettings,
    PropagationParams,
};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "PLANNER";

/// Top-level plan description
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlannerConfig {
    /// Project to plan
    pub project: ProjectParams,
    /// Link parameters for the coverage stage
    #[serde(default)]
    pub coverage: CoverageConfig,
    /// Traffic parameters for the capacity stage
    #[serde(default)]
    pub capacity: CapacityConfig,
    /// Pricing for the dimensioning stage
    #[serde(default)]
    pub dimensioning: DimensioningConfig,
    /// Site placement limits
    #[serde(default)]
    pub placement: PlacementConfig,
    /// Site label lookup
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

/// Coverage stage inputs
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CoverageConfig {
    /// Transmit antenna gain in dBi
    #[serde(default = "default_antenna_gain")]
    pub antenna_gain_dbi: f64,
    /// System losses in dB
    #[serde(default = "default_system_losses")]
    pub system_losses_db: f64,
    /// Receiver sensitivity in dBm
    #[serde(default = "default_receiver_sensitivity")]
    pub receiver_sensitivity_dbm: f64,
}

fn default_antenna_gain() -> f64 {
    15.0
}

fn default_system_losses() -> f64 {
    2.0
}

fn default_receiver_sensitivity() -> f64 {
    -100.0
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            antenna_gain_dbi: default_antenna_gain(),
            system_losses_db: default_system_losses(),
            receiver_sensitivity_dbm: default_receiver_sensitivity(),
        }
    }
}

/// Capacity stage inputs
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CapacityConfig {
    /// Linear SNR
    #[serde(default = "default_snr")]
    pub snr: f64,
    /// QPSK, 16QAM, 64QAM, 256QAM or 1024QAM
    #[serde(default = "default_modulation")]
    pub modulation: String,
    /// Required throughput per user in Mbps
    #[serde(default = "default_per_user_throughput")]
    pub per_user_throughput_mbps: f64,
}

fn default_snr() -> f64 {
    20.0
}

fn default_modulation() -> String {
    "64QAM".to_string()
}

fn default_per_user_throughput() -> f64 {
    2.0
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            snr: default_snr(),
            modulation: default_modulation(),
            per_user_throughput_mbps: default_per_user_throughput(),
        }
    }
}

/// Dimensioning stage inputs
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DimensioningConfig {
    /// Cost of one station
    #[serde(default = "default_cost_per_station")]
    pub cost_per_station: f64,
    /// Currency label
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_cost_per_station() -> f64 {
    50000.0
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Default for DimensioningConfig {
    fn default() -> Self {
        Self {
            cost_per_station: default_cost_per_station(),
            currency: default_currency(),
        }
    }
}

/// Site placement configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlacementConfig {
    /// Most sites one placement run may create
    #[serde(default = "default_max_sites")]
    pub max_sites: u64,
}

fn default_max_sites() -> u64 {
    10_000
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            max_sites: default_max_sites(),
        }
    }
}

/// Reverse geocoding backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GeocoderProvider {
    /// No lookups, every site gets the placeholder label
    #[default]
    Offline,
    /// Google-style reverse geocoding API
    Http,
}

/// Geocoding configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeocodingConfig {
    #[serde(default)]
    pub provider: GeocoderProvider,
    /// API key, required for the http provider
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub language: Option<String>,
    /// Per-lookup timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Lookups in flight at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

fn default_base_url() -> String {
    DEFAULT_GEOCODE_URL.to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_max_concurrent() -> usize {
    4
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            provider: GeocoderProvider::default(),
            api_key: None,
            base_url: default_base_url(),
            language: None,
            timeout_ms: default_timeout_ms(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

impl GeocodingConfig {
    /// Build the configured geocoder
    pub fn build(&self) -> anyhow::Result<Arc<dyn Geocoder>> {
        match self.provider {
            GeocoderProvider::Offline => Ok(Arc::new(OfflineGeocoder)),
            GeocoderProvider::Http => {
                let api_key = self
                    .api_key
                    .clone()
                    .ok_or_else(|| anyhow!("geocoding.api_key is required for the http provider"))?;
                let geocoder = HttpGeocoder::new(HttpGeocoderConfig {
                    base_url: self.base_url.clone(),
                    api_key,
                    language: self.language.clone(),
                    timeout_ms: self.timeout_ms,
                })?;
                Ok(Arc::new(geocoder))
            }
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Level used when neither RUST_LOG nor --log-level is given
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl PlannerConfig {
    /// Load a YAML plan file and apply `PLANNER_*` overrides
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        Self::load_with_env(path, environment())
    }

    /// Load with an explicit environment source
    pub fn load_with_env(path: &Path, env: ::config::Environment) -> anyhow::Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path).format(::config::FileFormat::Yaml))
            .add_source(env)
            .build()
            .with_context(|| format!("reading plan file {}", path.display()))?;

        let config: PlannerConfig = settings
            .try_deserialize()
            .with_context(|| format!("parsing plan file {}", path.display()))?;
        config.project.validate()?;
        Ok(config)
    }

    /// Stage inputs for a full pipeline run
    pub fn pipeline_inputs(&self, place_sites: bool) -> Result<PipelineInputs, ValidationError> {
        Ok(PipelineInputs {
            propagation: PropagationParams::new(
                self.coverage.antenna_gain_dbi,
                self.coverage.system_losses_db,
                self.coverage.receiver_sensitivity_dbm,
            )?,
            capacity: CapacityParams::new(
                self.capacity.snr,
                &self.capacity.modulation,
                self.capacity.per_user_throughput_mbps,
            )?,
            cost: CostParams::new(
                self.dimensioning.cost_per_station,
                &self.dimensioning.currency,
            )?,
            place_sites,
        })
    }

    pub fn planner_settings(&self) -> PlannerSettings {
        PlannerSettings {
            placement: PlacementSettings {
                lookup_timeout: Duration::from_millis(self.geocoding.timeout_ms),
                max_concurrent: self.geocoding.max_concurrent,
                max_sites: self.placement.max_sites,
            },
        }
    }
}

/// `PLANNER_` prefix, `__` between nested keys
pub fn environment() -> ::config::Environment {
    ::config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Modulation, Service, ZoneType};
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const PLAN: &str = r#"
project:
  name: Marseille Vieux-Port
  area_km2: 10
  user_density: 500
  frequency_ghz: 2.1
  bandwidth_mhz: 100
  zone_type: SUBURBAN
  services: [EMBB, URLLC]
  power_dbm: 40
  antenna_height_m: 30
  user_height_m: 1.5
  latitude: 43.2965
  longitude: 5.3698
capacity:
  modulation: 256QAM
"#;

    fn plan_file(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn no_env() -> ::config::Environment {
        environment().source(Some(HashMap::new()))
    }

    #[test]
    fn test_load_with_defaults() {
        let file = plan_file(PLAN);
        let config = PlannerConfig::load_with_env(file.path(), no_env()).unwrap();

        assert_eq!(config.project.zone_type, ZoneType::Suburban);
        assert!(config.project.services.contains(&Service::Urllc));
        assert_eq!(config.project.latitude, Some(43.2965));
        assert_eq!(config.coverage.receiver_sensitivity_dbm, -100.0);
        assert_eq!(config.dimensioning.currency, "USD");
        assert_eq!(config.geocoding.provider, GeocoderProvider::Offline);
        assert_eq!(config.log.level, "info");

        let inputs = config.pipeline_inputs(true).unwrap();
        assert_eq!(inputs.capacity.modulation, Modulation::Qam256);
        assert_eq!(inputs.cost.cost_per_station, 50000.0);
        let settings = config.planner_settings();
        assert_eq!(settings.placement.lookup_timeout, Duration::from_secs(5));
        assert_eq!(settings.placement.max_sites, 10_000);
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = plan_file(PLAN);
        let env = HashMap::from([
            ("PLANNER_DIMENSIONING__CURRENCY".to_string(), "EUR".to_string()),
            ("PLANNER_GEOCODING__MAX_CONCURRENT".to_string(), "8".to_string()),
            ("PLANNER_PLACEMENT__MAX_SITES".to_string(), "250".to_string()),
        ]);

        let config =
            PlannerConfig::load_with_env(file.path(), environment().source(Some(env))).unwrap();

        assert_eq!(config.dimensioning.currency, "EUR");
        assert_eq!(config.geocoding.max_concurrent, 8);
        assert_eq!(config.planner_settings().placement.max_sites, 250);
    }

    #[test]
    fn test_bad_modulation_is_rejected() {
        let file = plan_file(&PLAN.replace("256QAM", "8PSK"));
        let config = PlannerConfig::load_with_env(file.path(), no_env()).unwrap();
        assert_eq!(
            config.pipeline_inputs(true).unwrap_err(),
            ValidationError::UnsupportedModulation("8PSK".to_string())
        );
    }

    #[test]
    fn test_invalid_project_fails_to_load() {
        let file = plan_file(&PLAN.replace("area_km2: 10", "area_km2: -3"));
        assert!(PlannerConfig::load_with_env(file.path(), no_env()).is_err());
    }

    #[test]
    fn test_http_provider_needs_key() {
        let geocoding = GeocodingConfig {
            provider: GeocoderProvider::Http,
            ..GeocodingConfig::default()
        };
        assert!(geocoding.build().is_err());
        assert!(GeocodingConfig::default().build().is_ok());
    }
}
