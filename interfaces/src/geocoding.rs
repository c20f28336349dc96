//! Reverse Geocoding Interface
//!
//! Turns coordinates into human-readable place labels for generated sites.
//! The HTTP implementation speaks the Google-style reverse geocoding JSON
//! API (`status` plus a `results[].formatted_address` list).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use common::GeoPoint;

use crate::InterfaceError;

/// Default reverse geocoding endpoint
pub const DEFAULT_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Prefix applied to resolved addresses
pub const SITE_LABEL_PREFIX: &str = "Site - ";

/// Reverse-lookup collaborator
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Label for a coordinate; `Ok(None)` when the provider knows nothing there
    async fn label_for(&self, point: GeoPoint) -> Result<Option<String>, InterfaceError>;
}

/// Geocoder that never resolves anything, for offline runs
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineGeocoder;

#[async_trait]
impl Geocoder for OfflineGeocoder {
    async fn label_for(&self, _point: GeoPoint) -> Result<Option<String>, InterfaceError> {
        Ok(None)
    }
}

/// HTTP geocoder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpGeocoderConfig {
    /// Endpoint URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// API key sent as the `key` query parameter
    pub api_key: String,
    /// Preferred result language
    #[serde(default)]
    pub language: Option<String>,
    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_base_url() -> String {
    DEFAULT_GEOCODE_URL.to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

impl HttpGeocoderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: default_base_url(),
            api_key: api_key.into(),
            language: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReverseGeocodeResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    results: Vec<ReverseGeocodeResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReverseGeocodeResult {
    #[serde(default)]
    formatted_address: String,
}

/// Reverse geocoding over HTTP
pub struct HttpGeocoder {
    config: HttpGeocoderConfig,
    client: reqwest::Client,
}

impl HttpGeocoder {
    /// Create a client with the configured request timeout
    pub fn new(config: HttpGeocoderConfig) -> Result<Self, InterfaceError> {
        if config.api_key.trim().is_empty() {
            return Err(InterfaceError::InvalidConfig(
                "geocoding API key is empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| InterfaceError::InvalidConfig(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn interpret(response: ReverseGeocodeResponse) -> Result<Option<String>, InterfaceError> {
        match response.status.as_str() {
            "OK" | "" => Ok(response
                .results
                .into_iter()
                .map(|r| r.formatted_address.trim().to_string())
                .find(|address| !address.is_empty())
                .map(|address| format!("{}{}", SITE_LABEL_PREFIX, address))),
            "ZERO_RESULTS" => Ok(None),
            status => Err(InterfaceError::ApiError(match response.error_message {
                Some(message) => format!("{}: {}", status, message),
                None => status.to_string(),
            })),
        }
    }
}

#[async_trait]
impl Geocoder for HttpGeocoder {
    async fn label_for(&self, point: GeoPoint) -> Result<Option<String>, InterfaceError> {
        let mut query = vec![
            (
                "latlng",
                format!("{:.6},{:.6}", point.latitude, point.longitude),
            ),
            ("key", self.config.api_key.clone()),
        ];
        if let Some(language) = &self.config.language {
            query.push(("language", language.clone()));
        }

        let response = self
            .client
            .get(&self.config.base_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| InterfaceError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(InterfaceError::ApiError(format!(
                "Geocoder returned status: {}",
                response.status()
            )));
        }

        let body: ReverseGeocodeResponse = response
            .json()
            .await
            .map_err(|e| InterfaceError::ParseError(e.to_string()))?;

        debug!(
            "Reverse geocode ({:.5}, {:.5}): status={}, {} results",
            point.latitude,
            point.longitude,
            body.status,
            body.results.len()
        );

        Self::interpret(body)
    }
}
