//! Site Placement
//!
//! Radial layout of gNodeB sites around the project reference point, with
//! labels resolved through the injected geocoder.

pub mod geodesy;

use futures::stream::{self, StreamExt};
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

use common::GeoPoint;
use interfaces::Geocoder;

pub use geodesy::{
    haversine_km, initial_bearing_deg, offset_equirectangular, radial_layout, EARTH_RADIUS_KM,
};

/// Label used when the geocoder knows nothing about a coordinate
pub const UNNAMED_SITE: &str = "Unnamed site";
/// Label used when the geocoder fails or times out
pub const UNKNOWN_SITE: &str = "Unknown site";

/// Label lookup limits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementSettings {
    /// Upper bound on a single lookup
    pub lookup_timeout: Duration,
    /// Lookups in flight at once
    pub max_concurrent: usize,
    /// Most sites a single placement run may create
    pub max_sites: u64,
}

impl Default for PlacementSettings {
    fn default() -> Self {
        Self {
            lookup_timeout: Duration::from_secs(5),
            max_concurrent: 4,
            max_sites: 10_000,
        }
    }
}

/// Resolve one label, never failing
pub async fn label_or_fallback(
    geocoder: &dyn Geocoder,
    point: GeoPoint,
    lookup_timeout: Duration,
) -> String {
    match timeout(lookup_timeout, geocoder.label_for(point)).await {
        Ok(Ok(Some(label))) if !label.trim().is_empty() => label,
        Ok(Ok(_)) => {
            warn!(
                "No place name for ({:.5}, {:.5}), using \"{}\"",
                point.latitude, point.longitude, UNNAMED_SITE
            );
            UNNAMED_SITE.to_string()
        }
        Ok(Err(e)) => {
            warn!(
                "Reverse geocoding failed for ({:.5}, {:.5}): {}",
                point.latitude, point.longitude, e
            );
            UNKNOWN_SITE.to_string()
        }
        Err(_) => {
            warn!(
                "Reverse geocoding timed out after {:?} for ({:.5}, {:.5})",
                lookup_timeout, point.latitude, point.longitude
            );
            UNKNOWN_SITE.to_string()
        }
    }
}

/// Resolve labels for `points`, returned in the same order
pub async fn resolve_labels(
    geocoder: &dyn Geocoder,
    points: &[GeoPoint],
    settings: &PlacementSettings,
) -> Vec<String> {
    stream::iter(points.iter().copied())
        .map(|point| label_or_fallback(geocoder, point, settings.lookup_timeout))
        .buffered(settings.max_concurrent.max(1))
        .collect()
        .await
}
