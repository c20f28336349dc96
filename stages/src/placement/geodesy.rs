//! Geodesy helpers for site placement

use common::GeoPoint;

/// Mean Earth radius in km
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Offset `origin` by `distance_km` along `bearing_deg`
///
/// Equirectangular small-angle approximation: the longitude delta is scaled
/// by the cosine of the origin latitude. Accurate to well under a meter for
/// cell-sized offsets away from the poles. Longitudes are wrapped into
/// [-180, 180].
pub fn offset_equirectangular(origin: GeoPoint, distance_km: f64, bearing_deg: f64) -> GeoPoint {
    let bearing = bearing_deg.to_radians();
    let angular = distance_km / EARTH_RADIUS_KM;

    let delta_lat = angular * bearing.cos();
    let delta_lng = angular * bearing.sin() / origin.latitude.to_radians().cos();

    GeoPoint::new(
        origin.latitude + delta_lat.to_degrees(),
        wrap_longitude(origin.longitude + delta_lng.to_degrees()),
    )
}

fn wrap_longitude(longitude: f64) -> f64 {
    if (-180.0..=180.0).contains(&longitude) {
        longitude
    } else {
        (longitude + 180.0).rem_euclid(360.0) - 180.0
    }
}

/// Great-circle distance in km
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlng = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Initial great-circle bearing from `from` to `to`, in [0, 360) degrees
pub fn initial_bearing_deg(from: GeoPoint, to: GeoPoint) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let dlng = (to.longitude - from.longitude).to_radians();

    let y = dlng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlng.cos();

    y.atan2(x).to_degrees().rem_euclid(360.0)
}

/// `count` points evenly spaced by bearing on a circle around `center`
///
/// Point `i` sits at bearing `360 / count * i`, starting due north. The
/// whole layout is allocated at once, so callers bound `count`.
pub fn radial_layout(center: GeoPoint, count: u64, radius_km: f64) -> Vec<GeoPoint> {
    if count == 0 {
        return Vec::new();
    }
    let step = 360.0 / count as f64;
    (0..count)
        .map(|i| offset_equirectangular(center, radius_km, step * i as f64))
        .collect()
}
