//! Great-circle distance on a spherical earth.
//!
//! # Coordinate System
//!
//! - Latitude: degrees north (-90 to 90)
//! - Longitude: degrees east (-180 to 180)
//! - Distance: statute miles

use crate::model::broadcast::GeoPoint;
use crate::repo::broadcast_repo::LatitudeBand;

/// Mean earth radius in statute miles.
pub const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Slack added to latitude bands (about a metre). Covers `asin` rounding
/// near antipodal points so a band edge never drops a true match.
const BAND_MARGIN_DEG: f64 = 1e-5;

/// Calculate the distance between two points in miles.
///
/// Uses the haversine formula, which stays well conditioned for short
/// distances and is continuous across the antimeridian and the poles.
///
/// # Example
///
/// ```
/// use minyan_core::geo::distance::distance_miles;
/// use minyan_core::GeoPoint;
///
/// // One degree of latitude is roughly 69 miles.
/// let dist = distance_miles(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 0.0));
/// assert!((dist - 69.09).abs() < 0.01);
/// ```
pub fn distance_miles(from: GeoPoint, to: GeoPoint) -> f64 {
    let lat1_rad = from.latitude.to_radians();
    let lat2_rad = to.latitude.to_radians();
    let delta_lat = (to.latitude - from.latitude).to_radians();
    let delta_lon = (to.longitude - from.longitude).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    // Rounding can push `a` just past 1.0 for antipodal points.
    let c = 2.0 * a.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_MILES * c
}

/// Latitude band that contains every point within `radius_miles` of `center`.
///
/// Any point within the radius differs in latitude by at most the angular
/// radius, so the band never excludes a true match. Longitude is left
/// unconstrained.
pub fn latitude_band(center: GeoPoint, radius_miles: f64) -> LatitudeBand {
    let delta_deg = (radius_miles / EARTH_RADIUS_MILES).to_degrees() + BAND_MARGIN_DEG;
    LatitudeBand {
        min: (center.latitude - delta_deg).max(-90.0),
        max: (center.latitude + delta_deg).min(90.0),
    }
}
