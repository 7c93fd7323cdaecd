//! # Geometry
//!
//! Great-circle distance and the geometric route estimate used when every
//! network routing tier is unavailable.
//!
//! ```text
//!   stop 0 ──hav──► stop 1 ──hav──► stop 2 ──hav──► stop n
//!            d₀              d₁              d₂
//!
//!   distance = round(Σ dᵢ)                       meters
//!   duration = round(distance / (speed × 1000 / 3600))   seconds
//! ```
//!
//! The estimate is a straight-line lower bound on the real driving distance;
//! it exists so a quote can always be produced.

use crate::types::{GeoPoint, RouteInfo};
use crate::FALLBACK_AVERAGE_SPEED_KMH;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance between two points, in meters.
///
/// ## Example
/// ```rust
/// use moowwee_core::geo::haversine_meters;
/// use moowwee_core::types::GeoPoint;
///
/// let a = GeoPoint::new(40.7128, -74.0060);
/// let b = GeoPoint::new(40.7589, -73.9851);
/// assert_eq!(haversine_meters(&a, &b).round(), 5420.0);
/// ```
pub fn haversine_meters(from: &GeoPoint, to: &GeoPoint) -> f64 {
    let phi1 = from.latitude.to_radians();
    let phi2 = to.latitude.to_radians();
    let d_phi = (to.latitude - from.latitude).to_radians();
    let d_lambda = (to.longitude - from.longitude).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Sum of great-circle legs over consecutive points, in meters.
pub fn path_length_meters(points: &[GeoPoint]) -> f64 {
    points
        .windows(2)
        .map(|pair| haversine_meters(&pair[0], &pair[1]))
        .sum()
}

/// Geometric route estimate at the default fallback speed (40 km/h).
pub fn estimate_route(points: &[GeoPoint]) -> RouteInfo {
    estimate_route_at(points, FALLBACK_AVERAGE_SPEED_KMH)
}

/// Geometric route estimate at a given average speed.
///
/// A non-positive or non-finite speed falls back to the default speed so the
/// estimate stays defined.
pub fn estimate_route_at(points: &[GeoPoint], speed_kmh: f64) -> RouteInfo {
    let speed_kmh = if speed_kmh.is_finite() && speed_kmh > 0.0 {
        speed_kmh
    } else {
        FALLBACK_AVERAGE_SPEED_KMH
    };

    let path = path_length_meters(points);
    // Distinct stops never round down to a zero-length route
    let distance = if path > 0.0 { path.round().max(1.0) } else { 0.0 };
    let meters_per_second = speed_kmh * 1000.0 / 3600.0;
    let duration = (distance / meters_per_second).round();

    RouteInfo {
        distance_meters: distance as u64,
        duration_seconds: duration as u64,
        polyline: None,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
