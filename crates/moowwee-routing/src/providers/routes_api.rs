//! Route-matrix provider (`directions/v2:computeRoutes`).
//!
//! One POST per itinerary: first stop is the origin, last stop the
//! destination, everything in between goes to `intermediates` in the
//! original order.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use moowwee_core::types::{GeoPoint, RouteInfo};

use crate::error::{RoutingError, RoutingResult};
use crate::resolver::RouteStrategy;

const PROVIDER: &str = "routes_api";
const FIELD_MASK: &str = "routes.duration,routes.distanceMeters,routes.polyline.encodedPolyline";

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ComputeRoutesRequest {
    origin: Waypoint,
    destination: Waypoint,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    intermediates: Vec<Waypoint>,
    travel_mode: &'static str,
    routing_preference: &'static str,
}

#[derive(Debug, Serialize)]
struct Waypoint {
    location: Location,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Location {
    lat_lng: LatLng,
}

#[derive(Debug, Serialize)]
struct LatLng {
    latitude: f64,
    longitude: f64,
}

impl From<&GeoPoint> for Waypoint {
    fn from(point: &GeoPoint) -> Self {
        Waypoint {
            location: Location {
                lat_lng: LatLng {
                    latitude: point.latitude,
                    longitude: point.longitude,
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ComputeRoutesResponse {
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Route {
    distance_meters: Option<u64>,
    duration: Option<String>,
    polyline: Option<Polyline>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Polyline {
    encoded_polyline: Option<String>,
}

/// Parses a protobuf-JSON duration such as `"1234s"` or `"12.5s"`.
fn parse_duration_seconds(raw: &str) -> Option<u64> {
    let seconds: f64 = raw.trim().strip_suffix('s')?.parse().ok()?;
    (seconds.is_finite() && seconds >= 0.0).then(|| seconds.round() as u64)
}

// =============================================================================
// Provider
// =============================================================================

/// Route-matrix tier.
pub struct RoutesApiProvider {
    client: Client,
    url: Url,
    api_key: Option<String>,
}

impl RoutesApiProvider {
    pub fn new(client: Client, url: &str, api_key: Option<String>) -> RoutingResult<Self> {
        let url = Url::parse(url).map_err(|source| RoutingError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        Ok(Self {
            client,
            url,
            api_key,
        })
    }
}

#[async_trait]
impl RouteStrategy for RoutesApiProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn resolve(&self, points: &[GeoPoint]) -> RoutingResult<RouteInfo> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(RoutingError::MissingCredentials { provider: PROVIDER })?;

        let (origin, rest) = points
            .split_first()
            .ok_or(RoutingError::TooFewStops { count: 0 })?;
        let (destination, intermediates) = rest.split_last().ok_or(RoutingError::TooFewStops {
            count: points.len(),
        })?;

        let body = ComputeRoutesRequest {
            origin: origin.into(),
            destination: destination.into(),
            intermediates: intermediates.iter().map(Waypoint::from).collect(),
            travel_mode: "DRIVE",
            routing_preference: "TRAFFIC_UNAWARE",
        };

        debug!(stops = points.len(), "Requesting route matrix");
        let response = self
            .client
            .post(self.url.clone())
            .header("X-Goog-Api-Key", api_key)
            .header("X-Goog-FieldMask", FIELD_MASK)
            .json(&body)
            .send()
            .await
            .map_err(|source| RoutingError::Http {
                provider: PROVIDER,
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RoutingError::Status {
                provider: PROVIDER,
                status: status.as_u16(),
            });
        }

        let parsed: ComputeRoutesResponse = response
            .json()
            .await
            .map_err(|e| RoutingError::malformed(PROVIDER, e.to_string()))?;

        let route = parsed
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| RoutingError::malformed(PROVIDER, "no routes returned"))?;

        let distance_meters = route
            .distance_meters
            .ok_or_else(|| RoutingError::malformed(PROVIDER, "missing distanceMeters"))?;
        let duration_seconds = route
            .duration
            .as_deref()
            .and_then(parse_duration_seconds)
            .ok_or_else(|| RoutingError::malformed(PROVIDER, "missing or invalid duration"))?;

        Ok(RouteInfo {
            distance_meters,
            duration_seconds,
            polyline: route.polyline.and_then(|p| p.encoded_polyline),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_seconds() {
        assert_eq!(parse_duration_seconds("1234s"), Some(1234));
        assert_eq!(parse_duration_seconds("12.5s"), Some(13));
        assert_eq!(parse_duration_seconds("0s"), Some(0));
        assert_eq!(parse_duration_seconds("1234"), None);
        assert_eq!(parse_duration_seconds("-5s"), None);
        assert_eq!(parse_duration_seconds("abcs"), None);
    }

    #[test]
    fn test_request_body_shape() {
        let points = [
            GeoPoint::new(40.7128, -74.0060),
            GeoPoint::new(40.7527, -73.9772),
            GeoPoint::new(40.7589, -73.9851),
        ];
        let body = ComputeRoutesRequest {
            origin: (&points[0]).into(),
            destination: (&points[2]).into(),
            intermediates: vec![(&points[1]).into()],
            travel_mode: "DRIVE",
            routing_preference: "TRAFFIC_UNAWARE",
        };
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["origin"]["location"]["latLng"]["latitude"], 40.7128);
        assert_eq!(json["intermediates"][0]["location"]["latLng"]["longitude"], -73.9772);
        assert_eq!(json["travelMode"], "DRIVE");
        assert_eq!(json["routingPreference"], "TRAFFIC_UNAWARE");
    }
}
