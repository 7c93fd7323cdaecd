//! Legacy point-to-point directions provider (`maps/api/directions/json`).
//!
//! Same origin/destination/waypoint order as the route-matrix tier. The
//! provider returns one leg per consecutive stop pair; legs are summed.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use moowwee_core::types::{GeoPoint, RouteInfo};

use crate::error::{RoutingError, RoutingResult};
use crate::resolver::RouteStrategy;

const PROVIDER: &str = "directions_api";

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    #[serde(default)]
    legs: Vec<Leg>,
    overview_polyline: Option<OverviewPolyline>,
}

#[derive(Debug, Deserialize)]
struct Leg {
    distance: Measure,
    duration: Measure,
}

#[derive(Debug, Deserialize)]
struct Measure {
    value: u64,
}

#[derive(Debug, Deserialize)]
struct OverviewPolyline {
    points: String,
}

fn format_point(point: &GeoPoint) -> String {
    format!("{},{}", point.latitude, point.longitude)
}

/// Directions tier.
pub struct DirectionsApiProvider {
    client: Client,
    url: Url,
    api_key: Option<String>,
}

impl DirectionsApiProvider {
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

    fn request_url(&self, points: &[GeoPoint], api_key: &str) -> RoutingResult<Url> {
        let (origin, rest) = points
            .split_first()
            .ok_or(RoutingError::TooFewStops { count: 0 })?;
        let (destination, waypoints) = rest.split_last().ok_or(RoutingError::TooFewStops {
            count: points.len(),
        })?;

        let mut url = self.url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("origin", &format_point(origin))
                .append_pair("destination", &format_point(destination));
            if !waypoints.is_empty() {
                let joined = waypoints
                    .iter()
                    .map(format_point)
                    .collect::<Vec<_>>()
                    .join("|");
                query.append_pair("waypoints", &joined);
            }
            query
                .append_pair("mode", "driving")
                .append_pair("key", api_key);
        }
        Ok(url)
    }
}

#[async_trait]
impl RouteStrategy for DirectionsApiProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn resolve(&self, points: &[GeoPoint]) -> RoutingResult<RouteInfo> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(RoutingError::MissingCredentials { provider: PROVIDER })?;
        let url = self.request_url(points, api_key)?;

        debug!(stops = points.len(), "Requesting directions");
        let response = self
            .client
            .get(url)
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

        let parsed: DirectionsResponse = response
            .json()
            .await
            .map_err(|e| RoutingError::malformed(PROVIDER, e.to_string()))?;

        if parsed.status != "OK" {
            return Err(RoutingError::Provider {
                provider: PROVIDER,
                status: parsed.status,
            });
        }

        let route = parsed
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| RoutingError::malformed(PROVIDER, "no routes returned"))?;

        if route.legs.is_empty() {
            return Err(RoutingError::malformed(PROVIDER, "route has no legs"));
        }

        let (distance_meters, duration_seconds) = route
            .legs
            .iter()
            .fold((0u64, 0u64), |(d, t), leg| {
                (d + leg.distance.value, t + leg.duration.value)
            });

        Ok(RouteInfo {
            distance_meters,
            duration_seconds,
            polyline: route.overview_polyline.map(|p| p.points),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_url_keeps_waypoint_order() {
        let provider = DirectionsApiProvider::new(
            Client::new(),
            "https://maps.example.com/directions/json",
            Some("k".to_string()),
        )
        .unwrap();
        let points = [
            GeoPoint::new(1.0, 2.0),
            GeoPoint::new(3.0, 4.0),
            GeoPoint::new(5.0, 6.0),
            GeoPoint::new(7.0, 8.0),
        ];
        let url = provider.request_url(&points, "k").unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        assert!(pairs.contains(&("origin".to_string(), "1,2".to_string())));
        assert!(pairs.contains(&("destination".to_string(), "7,8".to_string())));
        assert!(pairs.contains(&("waypoints".to_string(), "3,4|5,6".to_string())));
        assert!(pairs.contains(&("mode".to_string(), "driving".to_string())));
    }

    #[test]
    fn test_two_stops_have_no_waypoints() {
        let provider =
            DirectionsApiProvider::new(Client::new(), "https://maps.example.com/d", None).unwrap();
        let url = provider
            .request_url(&[GeoPoint::new(1.0, 2.0), GeoPoint::new(3.0, 4.0)], "k")
            .unwrap();
        assert!(url.query_pairs().all(|(k, _)| k != "waypoints"));
    }
}
