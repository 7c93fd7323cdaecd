//! Geometric backstop tier. Never fails.

use async_trait::async_trait;

use moowwee_core::geo::estimate_route_at;
use moowwee_core::types::{GeoPoint, RouteInfo};

use crate::error::RoutingResult;
use crate::resolver::RouteStrategy;

/// Great-circle estimate over consecutive stops at a fixed average speed.
#[derive(Debug, Clone, Copy)]
pub struct HaversineStrategy {
    speed_kmh: f64,
}

impl HaversineStrategy {
    pub fn new(speed_kmh: f64) -> Self {
        Self { speed_kmh }
    }

    /// Infallible form used by the resolver once every network tier failed.
    pub fn estimate(&self, points: &[GeoPoint]) -> RouteInfo {
        estimate_route_at(points, self.speed_kmh)
    }
}

impl Default for HaversineStrategy {
    fn default() -> Self {
        Self::new(moowwee_core::FALLBACK_AVERAGE_SPEED_KMH)
    }
}

#[async_trait]
impl RouteStrategy for HaversineStrategy {
    fn name(&self) -> &'static str {
        "haversine"
    }

    async fn resolve(&self, points: &[GeoPoint]) -> RoutingResult<RouteInfo> {
        Ok(self.estimate(points))
    }
}
