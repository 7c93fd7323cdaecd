//! # Route Resolver
//!
//! Chain of routing strategies tried in order until one produces a usable
//! route. The haversine backstop closes the chain and cannot fail.
//!
//! ```text
//!   resolve(stops)
//!        │
//!        ▼
//!   ┌──────────────┐  err / timeout / unusable
//!   │ routes_api   │ ─────────────────────────┐
//!   └──────┬───────┘                          ▼
//!          │ ok                        ┌──────────────┐  err / timeout
//!          │                           │ directions   │ ──────────────┐
//!          │                           └──────┬───────┘               ▼
//!          │                                  │ ok             ┌─────────────┐
//!          ▼                                  ▼                │ haversine   │
//!     ResolvedRoute ◄─────────────────────────┴────────────────┤ (infallible)│
//!                                                              └─────────────┘
//! ```
//!
//! Every network tier runs under its own `tokio::time::timeout`; a hung
//! provider costs at most one budget. Tier failures are logged at `warn`
//! and never returned.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, warn};

use moowwee_core::geo::path_length_meters;
use moowwee_core::types::{GeoPoint, RouteInfo};

use crate::config::RoutingConfig;
use crate::error::{RoutingError, RoutingResult};
use crate::providers::{DirectionsApiProvider, HaversineStrategy, RoutesApiProvider};

// =============================================================================
// Strategy Trait
// =============================================================================

/// One way of turning an ordered itinerary into a route.
///
/// Implementations must honour the given order and never re-optimise it.
#[async_trait]
pub trait RouteStrategy: Send + Sync {
    /// Short name used in logs and in [`ResolvedRoute::source`].
    fn name(&self) -> &'static str;

    async fn resolve(&self, points: &[GeoPoint]) -> RoutingResult<RouteInfo>;
}

/// A route together with the tier that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRoute {
    pub route: RouteInfo,
    pub source: &'static str,
}

impl ResolvedRoute {
    /// Returns true if the geometric backstop produced this route.
    pub fn is_estimate(&self) -> bool {
        self.source == "haversine"
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Ordered chain of network tiers plus the haversine backstop.
pub struct RouteResolver {
    tiers: Vec<Box<dyn RouteStrategy>>,
    backstop: HaversineStrategy,
    tier_timeout: Duration,
}

impl RouteResolver {
    /// Builds a resolver from explicit tiers.
    pub fn new(
        tiers: Vec<Box<dyn RouteStrategy>>,
        backstop: HaversineStrategy,
        tier_timeout: Duration,
    ) -> Self {
        Self {
            tiers,
            backstop,
            tier_timeout,
        }
    }

    /// Resolver with no network tiers.
    pub fn haversine_only(speed_kmh: f64) -> Self {
        Self::new(
            Vec::new(),
            HaversineStrategy::new(speed_kmh),
            Duration::from_millis(0),
        )
    }

    /// Builds the standard chain: route-matrix, then directions, then
    /// haversine.
    pub fn from_config(config: &RoutingConfig) -> RoutingResult<Self> {
        let client = Client::builder()
            .timeout(config.tier_timeout())
            .build()
            .map_err(RoutingError::Client)?;
        let api_key = config.api_key().map(str::to_string);

        if api_key.is_none() {
            info!("No routing API key configured; distances will be estimated");
        }

        let tiers: Vec<Box<dyn RouteStrategy>> = vec![
            Box::new(RoutesApiProvider::new(
                client.clone(),
                &config.routes_api_url,
                api_key.clone(),
            )?),
            Box::new(DirectionsApiProvider::new(
                client,
                &config.directions_api_url,
                api_key,
            )?),
        ];

        Ok(Self::new(
            tiers,
            HaversineStrategy::new(config.fallback_speed_kmh),
            config.tier_timeout(),
        ))
    }

    /// Names of the network tiers in order.
    pub fn tier_names(&self) -> Vec<&'static str> {
        self.tiers.iter().map(|t| t.name()).collect()
    }

    /// Resolves an itinerary. Never fails.
    pub async fn resolve(&self, points: &[GeoPoint]) -> ResolvedRoute {
        if points.len() < 2 {
            debug!(stops = points.len(), "Too few stops for providers; estimating");
            return self.estimate(points);
        }

        for tier in &self.tiers {
            match tokio::time::timeout(self.tier_timeout, tier.resolve(points)).await {
                Ok(Ok(route)) if is_usable(&route, points) => {
                    debug!(
                        tier = tier.name(),
                        distance_meters = route.distance_meters,
                        duration_seconds = route.duration_seconds,
                        "Route resolved"
                    );
                    return ResolvedRoute {
                        route,
                        source: tier.name(),
                    };
                }
                Ok(Ok(route)) => {
                    warn!(
                        tier = tier.name(),
                        distance_meters = route.distance_meters,
                        "Routing tier returned an unusable route; falling back"
                    );
                }
                Ok(Err(err)) => {
                    warn!(tier = tier.name(), error = %err, "Routing tier failed; falling back");
                }
                Err(_) => {
                    let err = RoutingError::Timeout {
                        provider: tier.name(),
                        after_ms: self.tier_timeout.as_millis() as u64,
                    };
                    warn!(tier = tier.name(), error = %err, "Routing tier timed out; falling back");
                }
            }
        }

        self.estimate(points)
    }

    fn estimate(&self, points: &[GeoPoint]) -> ResolvedRoute {
        ResolvedRoute {
            route: self.backstop.estimate(points),
            source: self.backstop.name(),
        }
    }
}

/// A zero distance for stops that are actually apart is not a route.
fn is_usable(route: &RouteInfo, points: &[GeoPoint]) -> bool {
    route.distance_meters > 0 || path_length_meters(points) < 1.0
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    /// Scripted tier for chain tests.
    struct Scripted {
        name: &'static str,
        outcome: fn() -> RoutingResult<RouteInfo>,
        delay: Duration,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RouteStrategy for Scripted {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn resolve(&self, _points: &[GeoPoint]) -> RoutingResult<RouteInfo> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            (self.outcome)()
        }
    }

    fn scripted(
        name: &'static str,
        outcome: fn() -> RoutingResult<RouteInfo>,
        delay: Duration,
    ) -> (Box<dyn RouteStrategy>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let tier = Scripted {
            name,
            outcome,
            delay,
            calls: calls.clone(),
        };
        (Box::new(tier), calls)
    }

    fn ok_route() -> RoutingResult<RouteInfo> {
        Ok(RouteInfo {
            distance_meters: 7_000,
            duration_seconds: 900,
            polyline: Some("abc".to_string()),
        })
    }

    fn zero_route() -> RoutingResult<RouteInfo> {
        Ok(RouteInfo {
            distance_meters: 0,
            duration_seconds: 0,
            polyline: None,
        })
    }

    fn failure() -> RoutingResult<RouteInfo> {
        Err(RoutingError::Status {
            provider: "scripted",
            status: 503,
        })
    }

    fn points() -> Vec<GeoPoint> {
        vec![
            GeoPoint::new(40.7128, -74.0060),
            GeoPoint::new(40.7589, -73.9851),
        ]
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let (first, first_calls) = scripted("first", ok_route, Duration::ZERO);
        let (second, second_calls) = scripted("second", ok_route, Duration::ZERO);
        let resolver = RouteResolver::new(
            vec![first, second],
            HaversineStrategy::default(),
            Duration::from_secs(1),
        );

        let resolved = resolver.resolve(&points()).await;
        assert_eq!(resolved.source, "first");
        assert_eq!(resolved.route.distance_meters, 7_000);
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failure_falls_through_in_order() {
        let (first, _) = scripted("first", failure, Duration::ZERO);
        let (second, _) = scripted("second", ok_route, Duration::ZERO);
        let resolver = RouteResolver::new(
            vec![first, second],
            HaversineStrategy::default(),
            Duration::from_secs(1),
        );

        assert_eq!(resolver.resolve(&points()).await.source, "second");
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let (slow, _) = scripted("slow", ok_route, Duration::from_millis(500));
        let resolver = RouteResolver::new(
            vec![slow],
            HaversineStrategy::default(),
            Duration::from_millis(50),
        );

        let resolved = resolver.resolve(&points()).await;
        assert!(resolved.is_estimate());
        assert_eq!(resolved.route.distance_meters, 5420);
        assert_eq!(resolved.route.duration_seconds, 488);
    }

    #[tokio::test]
    async fn test_zero_distance_for_distinct_stops_is_unusable() {
        let (zero, _) = scripted("zero", zero_route, Duration::ZERO);
        let resolver = RouteResolver::new(
            vec![zero],
            HaversineStrategy::default(),
            Duration::from_secs(1),
        );

        assert!(resolver.resolve(&points()).await.is_estimate());
    }

    #[tokio::test]
    async fn test_single_stop_skips_providers() {
        let (tier, calls) = scripted("tier", ok_route, Duration::ZERO);
        let resolver =
            RouteResolver::new(vec![tier], HaversineStrategy::default(), Duration::from_secs(1));

        let resolved = resolver.resolve(&points()[..1]).await;
        assert_eq!(resolved.route.distance_meters, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_from_config_orders_tiers() {
        let resolver = RouteResolver::from_config(&RoutingConfig::default()).unwrap();
        assert_eq!(resolver.tier_names(), vec!["routes_api", "directions_api"]);
    }

    #[test]
    fn test_from_config_rejects_bad_url() {
        let config = RoutingConfig {
            routes_api_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            RouteResolver::from_config(&config),
            Err(RoutingError::InvalidUrl { .. })
        ));
    }
}
