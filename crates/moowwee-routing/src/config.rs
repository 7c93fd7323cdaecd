//! # Routing Configuration
//!
//! Provider endpoints, credentials and the per-tier time budget. Embedded in
//! the engine's `[routing]` section.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use moowwee_core::FALLBACK_AVERAGE_SPEED_KMH;

/// Default route-matrix endpoint.
pub const DEFAULT_ROUTES_API_URL: &str =
    "https://routes.googleapis.com/directions/v2:computeRoutes";

/// Default legacy directions endpoint.
pub const DEFAULT_DIRECTIONS_API_URL: &str = "https://maps.googleapis.com/maps/api/directions/json";

/// Default per-tier time budget.
pub const DEFAULT_TIER_TIMEOUT_MS: u64 = 5_000;

/// Routing section of the engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Shared key for both providers. Absent means haversine only.
    pub api_key: Option<String>,
    pub routes_api_url: String,
    pub directions_api_url: String,
    /// Time budget for each network tier, in milliseconds.
    pub tier_timeout_ms: u64,
    /// Average speed used by the geometric estimate.
    pub fallback_speed_kmh: f64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            routes_api_url: DEFAULT_ROUTES_API_URL.to_string(),
            directions_api_url: DEFAULT_DIRECTIONS_API_URL.to_string(),
            tier_timeout_ms: DEFAULT_TIER_TIMEOUT_MS,
            fallback_speed_kmh: FALLBACK_AVERAGE_SPEED_KMH,
        }
    }
}

impl RoutingConfig {
    /// Per-tier time budget.
    pub fn tier_timeout(&self) -> Duration {
        Duration::from_millis(self.tier_timeout_ms)
    }

    /// Returns the API key if one is set and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}
