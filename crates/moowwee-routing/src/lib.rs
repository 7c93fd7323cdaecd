//! # moowwee-routing: Route Resolution for Moowwee
//!
//! Resolves an ordered itinerary into distance and duration through a
//! tiered chain of providers that degrades to a geometric estimate.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Moowwee Quote Flow                               │
//! │                                                                         │
//! │  RequestService::quote(job)                                             │
//! │       │  stops in itinerary order                                      │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  moowwee-routing (THIS CRATE)                   │   │
//! │  │                                                                 │   │
//! │  │   RouteResolver                                                 │   │
//! │  │     ├── RoutesApiProvider      (tier 1, HTTP POST)             │   │
//! │  │     ├── DirectionsApiProvider  (tier 2, HTTP GET)              │   │
//! │  │     └── HaversineStrategy      (backstop, pure)                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │  ResolvedRoute { route, source }                               │
//! │       ▼                                                                 │
//! │  PricingEngine (moowwee-core)                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use moowwee_routing::{RouteResolver, RoutingConfig};
//!
//! let resolver = RouteResolver::from_config(&RoutingConfig::default())?;
//! let resolved = resolver.resolve(&job.itinerary()).await;
//! println!("{} m via {}", resolved.route.distance_meters, resolved.source);
//! ```

pub mod config;
pub mod error;
pub mod providers;
pub mod resolver;

pub use config::RoutingConfig;
pub use error::{RoutingError, RoutingResult};
pub use providers::{DirectionsApiProvider, HaversineStrategy, RoutesApiProvider};
pub use resolver::{ResolvedRoute, RouteResolver, RouteStrategy};
