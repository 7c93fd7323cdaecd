//! Routing provider tiers.
//!
//! | Tier | Provider | Failure modes |
//! |------|----------|---------------|
//! | 1 | [`RoutesApiProvider`] | HTTP error, no routes, bad duration, timeout |
//! | 2 | [`DirectionsApiProvider`] | HTTP error, status != OK, no legs, timeout |
//! | 3 | [`HaversineStrategy`] | none |

pub mod directions_api;
pub mod haversine;
pub mod routes_api;

pub use directions_api::DirectionsApiProvider;
pub use haversine::HaversineStrategy;
pub use routes_api::RoutesApiProvider;
