//! # moowwee-core: Pure Business Logic for Moowwee
//!
//! This crate is the **heart** of the moving-request engine. It contains the
//! pricing, tips and lifecycle rules as pure functions with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Moowwee Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  apps/engine (services)                         │   │
//! │  │   create_job ──► quote ──► transition ──► settle ──► tips       │   │
//! │  └───────┬──────────────────────┬──────────────────────┬──────────┘   │
//! │          │                      │                      │               │
//! │  ┌───────▼────────┐   ┌─────────▼──────────┐   ┌──────▼───────────┐   │
//! │  │ moowwee-routing│   │ ★ moowwee-core ★   │   │   moowwee-db     │   │
//! │  │ RouteResolver  │   │                    │   │ JobRepository    │   │
//! │  │ (HTTP tiers +  │──►│ pricing  tips      │◄──│ RateRepository   │   │
//! │  │  haversine)    │   │ lifecycle  geo     │   │ ReviewRepository │   │
//! │  └────────────────┘   │ money  validation  │   └──────────────────┘   │
//! │                       │                    │                           │
//! │                       │ NO I/O • PURE      │                           │
//! │                       └────────────────────┘                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Job, Stop, MaterialLine, RateConfiguration, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation (stops, crew, materials, reviews)
//! - [`geo`] - Great-circle distance and the fallback route estimate
//! - [`pricing`] - PricingEngine: job + distance + rates → price breakdown
//! - [`tips`] - TipsCalculator: gratuity derivation and crew distribution
//! - [`lifecycle`] - RequestLifecycle: operational, payment and tips axes
//!
//! ## Example Usage
//!
//! ```rust
//! use moowwee_core::money::Money;
//! use moowwee_core::types::Percentage;
//!
//! let price = Money::from_cents(20_000); // $200.00
//! let tip = price.percentage(Percentage::from_whole(15));
//! assert_eq!(tip.cents(), 3_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod geo;
pub mod lifecycle;
pub mod money;
pub mod pricing;
pub mod tips;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::{
    LaborDuration, PriceBreakdown, PriceLine, PriceLineKind, PricingEngine, PricingWarning,
};
pub use tips::TipInput;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Prefix of the human-readable job identifier (`REQ-7GQ2K9XA`).
pub const REQUEST_NUMBER_PREFIX: &str = "REQ";

/// Number of random characters after the prefix.
pub const REQUEST_NUMBER_LENGTH: usize = 8;

/// Minimum billable labor for any move, in minutes.
///
/// ## Business Reason
/// Crews are dispatched for at least two hours regardless of how short the
/// itinerary is.
pub const MIN_LABOR_MINUTES: u32 = 120;

/// Labor beyond the minimum is billed in quarter-hour increments.
pub const LABOR_INCREMENT_MINUTES: u32 = 15;

/// Average road speed assumed by the geometric fallback estimate.
pub const FALLBACK_AVERAGE_SPEED_KMH: f64 = 40.0;

/// Largest crew a single job may book.
pub const MAX_CREW_SIZE: u32 = 20;

/// Default currency for checkout sessions.
pub const DEFAULT_CURRENCY: &str = "usd";
