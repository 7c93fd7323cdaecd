//! # Moowwee Engine
//!
//! Orchestration layer: wires the pure core to SQLite, the routing
//! providers and the payment processor.
//!
//! ## Module Organization
//! ```text
//! moowwee_engine/
//! ├── lib.rs              ◄─── Engine bundle & tracing setup
//! ├── config.rs           ◄─── Layered configuration (defaults, TOML, env)
//! ├── error.rs            ◄─── EngineError, ErrorCode, ApiError
//! ├── payment.rs          ◄─── CheckoutGateway + processor client
//! └── services/
//!     ├── request_service.rs     ◄─── create, edit, quote, transition, tips
//!     ├── settlement_service.rs  ◄─── payment and tips checkout
//!     └── review_service.rs      ◄─── customer reviews
//! ```
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Engine Startup                                  │
//! │                                                                         │
//! │  1. EngineConfig::load ──► defaults, engine.toml, environment          │
//! │  2. init_tracing ────────► EnvFilter (RUST_LOG wins over config)       │
//! │  3. Database::new ───────► SQLite (WAL), pending migrations applied    │
//! │  4. RouteResolver ───────► routes API → directions API → haversine     │
//! │  5. CheckoutGateway ─────► processor client (credentials optional)     │
//! │  6. Services ────────────► share one Database handle                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod payment;
pub mod services;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use moowwee_db::{Database, DbConfig};
use moowwee_routing::RouteResolver;

pub use config::{ConfigError, EngineConfig};
pub use error::{ApiError, EngineError, EngineResult, ErrorCode};
pub use payment::{CheckoutGateway, StripeCheckoutGateway};
pub use services::{PaymentSession, Quote, RequestService, ReviewService, SettlementService};

/// The services of one engine instance.
#[derive(Clone)]
pub struct Engine {
    pub db: Database,
    pub requests: RequestService,
    pub settlement: Arc<SettlementService>,
    pub reviews: ReviewService,
}

impl Engine {
    /// Opens the configured database and builds every service.
    pub async fn from_config(config: &EngineConfig) -> EngineResult<Self> {
        let path = config.database_path()?;
        let db = Database::new(
            DbConfig::new(&path)
                .max_connections(config.database.max_connections)
                .min_connections(config.database.min_connections),
        )
        .await?;

        let resolver = RouteResolver::from_config(&config.routing)
            .map_err(|e| ConfigError::invalid("routing", e.to_string()))?;
        info!(tiers = ?resolver.tier_names(), "Route resolver ready");

        let gateway = StripeCheckoutGateway::new(&config.payments)?;
        if config.payments.secret_key().is_none() {
            info!("No payment processor key configured; settlement is unavailable");
        }

        Ok(Engine::assemble(
            db,
            Arc::new(resolver),
            Arc::new(gateway),
            &config.payments.currency,
        ))
    }

    /// Builds the services from already constructed collaborators.
    pub fn assemble(
        db: Database,
        resolver: Arc<RouteResolver>,
        gateway: Arc<dyn CheckoutGateway>,
        currency: &str,
    ) -> Self {
        Engine {
            requests: RequestService::new(db.clone(), resolver),
            settlement: Arc::new(SettlementService::new(db.clone(), gateway, currency)),
            reviews: ReviewService::new(db.clone()),
            db,
        }
    }
}

/// Initializes the tracing subscriber.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=moowwee_routing=trace` - Trace provider calls only
/// - Default: the `[logging] filter` from configuration
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    // A second call (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
