//! # moowwee-db: Database Layer for Moowwee
//!
//! This crate persists jobs, their stops and material lines, the rate
//! configuration with its packing catalog, and reviews. It uses SQLite
//! through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Moowwee Data Flow                                │
//! │                                                                         │
//! │  RequestService::update_job                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    moowwee-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ JobRepo       │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ RateRepo      │    │ 001_initial  │  │   │
//! │  │   │ Connection    │    │ ReviewRepo    │    │ _schema.sql  │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (path from [database] config)                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (job, rate, review)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use moowwee_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("moowwee.db")).await?;
//! let rates = db.rates().load().await?;
//! let job = db.jobs().get_by_number("REQ-7GQ2K9XA").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::job::JobRepository;
pub use repository::rate::RateRepository;
pub use repository::review::ReviewRepository;
