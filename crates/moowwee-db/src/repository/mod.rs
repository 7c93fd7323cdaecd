//! # Repository Module
//!
//! Database repository implementations for Moowwee.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Engine service                                                        │
//! │       │                                                                 │
//! │       │  db.jobs().get_by_number("REQ-7GQ2K9XA")                       │
//! │       ▼                                                                 │
//! │  JobRepository                                                         │
//! │  ├── insert(&self, job)            job + stops + materials, one tx     │
//! │  ├── get_by_id / get_by_number     live jobs only                      │
//! │  ├── list_for_user(&self, user)    newest first                        │
//! │  └── update(&self, job)            CAS on (id, version)                │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`JobRepository`](job::JobRepository) - Jobs with their stops and material lines
//! - [`RateRepository`](rate::RateRepository) - Rate configuration and packing catalog
//! - [`ReviewRepository`](review::ReviewRepository) - Customer reviews

pub mod job;
pub mod rate;
pub mod review;

use crate::error::{DbError, DbResult};

/// Narrows a stored INTEGER to `u32`, rejecting rows that cannot be valid.
pub(crate) fn to_u32(value: i64, entity: &str, column: &str) -> DbResult<u32> {
    u32::try_from(value)
        .map_err(|_| DbError::corrupt(entity, format!("{} out of range: {}", column, value)))
}

/// Parses a JSON TEXT column.
pub(crate) fn from_json<T: serde::de::DeserializeOwned>(
    raw: &str,
    entity: &str,
    column: &str,
) -> DbResult<T> {
    serde_json::from_str(raw)
        .map_err(|e| DbError::corrupt(entity, format!("{}: {}", column, e)))
}

/// Serializes a value for a JSON TEXT column.
pub(crate) fn to_json<T: serde::Serialize>(value: &T, column: &str) -> DbResult<String> {
    serde_json::to_string(value)
        .map_err(|e| DbError::Internal(format!("cannot encode {}: {}", column, e)))
}
