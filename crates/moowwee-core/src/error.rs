//! # Error Types
//!
//! Domain-specific error types for moowwee-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  moowwee-core errors (this file)                                       │
//! │  ├── CoreError        - Lifecycle, ownership and settlement rules      │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  moowwee-routing errors (separate crate)                               │
//! │  └── RoutingError     - Provider tier failures (never surfaced)        │
//! │                                                                         │
//! │  moowwee-db errors (separate crate)                                    │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  engine errors (apps/engine)                                           │
//! │  └── EngineError      - What callers see ({code, message})             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Taxonomy
//! - *Validation*: malformed input, surfaced immediately, never retried
//! - *Illegal transition*: the operational state machine refuses the move
//! - *State conflict*: a mutation outside its allowed window
//! - *Unauthorized*: the acting party does not own the job

use thiserror::Error;

use crate::types::{JobStatus, PaymentStatus, TipsPaymentStatus};

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The operational state machine does not allow this move.
    ///
    /// ## When This Occurs
    /// - `completed → active` (completed is final apart from itself)
    /// - `cancelled → anything` (cancelled is terminal)
    /// - `break → completed` (a break must return to active first)
    #[error("Job {job} cannot move from {from} to {to}")]
    IllegalTransition {
        job: String,
        from: JobStatus,
        to: JobStatus,
    },

    /// A mutation was attempted outside the window that allows it.
    ///
    /// ## When This Occurs
    /// - Editing stops, materials, crew, schedule or property type after the
    ///   job left `pending`
    /// - Recording tips before the job is `completed`
    #[error("Job {job} is {status}; cannot {operation}")]
    StateConflict {
        job: String,
        status: JobStatus,
        operation: String,
    },

    /// The acting party does not own the job.
    #[error("Actor {actor} is not allowed to {operation} on job {job}")]
    Unauthorized {
        job: String,
        actor: String,
        operation: String,
    },

    /// The job has no quoted price yet (or the quote went stale).
    #[error("Job {job} has no quoted price")]
    PriceNotQuoted { job: String },

    /// Payment was already settled; the payment axis never regresses.
    #[error("Job {job} payment is already {status}")]
    PaymentAlreadySettled { job: String, status: PaymentStatus },

    /// Tips payment was already settled.
    #[error("Job {job} tips payment is already {status}")]
    TipsAlreadySettled {
        job: String,
        status: TipsPaymentStatus,
    },

    /// No tips have been recorded for the job.
    #[error("Job {job} has no recorded tips")]
    TipsNotRecorded { job: String },

    /// The job was soft-deleted and only serves billing history.
    #[error("Job {job} has been deleted")]
    Deleted { job: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a StateConflict error for an operation.
    pub fn state_conflict(
        job: impl Into<String>,
        status: JobStatus,
        operation: impl Into<String>,
    ) -> Self {
        CoreError::StateConflict {
            job: job.into(),
            status,
            operation: operation.into(),
        }
    }

    /// Creates an Unauthorized error for an operation.
    pub fn unauthorized(
        job: impl Into<String>,
        actor: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        CoreError::Unauthorized {
            job: job.into(),
            actor: actor.into(),
            operation: operation.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Every variant names the offending field so callers can point at it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Coordinate component is out of range.
    #[error("{field} must be between {min} and {max}, got {value}")]
    CoordinateOutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid request number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A collection has too few entries.
    #[error("{field} must contain at least {min} entries")]
    TooFew { field: String, min: usize },

    /// Exactly one of a group of fields must be given.
    #[error("exactly one of {fields:?} must be provided")]
    ExactlyOneOf { fields: Vec<String> },

    /// Duplicate value (e.g., duplicate stop sequence).
    #[error("{field} '{value}' appears more than once")]
    Duplicate { field: String, value: String },

    /// A structural rule over several fields is violated.
    #[error("{field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl ValidationError {
    /// Creates a Required error.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Creates an Invalid error.
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns the name of the offending field.
    pub fn field(&self) -> String {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::CoordinateOutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::MustNotBeNegative { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::TooFew { field, .. }
            | ValidationError::Duplicate { field, .. }
            | ValidationError::Invalid { field, .. } => field.clone(),
            ValidationError::ExactlyOneOf { fields } => fields.join("|"),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
