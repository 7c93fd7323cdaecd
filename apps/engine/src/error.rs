//! # Engine Error Type
//!
//! Unified error type for engine services.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Moowwee                                │
//! │                                                                         │
//! │  ValidationError ──► CoreError ──┐                                     │
//! │  DbError ────────────────────────┼──► EngineError ──► ApiError         │
//! │  PaymentError ───────────────────┤        │            {code, message} │
//! │  ConfigError ────────────────────┘        │                             │
//! │                                           ▼                             │
//! │                                   ErrorCode::IllegalTransition, ...    │
//! │                                                                         │
//! │  RoutingError never reaches this layer: the resolver absorbs it.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;

use moowwee_core::CoreError;
use moowwee_db::DbError;

use crate::config::ConfigError;
use crate::payment::PaymentError;

/// Errors returned by engine services.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Validation, lifecycle, ownership and settlement-rule failures.
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),

    /// The processor failed or reported a non-paid session. The job is
    /// unchanged.
    #[error("Settlement failed: {0}")]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The processor answered, but the session does not settle this job.
    #[error("Settlement failed: {0}")]
    SettlementRejected(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Machine-readable category.
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::Core(err) => match err {
                CoreError::Validation(_) => ErrorCode::ValidationError,
                CoreError::IllegalTransition { .. } => ErrorCode::IllegalTransition,
                CoreError::Unauthorized { .. } => ErrorCode::Unauthorized,
                CoreError::StateConflict { .. }
                | CoreError::PriceNotQuoted { .. }
                | CoreError::PaymentAlreadySettled { .. }
                | CoreError::TipsAlreadySettled { .. }
                | CoreError::TipsNotRecorded { .. }
                | CoreError::Deleted { .. } => ErrorCode::StateConflict,
            },
            EngineError::Db(err) => match err {
                DbError::NotFound { .. } => ErrorCode::NotFound,
                DbError::UniqueViolation { .. } | DbError::VersionConflict { .. } => {
                    ErrorCode::Conflict
                }
                _ => ErrorCode::DatabaseError,
            },
            EngineError::Payment(_) | EngineError::SettlementRejected(_) => {
                ErrorCode::SettlementFailed
            }
            EngineError::NotFound { .. } => ErrorCode::NotFound,
            EngineError::Conflict(_) => ErrorCode::Conflict,
            EngineError::Config(_) | EngineError::Internal(_) => ErrorCode::Internal,
        }
    }
}

/// Result type for engine services.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Caller-facing View
// =============================================================================

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed input (400)
    ValidationError,

    /// The operational state machine refused the move (409)
    IllegalTransition,

    /// Mutation outside its allowed window (409)
    StateConflict,

    /// Actor does not own the job (403)
    Unauthorized,

    /// Resource not found (404)
    NotFound,

    /// Payment processor error or non-paid session (402)
    SettlementFailed,

    /// Concurrent write or duplicate (409)
    Conflict,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal error (500)
    Internal,
}

/// What a caller receives when an operation fails.
///
/// ```json
/// {
///   "code": "ILLEGAL_TRANSITION",
///   "message": "Job REQ-7GQ2K9XA cannot move from completed to active"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl From<&EngineError> for ApiError {
    fn from(err: &EngineError) -> Self {
        let code = err.code();
        let message = match code {
            // Keep storage details in the logs
            ErrorCode::DatabaseError | ErrorCode::Internal => {
                tracing::error!(error = %err, "Internal failure");
                "Internal error".to_string()
            }
            _ => err.to_string(),
        };
        ApiError { code, message }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError::from(&err)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use moowwee_core::{JobStatus, ValidationError};

    #[test]
    fn test_codes() {
        let err: EngineError = CoreError::IllegalTransition {
            job: "REQ-AAAA0001".to_string(),
            from: JobStatus::Completed,
            to: JobStatus::Active,
        }
        .into();
        assert_eq!(err.code(), ErrorCode::IllegalTransition);

        let err: EngineError = CoreError::from(ValidationError::required("stops")).into();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err: EngineError = DbError::VersionConflict {
            entity: "Job".to_string(),
            id: "REQ-AAAA0001".to_string(),
            expected: 3,
        }
        .into();
        assert_eq!(err.code(), ErrorCode::Conflict);

        let err: EngineError = PaymentError::MissingCredentials.into();
        assert_eq!(err.code(), ErrorCode::SettlementFailed);
    }

    #[test]
    fn test_api_error_serialization() {
        let err: EngineError = CoreError::state_conflict(
            "REQ-AAAA0001",
            JobStatus::Active,
            "update job",
        )
        .into();
        let api = ApiError::from(err);
        let json = serde_json::to_value(&api).unwrap();

        assert_eq!(json["code"], "STATE_CONFLICT");
        assert_eq!(json["message"], "Job REQ-AAAA0001 is active; cannot update job");
    }

    #[test]
    fn test_database_details_are_hidden() {
        let err: EngineError = DbError::QueryFailed("no such table: jobs".to_string()).into();
        let api = ApiError::from(&err);
        assert_eq!(api.code, ErrorCode::DatabaseError);
        assert_eq!(api.message, "Internal error");
    }
}
