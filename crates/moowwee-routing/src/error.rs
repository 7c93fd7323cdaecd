//! # Routing Errors
//!
//! Failures of a single provider tier. The resolver logs these and moves on
//! to the next tier; callers never see them.

use thiserror::Error;

/// A provider tier failure.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// No API key is configured for the provider.
    #[error("{provider}: no API key configured")]
    MissingCredentials { provider: &'static str },

    /// Transport-level failure (connect, TLS, body read).
    #[error("{provider}: request failed: {source}")]
    Http {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The provider answered with a non-success HTTP status.
    #[error("{provider}: HTTP {status}")]
    Status { provider: &'static str, status: u16 },

    /// The provider answered but reported an error in its body.
    #[error("{provider}: provider status {status}")]
    Provider {
        provider: &'static str,
        status: String,
    },

    /// The body could not be interpreted.
    #[error("{provider}: malformed response: {reason}")]
    Malformed {
        provider: &'static str,
        reason: String,
    },

    /// The tier did not answer within its time budget.
    #[error("{provider}: timed out after {after_ms} ms")]
    Timeout { provider: &'static str, after_ms: u64 },

    /// Fewer than two points were given.
    #[error("at least 2 stops are required, got {count}")]
    TooFewStops { count: usize },

    /// A configured provider URL does not parse.
    #[error("invalid provider URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The shared HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl RoutingError {
    pub(crate) fn malformed(provider: &'static str, reason: impl Into<String>) -> Self {
        RoutingError::Malformed {
            provider,
            reason: reason.into(),
        }
    }
}

/// Convenience type alias for Results with RoutingError.
pub type RoutingResult<T> = Result<T, RoutingError>;
