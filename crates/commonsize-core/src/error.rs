//! Error types for statement building and benchmark operations.
//!
//! This module defines [`CommonSizeError`] which covers every failure that can
//! occur while fetching facts, building statements, or caching benchmarks.

use thiserror::Error;

/// Errors that can occur while producing common-size statements.
#[derive(Error, Debug)]
pub enum CommonSizeError {
    /// The denominator line is missing or zero, so no ratios can be computed.
    #[error("Statement unavailable: {0}")]
    StatementUnavailable(String),

    /// Network-related errors (connection failures, bad status codes, timeouts).
    #[error("Network error: {0}")]
    Network(String),

    /// Rate limit exceeded by a provider.
    #[error("Rate limited by {provider}: retry after {retry_after:?}")]
    RateLimited {
        /// The provider that rate limited the request.
        provider: String,
        /// Suggested time to wait before retrying.
        retry_after: Option<std::time::Duration>,
    },

    /// Authentication failed for a provider.
    #[error("Authentication failed for provider {0}")]
    AuthenticationFailed(String),

    /// A provider response could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The requested ticker or CIK could not be resolved.
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    /// A stored benchmark was written for a different layout.
    #[error("Benchmark schema mismatch: expected {expected} lines, stored {stored}")]
    SchemaMismatch {
        /// Line count of the caller's current layout.
        expected: usize,
        /// Line count recorded with the stored benchmark.
        stored: usize,
    },

    /// A ratio vector did not match its declared line count.
    #[error("Validation error: {0}")]
    Validation(String),

    /// No peer produced data for an industry benchmark.
    #[error("No peer data: {0}")]
    NoPeerData(String),

    /// Error interacting with the benchmark/job store.
    #[error("Store error: {0}")]
    Store(String),

    /// An invalid parameter or configuration value was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl CommonSizeError {
    /// Returns true if the error originated from the external fact provider.
    #[must_use]
    pub const fn is_provider_error(&self) -> bool {
        matches!(
            self,
            Self::Network(_)
                | Self::RateLimited { .. }
                | Self::AuthenticationFailed(_)
                | Self::Parse(_)
        )
    }
}

/// Result type alias using [`CommonSizeError`].
pub type Result<T> = std::result::Result<T, CommonSizeError>;
