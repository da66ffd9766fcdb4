//! Error types for the dispatch core.
//!
//! None of these ever cross the public reporting API: delegate errors are
//! caught and logged locally, and configuration errors are only returned by
//! the explicit validation entry points.

use std::time::Duration;

use thiserror::Error;

/// Errors a delegate may return while accepting a report.
#[derive(Debug, Error)]
pub enum DelegateError {
    /// The delegate refused the report.
    #[error("Delegate declined the report: {0}")]
    Declined(String),

    /// The backend behind the delegate could not be reached.
    #[error("Delegate unavailable: {0}")]
    Unavailable(String),

    /// The delegate did not finish within the configured limit.
    #[error("Delegate timed out after {0:?}")]
    Timeout(Duration),

    /// The delegate panicked while accepting the report.
    #[error("Delegate panicked: {0}")]
    Panicked(String),

    /// Any other backend failure.
    #[error("Delegate backend error: {0}")]
    Backend(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl DelegateError {
    /// Wrap an arbitrary backend error.
    pub fn backend(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        DelegateError::Backend(Box::new(error))
    }
}

/// Result type for delegate operations.
pub type DelegateResult<T> = std::result::Result<T, DelegateError>;

/// Errors in a tracker configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The display name was empty.
    #[error("Invalid configuration: display name must not be empty")]
    EmptyName,

    /// A zero delegate timeout would fail every delivery.
    #[error("Invalid configuration: delegate timeout must be non-zero")]
    ZeroTimeout,
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
