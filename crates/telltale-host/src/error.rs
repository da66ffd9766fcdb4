//! Error types for the host error bridge.

use thiserror::Error;

/// Errors raised while routing host errors.
///
/// These never reach the host's error handlers; the bridge logs them and
/// falls back to "not handled".
#[derive(Debug, Error)]
pub enum HostError {
    /// A host error arrived before any tracker was registered.
    #[error("Host error bridge has no registered tracker")]
    NotRegistered,

    /// A previously installed handler panicked while being chained.
    #[error("Chained {handler} handler panicked: {message}")]
    HandlerPanicked {
        /// Which handler, `ui` or `platform`.
        handler: &'static str,
        /// The panic message.
        message: String,
    },
}

/// Result type for host bridge operations.
pub type HostResult<T> = std::result::Result<T, HostError>;
