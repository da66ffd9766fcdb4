//! The delegate contract.
//!
//! A delegate is the pluggable backend that decides what happens to each
//! report: send it somewhere, persist it, print it, or drop it. The core
//! only ever talks to `dyn Delegate` and never assumes one is present.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use telltale_record::{ErrorReport, Event};

use crate::error::DelegateResult;

/// A reporting backend.
///
/// Every method receives an already-normalized record. Returning an error
/// (or panicking) is treated as "declined": the core logs it locally and
/// never lets it reach the caller of the reporting API. Implementations
/// must tolerate concurrent calls; the core does not serialize them.
///
/// # Example
///
/// ```ignore
/// use telltale_core::{Delegate, DelegateResult};
/// use telltale_record::{ErrorReport, Event};
///
/// struct Stdout;
///
/// #[async_trait::async_trait]
/// impl Delegate for Stdout {
///     async fn event(&self, event: &Event) -> DelegateResult<()> {
///         println!("{}", event.name);
///         Ok(())
///     }
///     async fn event_failure(&self, event: &Event) -> DelegateResult<()> {
///         println!("failed: {}", event.name);
///         Ok(())
///     }
///     async fn error(&self, error: &ErrorReport) -> DelegateResult<()> {
///         println!("error: {:?}", error.msg);
///         Ok(())
///     }
///     async fn log(&self, entry: &Event) -> DelegateResult<()> {
///         println!("log: {}", entry.name);
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Delegate: Send + Sync {
    /// Accept a successful event.
    async fn event(&self, event: &Event) -> DelegateResult<()>;

    /// Accept a failed event.
    async fn event_failure(&self, event: &Event) -> DelegateResult<()>;

    /// Accept a captured error.
    async fn error(&self, error: &ErrorReport) -> DelegateResult<()>;

    /// Accept a free-form log entry.
    async fn log(&self, entry: &Event) -> DelegateResult<()>;

    /// Name used in local diagnostics.
    fn name(&self) -> &str {
        "delegate"
    }
}

/// A delegate shared between the host and the core.
pub type SharedDelegate = Arc<dyn Delegate>;

/// The four delegate capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegateMethod {
    /// [`Delegate::event`].
    Event,
    /// [`Delegate::event_failure`].
    EventFailure,
    /// [`Delegate::error`].
    Error,
    /// [`Delegate::log`].
    Log,
}

impl DelegateMethod {
    /// All methods, in declaration order.
    pub const ALL: [DelegateMethod; 4] = [
        DelegateMethod::Event,
        DelegateMethod::EventFailure,
        DelegateMethod::Error,
        DelegateMethod::Log,
    ];

    /// Method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            DelegateMethod::Event => "event",
            DelegateMethod::EventFailure => "event_failure",
            DelegateMethod::Error => "error",
            DelegateMethod::Log => "log",
        }
    }
}

impl fmt::Display for DelegateMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
