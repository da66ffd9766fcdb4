//! Telltale Core - Dispatch Core
//!
//! This crate turns calls into reports. It includes:
//!
//! - [`Tracker`]: runs wrapped work inside a fault boundary, classifies the
//!   outcome, and forwards a record to the delegate
//! - [`Delegate`]: the pluggable backend contract
//! - [`TrackerConfig`]/[`TrackerSettings`]: behavior and verbosity knobs
//! - [`LogSink`]: where local log lines go
//! - [`TrackedFutureExt`]/[`TrackedStreamExt`]: tracking at the call site
//!
//! # Quick Start
//!
//! ```ignore
//! use telltale_core::prelude::*;
//!
//! let tracker = Tracker::new(
//!     TrackerConfig::new()
//!         .with_enabled(true)
//!         .with_delegate(Arc::new(MyBackend)),
//! );
//!
//! tracker.event("signup", EventArgs::new().with_msg("ok")).await;
//!
//! let user = tracker
//!     .future(TrackOptions::named("load_user"), load_user(id))
//!     .await;
//! ```
//!
//! # Guarantees
//!
//! 1. **No propagation**: neither wrapped work nor the delegate can make a
//!    reporting call fail or panic
//! 2. **One record per call**: every operation forwards at most one record
//! 3. **Ordering**: the work runs first, then the record is forwarded, then
//!    the local line is written
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          Application / host             │
//! ├─────────────────────────────────────────┤
//! │           telltale (facade)             │
//! ├─────────────────────────────────────────┤
//! │ telltale-core │ telltale-host │ observe │
//! ├─────────────────────────────────────────┤
//! │            telltale-record              │
//! └─────────────────────────────────────────┘
//! ```

pub mod augment;
pub mod config;
pub mod delegate;
pub mod error;
pub mod outcome;
pub mod sink;
pub mod tracker;

// Re-export main types at crate root
pub use augment::{TrackedFutureExt, TrackedStreamExt};
pub use config::{DEFAULT_NAME, TrackerConfig, TrackerSettings};
pub use delegate::{Delegate, DelegateMethod, SharedDelegate};
pub use error::{ConfigError, ConfigResult, DelegateError, DelegateResult};
pub use outcome::{Fault, Outcome, capture, capture_async};
pub use sink::{LogLine, LogSink, MemorySink, Polarity, TracingSink};
pub use tracker::{CallKind, EventArgs, LogEntry, TrackOptions, Tracker, is_delivering};

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```ignore
/// use telltale_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::augment::{TrackedFutureExt, TrackedStreamExt};
    pub use crate::config::{TrackerConfig, TrackerSettings};
    pub use crate::delegate::{Delegate, DelegateMethod, SharedDelegate};
    pub use crate::error::{DelegateError, DelegateResult};
    pub use crate::sink::{LogLine, LogSink, MemorySink, Polarity, TracingSink};
    pub use crate::tracker::{EventArgs, LogEntry, TrackOptions, Tracker};
    pub use telltale_record::prelude::*;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_imports() {
        use crate::prelude::*;

        let _ = Tracker::disabled();
        let _ = TrackOptions::named("x");
        let _ = LogEntry::new("x", "y");
        let _ = Event::create("z");
    }

    #[test]
    fn test_default_tracker_is_disabled() {
        let tracker = Tracker::default();
        assert!(!tracker.is_enabled());
        assert!(tracker.config().delegate.is_none());
    }
}
