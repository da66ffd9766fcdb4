//! # Telltale - Client-Side Telemetry Facade
//!
//! Telltale gives an application one small API for reporting what happened:
//! named events, captured errors, free-form log entries, and units of work
//! whose success or failure is classified and reported automatically. Where
//! the reports end up is decided by a pluggable [`Delegate`].
//!
//! ## Features
//!
//! - **Never throws**: reporting calls always complete; value-producing
//!   wraps return `None` when the work failed
//! - **Pluggable backends**: one four-method [`Delegate`] trait
//! - **Host errors**: UI framework and platform errors are reported and then
//!   handed to the host's previous handlers
//! - **Local logs**: every report also produces a line on a [`LogSink`]
//!
//! ## Quick Start
//!
//! ```ignore
//! use telltale::prelude::*;
//!
//! Telltale::builder()
//!     .with_enabled(true)
//!     .with_delegate(Arc::new(LoggingDelegate::new()))
//!     .init()?;
//!
//! telltale::event("signup", EventArgs::new().with_msg("ok")).await;
//!
//! let user = telltale::future(TrackOptions::named("load_user"), load_user(id)).await;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Your Application                     │
//! ├─────────────────────────────────────────────────────────┤
//! │                   telltale (facade)                     │
//! │             ┌────────────────────────────┐              │
//! │             │ Telltale Builder / global  │              │
//! │             └─────────────┬──────────────┘              │
//! │                           │                             │
//! │  ┌──────────────┬─────────┴──────┬──────────────────┐   │
//! │  │ telltale-core│ telltale-host  │ telltale-observe │   │
//! │  │ (tracker,    │ (error bridge, │ (delegates,      │   │
//! │  │  delegate)   │  panic hook)   │  stats)          │   │
//! │  └──────────────┴────────────────┴──────────────────┘   │
//! ├─────────────────────────────────────────────────────────┤
//! │                    telltale-record                      │
//! └─────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use telltale_core::{ConfigError, LogSink, SharedDelegate, TrackerConfig, TrackerSettings};
use telltale_host::{HostError, PlatformErrorHandler, UiErrorHandler};
use telltale_record::{HostFault, UiErrorDetails};

mod global;

pub use global::{
    bridge, call, call_async, error, event, execute, future, init_with, log, platform_error_handler,
    report_platform_error, report_ui_error, stream, tracker, ui_error_handler, warn,
};

// Re-export from sub-crates
pub use telltale_core;
pub use telltale_host;
pub use telltale_observe;
pub use telltale_record;

pub use telltale_core::{
    Delegate, DelegateError, DelegateResult, EventArgs, LogEntry, TrackOptions, Tracker,
};

/// Main entry point for Telltale.
pub struct Telltale;

impl Telltale {
    /// Create a new builder.
    pub fn builder() -> TelltaleBuilder {
        TelltaleBuilder::new()
    }

    /// Initialize the process-wide tracker with default configuration.
    pub fn init_default() -> Result<Tracker, TelltaleError> {
        TelltaleBuilder::new().init()
    }
}

/// Builder for configuring a tracker and the host error handlers.
pub struct TelltaleBuilder {
    config: TrackerConfig,
    on_ui_error: Option<UiErrorHandler>,
    on_platform_error: Option<PlatformErrorHandler>,
    panic_hook: bool,
}

impl TelltaleBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: TrackerConfig::default(),
            on_ui_error: None,
            on_platform_error: None,
            panic_hook: false,
        }
    }

    // Tracker configuration

    /// Enable or disable forwarding to the delegate.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.config = self.config.with_enabled(enabled);
        self
    }

    /// Set the display name used in local log lines.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.config = self.config.with_name(name);
        self
    }

    /// Enable or disable local log lines.
    pub fn with_logs(mut self, enabled: bool) -> Self {
        self.config = self.config.with_logs(enabled);
        self
    }

    /// Enable or disable local success lines.
    pub fn with_success_logs(mut self, enabled: bool) -> Self {
        self.config = self.config.with_success_logs(enabled);
        self
    }

    /// Include the time in local log lines.
    pub fn with_log_time(mut self, enabled: bool) -> Self {
        self.config = self.config.with_log_time(enabled);
        self
    }

    /// Enable or disable lines about delegate failures.
    pub fn with_internal_logs(mut self, enabled: bool) -> Self {
        self.config = self.config.with_internal_logs(enabled);
        self
    }

    /// Set the numeric log levels of failure and success lines.
    pub fn with_log_levels(mut self, error: Option<i32>, success: Option<i32>) -> Self {
        self.config = self.config.with_log_levels(error, success);
        self
    }

    /// Set the sequence numbers of failure and success lines.
    pub fn with_sequence_numbers(mut self, error: Option<i64>, success: Option<i64>) -> Self {
        self.config = self.config.with_sequence_numbers(error, success);
        self
    }

    /// Override the platform tag stamped on records.
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.config = self.config.with_platform(platform);
        self
    }

    /// Set the delegate.
    pub fn with_delegate(mut self, delegate: SharedDelegate) -> Self {
        self.config = self.config.with_delegate(delegate);
        self
    }

    /// Set where local log lines go.
    pub fn with_log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.config = self.config.with_log_sink(sink);
        self
    }

    /// Bound every delegate call.
    pub fn with_delegate_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_delegate_timeout(timeout);
        self
    }

    /// Choose how delegate failures during error reporting are marked.
    pub fn with_escalated_error_report_failures(mut self, escalate: bool) -> Self {
        self.config = self.config.with_escalated_error_report_failures(escalate);
        self
    }

    /// Apply loaded settings on top of the current configuration.
    pub fn with_settings(mut self, settings: &TrackerSettings) -> Self {
        self.config = self.config.with_settings(settings);
        self
    }

    /// Replace the whole configuration.
    pub fn with_config(mut self, config: TrackerConfig) -> Self {
        self.config = config;
        self
    }

    // Host errors

    /// Handler to run after a UI framework error has been reported.
    pub fn on_ui_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&UiErrorDetails) + Send + Sync + 'static,
    {
        self.on_ui_error = Some(Arc::new(handler));
        self
    }

    /// Handler to run after a platform error has been reported. Its return
    /// value decides whether the error counts as handled.
    pub fn on_platform_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&HostFault, Option<&str>) -> bool + Send + Sync + 'static,
    {
        self.on_platform_error = Some(Arc::new(handler));
        self
    }

    /// Route process panics through the platform error handler.
    ///
    /// The hook stays installed across later initializations; after
    /// `telltale_host::reset_panic_hook` the next `init` with this set
    /// installs it again.
    pub fn with_panic_hook(mut self, enabled: bool) -> Self {
        self.panic_hook = enabled;
        self
    }

    /// Build a standalone tracker. Nothing process-wide is touched.
    pub fn build(self) -> Result<Tracker, TelltaleError> {
        Ok(Tracker::try_new(self.config)?)
    }

    /// Build a tracker, make it the process-wide one, and register the host
    /// error handlers, replacing any earlier initialization.
    pub fn init(self) -> Result<Tracker, TelltaleError> {
        let tracker = Tracker::try_new(self.config)?;
        global::install(
            tracker.clone(),
            self.on_ui_error,
            self.on_platform_error,
            self.panic_hook,
        );
        Ok(tracker)
    }
}

impl Default for TelltaleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TelltaleBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelltaleBuilder")
            .field("config", &self.config)
            .field("on_ui_error", &self.on_ui_error.is_some())
            .field("on_platform_error", &self.on_platform_error.is_some())
            .field("panic_hook", &self.panic_hook)
            .finish()
    }
}

/// Errors from setting Telltale up.
#[derive(Debug, thiserror::Error)]
pub enum TelltaleError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Host bridge error.
    #[error("Host bridge error: {0}")]
    Host(#[from] HostError),
}

/// Prelude module for convenient imports.
pub mod prelude {
    // Main types
    pub use crate::{Telltale, TelltaleBuilder, TelltaleError};

    // Core types
    pub use telltale_core::{
        Delegate, DelegateError, DelegateMethod, DelegateResult, EventArgs, LogEntry, LogLine,
        LogSink, MemorySink, Polarity, SharedDelegate, TrackOptions, TrackedFutureExt,
        TrackedStreamExt, Tracker, TrackerConfig, TrackerSettings, TracingSink,
    };

    // Record types
    pub use telltale_record::prelude::*;

    // Host types
    pub use telltale_host::{HostErrorBridge, PlatformErrorHandler, UiErrorHandler};

    // Delegates
    pub use telltale_observe::{
        CollectingDelegate, Delivery, FanoutDelegate, LoggingDelegate, NullDelegate, Record,
        StatsDelegate,
    };

    // Common std types
    pub use std::sync::Arc;
    pub use std::time::Duration;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_applies_config() {
        let tracker = Telltale::builder()
            .with_enabled(true)
            .with_name("shop")
            .with_success_logs(true)
            .with_log_levels(Some(1000), None)
            .build()
            .unwrap();

        assert!(tracker.is_enabled());
        assert_eq!(tracker.config().name, "shop");
        assert!(tracker.config().show_success_logs);
        assert_eq!(tracker.config().error_log_level, Some(1000));
    }

    #[test]
    fn test_builder_rejects_empty_name() {
        let result = Telltale::builder().with_name("").build();
        assert!(matches!(result, Err(TelltaleError::Config(ConfigError::EmptyName))));
    }

    #[test]
    fn test_builder_settings() {
        let settings = TrackerSettings {
            show_log_time: Some(true),
            ..TrackerSettings::default()
        };
        let tracker = Telltale::builder().with_settings(&settings).build().unwrap();
        assert!(tracker.config().show_log_time);
    }
}
