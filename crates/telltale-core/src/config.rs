//! Tracker configuration.
//!
//! A [`TrackerConfig`] is built once, moved into a [`Tracker`](crate::Tracker)
//! and never mutated afterwards. Replacing the configuration means building
//! a new tracker.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::delegate::SharedDelegate;
use crate::error::{ConfigError, ConfigResult};
use crate::sink::{LogSink, TracingSink};

/// Display name used when none is configured.
pub const DEFAULT_NAME: &str = "telltale";

/// Configuration for a tracker.
#[derive(Clone)]
pub struct TrackerConfig {
    /// Forward reports to the delegate.
    ///
    /// Defaults to on in release builds and off in debug builds.
    pub enabled: bool,

    /// Display name attached to every local log line.
    pub name: String,

    /// Emit local log lines at all.
    pub show_logs: bool,

    /// Also emit local log lines for successful reports.
    pub show_success_logs: bool,

    /// Attach the current time to local log lines.
    pub show_log_time: bool,

    /// Emit local log lines when the delegate itself fails.
    pub show_internal_logs: bool,

    /// Numeric level tag for failure lines.
    pub error_log_level: Option<i32>,

    /// Numeric level tag for success lines.
    pub success_log_level: Option<i32>,

    /// Sequence tag for failure lines.
    pub error_sequence_number: Option<i64>,

    /// Sequence tag for success lines.
    pub success_sequence_number: Option<i64>,

    /// Opaque host platform tag stamped on records.
    ///
    /// Falls back to the operating system name.
    pub platform: Option<String>,

    /// The reporting backend, if any.
    pub delegate: Option<SharedDelegate>,

    /// Destination of local log lines.
    pub log_sink: Arc<dyn LogSink>,

    /// Upper bound for a single delegate call.
    ///
    /// Only enforced when the `tokio` feature is enabled.
    pub delegate_timeout: Option<Duration>,

    /// Log delegate failures while reporting an error with the escalated
    /// internal-failure marker. When off, they are logged like an ordinary
    /// failure.
    pub escalate_error_report_failures: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            enabled: !cfg!(debug_assertions),
            name: DEFAULT_NAME.to_string(),
            show_logs: true,
            show_success_logs: false,
            show_log_time: false,
            show_internal_logs: true,
            error_log_level: None,
            success_log_level: None,
            error_sequence_number: None,
            success_sequence_number: None,
            platform: None,
            delegate: None,
            log_sink: Arc::new(TracingSink),
            delegate_timeout: None,
            escalate_error_report_failures: true,
        }
    }
}

impl TrackerConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// The configuration used when nothing was initialized: reporting
    /// disabled, no delegate.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Enable or disable forwarding to the delegate.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Enable or disable local log lines.
    pub fn with_logs(mut self, enabled: bool) -> Self {
        self.show_logs = enabled;
        self
    }

    /// Enable or disable local log lines for successes.
    pub fn with_success_logs(mut self, enabled: bool) -> Self {
        self.show_success_logs = enabled;
        self
    }

    /// Enable or disable timestamps on local log lines.
    pub fn with_log_time(mut self, enabled: bool) -> Self {
        self.show_log_time = enabled;
        self
    }

    /// Enable or disable local log lines for delegate failures.
    pub fn with_internal_logs(mut self, enabled: bool) -> Self {
        self.show_internal_logs = enabled;
        self
    }

    /// Set the numeric level tags for failure and success lines.
    pub fn with_log_levels(mut self, error: Option<i32>, success: Option<i32>) -> Self {
        self.error_log_level = error;
        self.success_log_level = success;
        self
    }

    /// Set the sequence tags for failure and success lines.
    pub fn with_sequence_numbers(mut self, error: Option<i64>, success: Option<i64>) -> Self {
        self.error_sequence_number = error;
        self.success_sequence_number = success;
        self
    }

    /// Set the platform tag.
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// Set the delegate.
    pub fn with_delegate(mut self, delegate: SharedDelegate) -> Self {
        self.delegate = Some(delegate);
        self
    }

    /// Remove the delegate.
    pub fn without_delegate(mut self) -> Self {
        self.delegate = None;
        self
    }

    /// Set the log sink.
    pub fn with_log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.log_sink = sink;
        self
    }

    /// Bound each delegate call.
    pub fn with_delegate_timeout(mut self, timeout: Duration) -> Self {
        self.delegate_timeout = Some(timeout);
        self
    }

    /// Choose how delegate failures during error reporting are marked.
    pub fn with_escalated_error_report_failures(mut self, escalate: bool) -> Self {
        self.escalate_error_report_failures = escalate;
        self
    }

    /// Apply deserialized settings on top of this configuration.
    pub fn with_settings(mut self, settings: &TrackerSettings) -> Self {
        if let Some(enabled) = settings.enabled {
            self.enabled = enabled;
        }
        if let Some(name) = &settings.name {
            self.name = name.clone();
        }
        if let Some(show) = settings.show_logs {
            self.show_logs = show;
        }
        if let Some(show) = settings.show_success_logs {
            self.show_success_logs = show;
        }
        if let Some(show) = settings.show_log_time {
            self.show_log_time = show;
        }
        if let Some(show) = settings.show_internal_logs {
            self.show_internal_logs = show;
        }
        if settings.error_log_level.is_some() {
            self.error_log_level = settings.error_log_level;
        }
        if settings.success_log_level.is_some() {
            self.success_log_level = settings.success_log_level;
        }
        if settings.error_sequence_number.is_some() {
            self.error_sequence_number = settings.error_sequence_number;
        }
        if settings.success_sequence_number.is_some() {
            self.success_sequence_number = settings.success_sequence_number;
        }
        if let Some(platform) = &settings.platform {
            self.platform = Some(platform.clone());
        }
        if let Some(ms) = settings.delegate_timeout_ms {
            self.delegate_timeout = Some(Duration::from_millis(ms));
        }
        if let Some(escalate) = settings.escalate_error_report_failures {
            self.escalate_error_report_failures = escalate;
        }
        self
    }

    /// Build a configuration from settings, validating the result.
    pub fn from_settings(settings: &TrackerSettings) -> ConfigResult<Self> {
        let config = Self::default().with_settings(settings);
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values that can never work.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.delegate_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    /// Platform tag for new records.
    pub fn platform_tag(&self) -> String {
        self.platform
            .clone()
            .unwrap_or_else(telltale_record::host_platform)
    }
}

impl fmt::Debug for TrackerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackerConfig")
            .field("enabled", &self.enabled)
            .field("name", &self.name)
            .field("show_logs", &self.show_logs)
            .field("show_success_logs", &self.show_success_logs)
            .field("show_log_time", &self.show_log_time)
            .field("show_internal_logs", &self.show_internal_logs)
            .field("error_log_level", &self.error_log_level)
            .field("success_log_level", &self.success_log_level)
            .field("error_sequence_number", &self.error_sequence_number)
            .field("success_sequence_number", &self.success_sequence_number)
            .field("platform", &self.platform)
            .field("delegate", &self.delegate.as_ref().map(|d| d.name().to_string()))
            .field("delegate_timeout", &self.delegate_timeout)
            .field(
                "escalate_error_report_failures",
                &self.escalate_error_report_failures,
            )
            .finish()
    }
}

/// The serializable subset of [`TrackerConfig`].
///
/// Every field is optional; unset fields keep the defaults. Camel-case
/// spellings are accepted as aliases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSettings {
    pub enabled: Option<bool>,
    pub name: Option<String>,
    #[serde(alias = "showLogs")]
    pub show_logs: Option<bool>,
    #[serde(alias = "showSuccessLogs")]
    pub show_success_logs: Option<bool>,
    #[serde(alias = "showLogTime")]
    pub show_log_time: Option<bool>,
    #[serde(alias = "showInternalLogs")]
    pub show_internal_logs: Option<bool>,
    #[serde(alias = "errorLogLevel")]
    pub error_log_level: Option<i32>,
    #[serde(alias = "successLogLevel")]
    pub success_log_level: Option<i32>,
    #[serde(alias = "errorSequenceNumber")]
    pub error_sequence_number: Option<i64>,
    #[serde(alias = "successSequenceNumber")]
    pub success_sequence_number: Option<i64>,
    pub platform: Option<String>,
    #[serde(alias = "delegateTimeoutMs")]
    pub delegate_timeout_ms: Option<u64>,
    #[serde(alias = "escalateErrorReportFailures")]
    pub escalate_error_report_failures: Option<bool>,
}
