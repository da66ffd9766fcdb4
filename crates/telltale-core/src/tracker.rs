//! The dispatch core.
//!
//! Every public operation follows the same protocol: attempt the work (or
//! take the caller's status), classify the outcome, forward the record to the
//! delegate's success- or failure-shaped method, then emit a local log line.
//! Nothing raised by the work or by the delegate crosses back to the caller.

use std::cell::Cell;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::pin;
use std::sync::Arc;

use futures::future::{self, BoxFuture};
use futures::stream::{self, BoxStream, Stream, StreamExt};
use futures::FutureExt;
use tracing::debug;

use telltale_record::glyph::{self, Glyphs};
use telltale_record::{ErrorReport, Event, Props, panic_message};

use crate::config::TrackerConfig;
use crate::delegate::{DelegateMethod, SharedDelegate};
use crate::error::{ConfigResult, DelegateError, DelegateResult};
use crate::outcome::{Fault, Outcome, capture, capture_async};
use crate::sink::{LogLine, Polarity};

thread_local! {
    static DELIVERING: Cell<bool> = const { Cell::new(false) };
}

/// Whether the current thread is forwarding a record to a delegate right now.
///
/// Set only while the forwarding step is being polled. A panic hook
/// checks it to leave panics raised by a delegate out of the reports, which
/// would otherwise go back through the same delegate.
pub fn is_delivering() -> bool {
    DELIVERING.with(Cell::get)
}

struct DeliveringGuard(bool);

impl DeliveringGuard {
    fn enter() -> Self {
        Self(DELIVERING.with(|flag| flag.replace(true)))
    }
}

impl Drop for DeliveringGuard {
    fn drop(&mut self) {
        DELIVERING.with(|flag| flag.set(self.0));
    }
}

/// The kinds of reporting operations, each with its own glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// Explicit-status event.
    Event,
    /// Synchronous unit of work.
    Call,
    /// Asynchronous unit of work.
    CallAsync,
    /// Synchronous value-producing work.
    Execute,
    /// Asynchronous value-producing work.
    Future,
    /// Sequence producer.
    Stream,
    /// Free-form log entry.
    Log,
    /// Free-form warning entry.
    Warn,
}

impl CallKind {
    /// Record name used when the caller gives none.
    pub fn default_name(&self) -> &'static str {
        match self {
            CallKind::Event => "event",
            CallKind::Call => "call",
            CallKind::CallAsync => "call_async",
            CallKind::Execute => "execute",
            CallKind::Future => "future",
            CallKind::Stream => "stream",
            CallKind::Log => "log",
            CallKind::Warn => "warn",
        }
    }

    /// Glyph pair for this kind.
    pub fn glyphs(&self) -> Glyphs {
        match self {
            CallKind::Event => glyph::EVENT,
            CallKind::Call | CallKind::CallAsync => glyph::CALL,
            CallKind::Execute | CallKind::Future => glyph::EXECUTE,
            CallKind::Stream => glyph::STREAM,
            CallKind::Log => glyph::LOG,
            CallKind::Warn => glyph::WARN,
        }
    }

    /// Delegate method a record of this kind is forwarded to.
    pub fn method(&self, status: bool) -> DelegateMethod {
        match (self, status) {
            (CallKind::Log | CallKind::Warn, _) => DelegateMethod::Log,
            (_, true) => DelegateMethod::Event,
            (_, false) => DelegateMethod::EventFailure,
        }
    }
}

/// Naming and context for wrapped work.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackOptions {
    /// Record name; each operation has its own default.
    pub name: Option<String>,
    pub reason: Option<String>,
    /// Message for the record. On failure the fault is appended.
    pub msg: Option<String>,
    pub props: Option<Props>,
}

impl TrackOptions {
    /// Options with every field unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options with a record name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Set the reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Set the message.
    pub fn with_msg(mut self, msg: impl Into<String>) -> Self {
        self.msg = Some(msg.into());
        self
    }

    /// Set the payload.
    pub fn with_props(mut self, props: Props) -> Self {
        self.props = Some(props);
        self
    }
}

/// Arguments of an explicit-status event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventArgs {
    pub reason: Option<String>,
    /// Overrides the status-dependent default glyph.
    pub sign: Option<String>,
    pub msg: Option<String>,
    pub props: Option<Props>,
    /// Outcome to report. Defaults to success.
    pub status: bool,
}

impl Default for EventArgs {
    fn default() -> Self {
        Self {
            reason: None,
            sign: None,
            msg: None,
            props: None,
            status: true,
        }
    }
}

impl EventArgs {
    /// Successful event with no details.
    pub fn new() -> Self {
        Self::default()
    }

    /// Failed event with no details.
    pub fn failed() -> Self {
        Self {
            status: false,
            ..Self::default()
        }
    }

    /// Set the reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Set the sign.
    pub fn with_sign(mut self, sign: impl Into<String>) -> Self {
        self.sign = Some(sign.into());
        self
    }

    /// Set the message.
    pub fn with_msg(mut self, msg: impl Into<String>) -> Self {
        self.msg = Some(msg.into());
        self
    }

    /// Set the payload.
    pub fn with_props(mut self, props: Props) -> Self {
        self.props = Some(props);
        self
    }

    /// Set the status.
    pub fn with_status(mut self, status: bool) -> Self {
        self.status = status;
        self
    }
}

/// A free-form log or warning entry. The reason is required.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub name: String,
    pub reason: String,
    pub msg: Option<String>,
    pub props: Option<Props>,
    /// Defaults to success.
    pub status: bool,
}

impl LogEntry {
    /// Create a successful entry.
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
            msg: None,
            props: None,
            status: true,
        }
    }

    /// Mark the entry as a failure.
    pub fn failed(mut self) -> Self {
        self.status = false;
        self
    }

    /// Set the status.
    pub fn with_status(mut self, status: bool) -> Self {
        self.status = status;
        self
    }

    /// Set the message.
    pub fn with_msg(mut self, msg: impl Into<String>) -> Self {
        self.msg = Some(msg.into());
        self
    }

    /// Set the payload.
    pub fn with_props(mut self, props: Props) -> Self {
        self.props = Some(props);
        self
    }
}

/// A record on its way to the delegate.
#[derive(Clone, Copy)]
enum Delivery<'a> {
    Event(&'a Event),
    Error(&'a ErrorReport),
}

/// The dispatch core.
///
/// Cheap to clone; clones share one immutable configuration. A tracker never
/// fails from the caller's perspective: every reporting operation completes,
/// and value-producing operations return `None` when the work failed.
///
/// # Example
///
/// ```ignore
/// use telltale_core::{Tracker, TrackerConfig, TrackOptions};
///
/// let tracker = Tracker::new(TrackerConfig::new().with_enabled(true).with_delegate(backend));
///
/// let total = tracker
///     .execute(TrackOptions::named("sum"), || "2".parse::<i32>())
///     .await;
/// assert_eq!(total, Some(2));
/// ```
#[derive(Clone)]
pub struct Tracker {
    config: Arc<TrackerConfig>,
}

impl Tracker {
    /// Create a tracker.
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Create a tracker after validating the configuration.
    pub fn try_new(config: TrackerConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// A tracker with reporting disabled and no delegate.
    pub fn disabled() -> Self {
        Self::new(TrackerConfig::disabled())
    }

    /// The configuration.
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Check whether records are forwarded.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn active_delegate(&self) -> Option<&SharedDelegate> {
        if self.config.enabled {
            self.config.delegate.as_ref()
        } else {
            None
        }
    }

    /// Record an event with an explicit status.
    pub async fn event(&self, name: impl Into<String>, args: EventArgs) {
        let glyphs = CallKind::Event.glyphs();
        let mut event = self.stamp(Event::create(name));
        event.reason = args.reason;
        event.msg = args.msg;
        event.props = args.props;
        event.sign = Some(
            args.sign
                .unwrap_or_else(|| glyphs.for_status(args.status).to_string()),
        );
        self.report(CallKind::Event, event, args.status).await;
    }

    /// Run a synchronous unit of work and report how it went.
    pub async fn call<E, F>(&self, options: TrackOptions, work: F)
    where
        F: FnOnce() -> Result<(), E>,
        E: fmt::Display,
    {
        let outcome = capture(work);
        self.classify(CallKind::Call, options, outcome).await;
    }

    /// Await an asynchronous unit of work and report how it went.
    pub async fn call_async<E, F>(&self, options: TrackOptions, work: F)
    where
        F: Future<Output = Result<(), E>>,
        E: fmt::Display,
    {
        let outcome = capture_async(work).await;
        self.classify(CallKind::CallAsync, options, outcome).await;
    }

    /// Run synchronous value-producing work, report it, and return its value
    /// or `None` if it failed.
    pub async fn execute<T, E, F>(&self, options: TrackOptions, work: F) -> Option<T>
    where
        F: FnOnce() -> Result<T, E>,
        E: fmt::Display,
    {
        let outcome = capture(work);
        self.classify(CallKind::Execute, options, outcome).await
    }

    /// Await asynchronous value-producing work, report it, and return its
    /// value or `None` if it failed.
    pub async fn future<T, E, F>(&self, options: TrackOptions, work: F) -> Option<T>
    where
        F: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let outcome = capture_async(work).await;
        self.classify(CallKind::Future, options, outcome).await
    }

    /// Wrap a sequence producer.
    ///
    /// Items pass through unchanged. The first error (or panic) ends the
    /// sequence and is reported as a failure; reaching the end is reported as
    /// a success. Either way exactly one record is forwarded.
    pub fn stream<'a, T, E, S>(&self, options: TrackOptions, source: S) -> BoxStream<'a, T>
    where
        S: Stream<Item = Result<T, E>> + Send + 'a,
        T: Send + 'a,
        E: fmt::Display + Send + 'a,
    {
        let state = (Box::pin(source), self.clone(), options, 0usize);
        stream::unfold(state, |(mut source, tracker, options, emitted)| async move {
            match AssertUnwindSafe(source.next()).catch_unwind().await {
                Ok(Some(Ok(item))) => Some((item, (source, tracker, options, emitted + 1))),
                Ok(Some(Err(e))) => {
                    let outcome = Outcome::<()>::Failure(Fault::from_error(&e));
                    tracker.finish_stream(options, outcome, emitted).await;
                    None
                }
                Ok(None) => {
                    tracker
                        .finish_stream(options, Outcome::Success(()), emitted)
                        .await;
                    None
                }
                Err(payload) => {
                    let outcome = Outcome::<()>::Failure(Fault::from_panic(payload.as_ref()));
                    tracker.finish_stream(options, outcome, emitted).await;
                    None
                }
            }
        })
        .boxed()
    }

    async fn finish_stream(&self, options: TrackOptions, outcome: Outcome<()>, emitted: usize) {
        debug!(operation = "stream", emitted, "Sequence finished");
        self.classify(CallKind::Stream, options, outcome).await;
    }

    /// Emit a free-form log entry.
    pub async fn log(&self, entry: LogEntry) {
        self.entry(CallKind::Log, entry).await;
    }

    /// Emit a free-form warning entry.
    pub async fn warn(&self, entry: LogEntry) {
        self.entry(CallKind::Warn, entry).await;
    }

    async fn entry(&self, kind: CallKind, entry: LogEntry) {
        let mut event = self.stamp(Event::create(entry.name));
        event.reason = Some(entry.reason);
        event.msg = entry.msg;
        event.props = entry.props;
        event.sign = Some(kind.glyphs().for_status(entry.status).to_string());
        self.report(kind, event, entry.status).await;
    }

    /// Report a captured error.
    pub async fn error(&self, report: ErrorReport) {
        if report.is_empty() {
            debug!("Skipping empty error report");
            return;
        }

        let mut report = report;
        if let Some(platform) = &self.config.platform {
            report.platform = Some(platform.clone());
        }
        let operation = report
            .kind
            .map(|k| k.as_str().to_string())
            .unwrap_or_else(|| "error".to_string());

        if let Some(delegate) = self.active_delegate() {
            self.forward(delegate, DelegateMethod::Error, &operation, Delivery::Error(&report))
                .await;
        }

        let line = LogLine {
            glyph: report.sign.clone(),
            message: report.msg.clone(),
            ..LogLine::new(Polarity::Failure, operation)
        };
        self.emit(line);
    }

    async fn classify<T>(
        &self,
        kind: CallKind,
        options: TrackOptions,
        outcome: Outcome<T>,
    ) -> Option<T> {
        let (value, fault) = outcome.into_parts();
        let status = fault.is_none();
        let name = options
            .name
            .unwrap_or_else(|| kind.default_name().to_string());

        let mut event = self.stamp(Event::create(name));
        event.reason = options.reason;
        event.props = options.props;
        event.sign = Some(kind.glyphs().for_status(status).to_string());
        event.msg = match (options.msg, fault) {
            (msg, None) => msg,
            (Some(msg), Some(fault)) => Some(format!("{msg}: {fault}")),
            (None, Some(fault)) => Some(fault.to_string()),
        };

        self.report(kind, event, status).await;
        value
    }

    fn stamp(&self, event: Event) -> Event {
        event.with_platform(self.config.platform_tag())
    }

    async fn report(&self, kind: CallKind, event: Event, status: bool) {
        if event.is_empty() {
            debug!(kind = ?kind, "Skipping empty event");
            return;
        }

        if let Some(delegate) = self.active_delegate() {
            let method = kind.method(status);
            self.forward(delegate, method, &event.name, Delivery::Event(&event))
                .await;
        }

        let polarity = if status {
            Polarity::Success
        } else {
            Polarity::Failure
        };
        let line = LogLine {
            glyph: event.sign.clone(),
            reason: event.reason.clone(),
            status: Some(if status { "ok" } else { "failed" }.to_string()),
            message: event.msg.clone(),
            ..LogLine::new(polarity, event.name.clone())
        };
        self.emit(line);
    }

    /// Hand a record to the delegate. Returns whether it was accepted.
    async fn forward(
        &self,
        delegate: &SharedDelegate,
        method: DelegateMethod,
        operation: &str,
        delivery: Delivery<'_>,
    ) -> bool {
        debug!(
            delegate = delegate.name(),
            method = method.as_str(),
            operation,
            "Forwarding record"
        );

        let attempt = async {
            let call: BoxFuture<'_, DelegateResult<()>> = match (method, delivery) {
                (DelegateMethod::Event, Delivery::Event(event)) => delegate.event(event),
                (DelegateMethod::EventFailure, Delivery::Event(event)) => {
                    delegate.event_failure(event)
                }
                (DelegateMethod::Log, Delivery::Event(event)) => delegate.log(event),
                (_, Delivery::Error(report)) => delegate.error(report),
                (DelegateMethod::Error, Delivery::Event(event)) => delegate.event_failure(event),
            };
            self.bounded(call).await
        };
        let mut pinned = pin!(attempt);
        let attempt = future::poll_fn(|cx| {
            let _delivering = DeliveringGuard::enter();
            pinned.as_mut().poll(cx)
        });

        let result = match AssertUnwindSafe(attempt).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(DelegateError::Panicked(
                panic_message(payload.as_ref()).unwrap_or_else(|| "panic".to_string()),
            )),
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                self.internal_failure(method, operation, &e);
                false
            }
        }
    }

    /// Without a tokio runtime on this thread the limit is not applied.
    #[cfg(feature = "tokio")]
    async fn bounded(&self, call: BoxFuture<'_, DelegateResult<()>>) -> DelegateResult<()> {
        let limit = self
            .config
            .delegate_timeout
            .filter(|_| tokio::runtime::Handle::try_current().is_ok());
        match limit {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or(Err(DelegateError::Timeout(limit))),
            None => call.await,
        }
    }

    #[cfg(not(feature = "tokio"))]
    async fn bounded(&self, call: BoxFuture<'_, DelegateResult<()>>) -> DelegateResult<()> {
        call.await
    }

    fn internal_failure(&self, method: DelegateMethod, operation: &str, error: &DelegateError) {
        let escalate =
            method != DelegateMethod::Error || self.config.escalate_error_report_failures;

        let line = if escalate {
            LogLine {
                glyph: Some(glyph::INTERNAL_FAILURE.to_string()),
                status: Some(format!("{method} failed")),
                message: Some(error.to_string()),
                ..LogLine::new(Polarity::Internal, operation)
            }
        } else {
            LogLine {
                glyph: Some(glyph::EVENT.failure.to_string()),
                status: Some(format!("{method} failed")),
                message: Some(error.to_string()),
                ..LogLine::new(Polarity::Failure, operation)
            }
        };
        self.emit(line);
    }

    fn emit(&self, mut line: LogLine) {
        let config = &self.config;
        let visible = match line.polarity {
            Polarity::Success => config.show_logs && config.show_success_logs,
            Polarity::Failure => config.show_logs,
            Polarity::Internal => config.show_internal_logs,
        };
        if !visible {
            return;
        }

        line.logger = config.name.clone();
        (line.level, line.sequence_number) = match line.polarity {
            Polarity::Success => (config.success_log_level, config.success_sequence_number),
            Polarity::Failure | Polarity::Internal => {
                (config.error_log_level, config.error_sequence_number)
            }
        };
        if config.show_log_time {
            line.time = Some(chrono::Utc::now());
        }

        config.log_sink.write(&line);
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::disabled()
    }
}

impl fmt::Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker").field("config", &self.config).finish()
    }
}
