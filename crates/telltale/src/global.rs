//! The process-wide tracker and the free-function API.
//!
//! The current tracker sits behind one lock and is replaced as a whole on
//! initialization. Every free function clones the tracker it finds at entry,
//! so calls already in flight finish with the configuration they started
//! with. Before any initialization, a disabled tracker with no delegate is
//! installed on first use.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, LazyLock};

use futures::stream::{BoxStream, Stream};
use parking_lot::RwLock;
use tracing::debug;

use telltale_core::{EventArgs, LogEntry, TrackOptions, Tracker};
use telltale_host::{HostErrorBridge, HostResult, PlatformErrorHandler, UiErrorHandler};
use telltale_record::{ErrorReport, HostFault, UiErrorDetails};

static TRACKER: RwLock<Option<Tracker>> = RwLock::new(None);

static BRIDGE: LazyLock<Arc<HostErrorBridge>> = LazyLock::new(|| Arc::new(HostErrorBridge::new()));

pub(crate) fn install(
    tracker: Tracker,
    on_ui_error: Option<UiErrorHandler>,
    on_platform_error: Option<PlatformErrorHandler>,
    panic_hook: bool,
) {
    debug!(config = ?tracker.config(), "Installing process-wide tracker");
    *TRACKER.write() = Some(tracker.clone());
    BRIDGE.register(tracker, on_ui_error, on_platform_error);

    if panic_hook {
        telltale_host::install_panic_hook(Arc::clone(&BRIDGE));
    }
}

/// Make `tracker` the process-wide tracker without touching the host error
/// handlers.
pub fn init_with(tracker: Tracker) {
    *TRACKER.write() = Some(tracker);
}

/// The process-wide tracker.
pub fn tracker() -> Tracker {
    if let Some(tracker) = TRACKER.read().as_ref() {
        return tracker.clone();
    }
    TRACKER.write().get_or_insert_with(Tracker::disabled).clone()
}

/// The process-wide host error bridge.
pub fn bridge() -> Arc<HostErrorBridge> {
    Arc::clone(&BRIDGE)
}

/// A UI error handler to install in the host's UI framework.
pub fn ui_error_handler() -> HostResult<UiErrorHandler> {
    BRIDGE.ui_handler()
}

/// A platform error handler to install in the host environment.
pub fn platform_error_handler() -> HostResult<PlatformErrorHandler> {
    BRIDGE.platform_handler()
}

/// Report a UI framework error and run the previous UI handler.
pub fn report_ui_error(details: &UiErrorDetails) {
    BRIDGE.report_ui_error(details);
}

/// Report a platform error; returns whether it counts as handled.
pub fn report_platform_error(fault: &HostFault, stack: Option<&str>) -> bool {
    BRIDGE.report_platform_error(fault, stack)
}

/// Record an event with an explicit status.
pub async fn event(name: impl Into<String>, args: EventArgs) {
    tracker().event(name, args).await;
}

/// Run a synchronous unit of work and report how it went.
pub async fn call<E, F>(options: TrackOptions, work: F)
where
    F: FnOnce() -> Result<(), E>,
    E: fmt::Display,
{
    tracker().call(options, work).await;
}

/// Await an asynchronous unit of work and report how it went.
pub async fn call_async<E, F>(options: TrackOptions, work: F)
where
    F: Future<Output = Result<(), E>>,
    E: fmt::Display,
{
    tracker().call_async(options, work).await;
}

/// Run synchronous value-producing work; `None` if it failed.
pub async fn execute<T, E, F>(options: TrackOptions, work: F) -> Option<T>
where
    F: FnOnce() -> Result<T, E>,
    E: fmt::Display,
{
    tracker().execute(options, work).await
}

/// Await asynchronous value-producing work; `None` if it failed.
pub async fn future<T, E, F>(options: TrackOptions, work: F) -> Option<T>
where
    F: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    tracker().future(options, work).await
}

/// Wrap a sequence producer.
pub fn stream<'a, T, E, S>(options: TrackOptions, source: S) -> BoxStream<'a, T>
where
    S: Stream<Item = Result<T, E>> + Send + 'a,
    T: Send + 'a,
    E: fmt::Display + Send + 'a,
{
    tracker().stream(options, source)
}

/// Emit a free-form log entry.
pub async fn log(entry: LogEntry) {
    tracker().log(entry).await;
}

/// Emit a free-form warning entry.
pub async fn warn(entry: LogEntry) {
    tracker().warn(entry).await;
}

/// Report a captured error.
pub async fn error(report: ErrorReport) {
    tracker().error(report).await;
}
