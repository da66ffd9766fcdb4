//! The registration table for host error handlers.
//!
//! A registration pairs the tracker that receives host errors with whatever
//! handlers the host had installed before. Routing an error always reports it
//! first and then runs the previous handler, so the host keeps its own
//! handling. Registering again replaces the whole entry.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use parking_lot::RwLock;
use tracing::{debug, warn};

use telltale_core::Tracker;
use telltale_record::{ErrorReport, HostFault, UiErrorDetails, panic_message};

use crate::error::{HostError, HostResult};

/// Handler for errors raised by the UI framework.
pub type UiErrorHandler = Arc<dyn Fn(&UiErrorDetails) + Send + Sync>;

/// Handler for uncaught platform errors.
///
/// Returns `true` when the error was handled and should not be treated as
/// fatal by the host environment.
pub type PlatformErrorHandler = Arc<dyn Fn(&HostFault, Option<&str>) -> bool + Send + Sync>;

/// One registration: the receiving tracker and the handlers it chains to.
pub struct Registration {
    tracker: Tracker,
    previous_ui: Option<UiErrorHandler>,
    previous_platform: Option<PlatformErrorHandler>,
}

impl Registration {
    /// Create a registration.
    pub fn new(
        tracker: Tracker,
        previous_ui: Option<UiErrorHandler>,
        previous_platform: Option<PlatformErrorHandler>,
    ) -> Self {
        Self {
            tracker,
            previous_ui,
            previous_platform,
        }
    }

    /// The receiving tracker.
    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// Report a UI framework error, then run the previous UI handler.
    pub fn handle_ui_error(&self, details: &UiErrorDetails) {
        dispatch(
            &self.tracker,
            ErrorReport::from_host_ui_error(details),
            Dispatch::Inline,
        );

        if let Some(previous) = &self.previous_ui {
            if let Err(e) = chain("ui", || previous(details)) {
                warn!(error = %e, "Previous UI error handler failed");
            }
        }
    }

    /// Report a platform error, then return the previous handler's decision,
    /// or `false` if there is none.
    pub fn handle_platform_error(&self, fault: &HostFault, stack: Option<&str>) -> bool {
        self.route_platform_error(fault, stack, Dispatch::Inline)
    }

    pub(crate) fn route_platform_error(
        &self,
        fault: &HostFault,
        stack: Option<&str>,
        mode: Dispatch,
    ) -> bool {
        dispatch(
            &self.tracker,
            ErrorReport::from_host_platform_error(fault, stack),
            mode,
        );

        match &self.previous_platform {
            Some(previous) => chain("platform", || previous(fault, stack)).unwrap_or_else(|e| {
                warn!(error = %e, "Previous platform error handler failed");
                false
            }),
            None => false,
        }
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("tracker", &self.tracker)
            .field("previous_ui", &self.previous_ui.is_some())
            .field("previous_platform", &self.previous_platform.is_some())
            .finish()
    }
}

/// Routes host errors to the currently registered tracker.
///
/// # Example
///
/// ```ignore
/// use telltale_host::HostErrorBridge;
///
/// let bridge = HostErrorBridge::new();
/// bridge.register(tracker, None, Some(previous_platform_handler));
///
/// let on_platform_error = bridge.platform_handler()?;
/// let handled = on_platform_error(&fault, Some(stack));
/// ```
#[derive(Debug, Default)]
pub struct HostErrorBridge {
    registration: RwLock<Option<Arc<Registration>>>,
}

impl HostErrorBridge {
    /// Create an empty bridge.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tracker and the handlers to chain to, replacing any
    /// previous registration.
    pub fn register(
        &self,
        tracker: Tracker,
        previous_ui: Option<UiErrorHandler>,
        previous_platform: Option<PlatformErrorHandler>,
    ) {
        let registration = Registration::new(tracker, previous_ui, previous_platform);
        debug!(registration = ?registration, "Registering host error handlers");
        *self.registration.write() = Some(Arc::new(registration));
    }

    /// Check if a tracker is registered.
    pub fn is_registered(&self) -> bool {
        self.registration.read().is_some()
    }

    /// The current registration.
    pub fn registration(&self) -> HostResult<Arc<Registration>> {
        self.registration
            .read()
            .clone()
            .ok_or(HostError::NotRegistered)
    }

    /// A UI error handler bound to the current registration.
    ///
    /// The handler keeps reporting to the tracker it was created with even
    /// if the bridge is registered again later.
    pub fn ui_handler(&self) -> HostResult<UiErrorHandler> {
        let registration = self.registration()?;
        Ok(Arc::new(move |details: &UiErrorDetails| {
            registration.handle_ui_error(details)
        }))
    }

    /// A platform error handler bound to the current registration.
    pub fn platform_handler(&self) -> HostResult<PlatformErrorHandler> {
        let registration = self.registration()?;
        Ok(Arc::new(move |fault: &HostFault, stack: Option<&str>| {
            registration.handle_platform_error(fault, stack)
        }))
    }

    /// Route a UI error through the current registration.
    pub fn report_ui_error(&self, details: &UiErrorDetails) {
        match self.registration() {
            Ok(registration) => registration.handle_ui_error(details),
            Err(e) => debug!(error = %e, "Dropping UI error"),
        }
    }

    /// Route a platform error through the current registration and return
    /// whether it was handled.
    pub fn report_platform_error(&self, fault: &HostFault, stack: Option<&str>) -> bool {
        self.route_platform_error(fault, stack, Dispatch::Inline)
    }

    pub(crate) fn route_platform_error(
        &self,
        fault: &HostFault,
        stack: Option<&str>,
        mode: Dispatch,
    ) -> bool {
        match self.registration() {
            Ok(registration) => registration.route_platform_error(fault, stack, mode),
            Err(e) => {
                debug!(error = %e, "Dropping platform error");
                false
            }
        }
    }
}

/// How a report leaves synchronous code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dispatch {
    /// Drive the report on the calling thread when nothing else is.
    Inline,
    /// Never run the delegate on the calling thread.
    Detached,
}

/// Hand a report to the tracker from synchronous code.
///
/// Inside a tokio runtime the report is spawned onto it. Elsewhere an inline
/// report is driven to completion on the current thread, unless that thread
/// is already running a futures executor; those reports, and every detached
/// one, get a thread of their own.
pub(crate) fn dispatch(tracker: &Tracker, report: ErrorReport, mode: Dispatch) {
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        let tracker = tracker.clone();
        handle.spawn(async move { tracker.error(report).await });
        return;
    }

    match (mode, futures::executor::enter()) {
        (Dispatch::Inline, Ok(entered)) => {
            drop(entered);
            futures::executor::block_on(tracker.error(report));
        }
        _ => spawn_reporter(tracker.clone(), report),
    }
}

fn spawn_reporter(tracker: Tracker, report: ErrorReport) {
    let spawned = thread::Builder::new()
        .name("telltale-report".to_string())
        .spawn(move || futures::executor::block_on(tracker.error(report)));
    if let Err(e) = spawned {
        warn!(error = %e, "Failed to start a thread for the error report");
    }
}

fn chain<R>(handler: &'static str, call: impl FnOnce() -> R) -> HostResult<R> {
    panic::catch_unwind(AssertUnwindSafe(call)).map_err(|payload| HostError::HandlerPanicked {
        handler,
        message: panic_message(payload.as_ref()).unwrap_or_else(|| "panic".to_string()),
    })
}
