//! Routing of process panics through the platform error handler.
//!
//! Installing the hook is opt-in. Every panic is reported, including panics
//! that a tracker later catches around wrapped work, except panics raised
//! while a record is being forwarded to a delegate. Those are left to the
//! previous hook, so a delegate that panics is never fed its own panic.
//!
//! The hook never runs a delegate on the panicking thread: reports leave
//! through the runtime or through a thread of their own.

use std::panic::{self, PanicHookInfo};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use telltale_core::is_delivering;
use telltale_record::HostFault;

use crate::bridge::{Dispatch, HostErrorBridge};

static HOOK_BRIDGE: RwLock<Option<Arc<HostErrorBridge>>> = RwLock::new(None);

/// Install a panic hook that reports through `bridge`.
///
/// The hook chains onto the hook installed before it: when the platform
/// handler does not mark the panic as handled, the previous hook runs too
/// (by default, the one printing the panic message). Installing again while
/// the hook is in place only switches the bridge it reports through.
pub fn install_panic_hook(bridge: Arc<HostErrorBridge>) {
    let mut current = HOOK_BRIDGE.write();
    if current.replace(bridge).is_some() {
        debug!("Panic hook already installed, switched its bridge");
        return;
    }

    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        if !route_panic(info) {
            previous(info);
        }
    }));
    debug!("Installed panic hook");
}

/// Remove the hook installed by [`install_panic_hook`], restoring the
/// default one.
///
/// Hooks that were chained behind it are dropped as well. Does nothing when
/// the hook is not installed.
pub fn reset_panic_hook() {
    let mut current = HOOK_BRIDGE.write();
    if current.take().is_some() {
        drop(panic::take_hook());
        debug!("Removed panic hook");
    }
}

/// Check if the hook is installed.
pub fn is_panic_hook_installed() -> bool {
    HOOK_BRIDGE.read().is_some()
}

/// Report one panic; returns whether the platform handler handled it.
fn route_panic(info: &PanicHookInfo<'_>) -> bool {
    if is_delivering() {
        return false;
    }
    // A panic while the hook is being swapped is left to the previous hook.
    let Some(bridge) = HOOK_BRIDGE.try_read().and_then(|current| current.clone()) else {
        return false;
    };

    let fault = fault_from_hook(info);
    let location = info.location().map(|l| l.to_string());
    let handled = bridge.route_platform_error(&fault, location.as_deref(), Dispatch::Detached);
    debug!(handled, "Reported panic as platform error");
    handled
}

fn fault_from_hook(info: &PanicHookInfo<'_>) -> HostFault {
    HostFault::from_panic(info.payload())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_from_message_payload() {
        let fault = HostFault::from_panic(&"assertion failed: x > 0");
        assert_eq!(fault.class, telltale_record::FaultClass::Assertion);
    }
}
