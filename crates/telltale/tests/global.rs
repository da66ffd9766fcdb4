//! The process-wide tracker and host error routing.
//!
//! Everything here touches global state, so it runs as one sequential test.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use telltale::prelude::*;

#[tokio::test]
async fn test_process_wide_lifecycle() {
    // Before initialization: a disabled tracker with no delegate.
    let lazy = telltale::tracker();
    assert!(!lazy.is_enabled());
    assert!(lazy.config().delegate.is_none());
    telltale::event("early", EventArgs::failed()).await;
    assert_eq!(
        telltale::execute(TrackOptions::new(), || Ok::<_, String>(5)).await,
        Some(5)
    );
    assert!(telltale::ui_error_handler().is_err());

    // First initialization.
    let first = Arc::new(CollectingDelegate::default());
    let chained_ui = Arc::new(AtomicUsize::new(0));
    let counter = chained_ui.clone();
    Telltale::builder()
        .with_enabled(true)
        .with_logs(false)
        .with_delegate(first.clone())
        .on_ui_error(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .on_platform_error(|_, _| true)
        .init()
        .unwrap();

    telltale::event("signup", EventArgs::new().with_msg("ok")).await;
    telltale::call(TrackOptions::new(), || Err::<(), _>("boom")).await;
    telltale::log(LogEntry::new("cache", "warmup")).await;
    telltale::error(ErrorReport::create("disk full")).await;

    assert_eq!(first.received(DelegateMethod::Event).len(), 1);
    assert_eq!(first.received(DelegateMethod::EventFailure).len(), 1);
    assert_eq!(first.received(DelegateMethod::Log).len(), 1);
    assert_eq!(first.received(DelegateMethod::Error).len(), 1);

    // Host errors go through the bridge, inside the runtime they are spawned.
    let old_platform_handler = telltale::platform_error_handler().unwrap();
    telltale::report_ui_error(&UiErrorDetails::new(HostFault::assertion("overflow")));
    let handled = telltale::report_platform_error(&HostFault::exception("socket closed"), None);
    assert!(handled);
    assert_eq!(chained_ui.load(Ordering::SeqCst), 1);
    settle(|| first.received(DelegateMethod::Error).len() == 3).await;

    // Re-initialization swaps the tracker and the handlers.
    let in_flight = telltale::tracker();
    let second = Arc::new(CollectingDelegate::default());
    Telltale::builder()
        .with_enabled(true)
        .with_logs(false)
        .with_delegate(second.clone())
        .init()
        .unwrap();

    telltale::event("after", EventArgs::new()).await;
    in_flight.event("captured", EventArgs::new()).await;
    assert!(!telltale::report_platform_error(&HostFault::other("x"), None));
    assert!(old_platform_handler(&HostFault::other("y"), None));

    assert_eq!(second.received(DelegateMethod::Event).len(), 1);
    assert_eq!(first.received(DelegateMethod::Event).len(), 2);
    settle(|| second.received(DelegateMethod::Error).len() == 1).await;
    settle(|| first.received(DelegateMethod::Error).len() == 4).await;

    // The panic hook comes back on the next init after a reset.
    let with_hook = || {
        Telltale::builder()
            .with_enabled(true)
            .with_logs(false)
            .with_delegate(second.clone())
            .with_panic_hook(true)
            .init()
            .unwrap()
    };
    with_hook();
    assert!(telltale_host::is_panic_hook_installed());
    telltale_host::reset_panic_hook();
    assert!(!telltale_host::is_panic_hook_installed());
    with_hook();
    assert!(telltale_host::is_panic_hook_installed());
    telltale_host::reset_panic_hook();
}

async fn settle(done: impl Fn() -> bool) {
    for _ in 0..100 {
        if done() {
            return;
        }
        tokio::task::yield_now().await;
    }
    assert!(done());
}
