//! Ready-made delegates.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::RwLock;

use telltale_core::{Delegate, DelegateError, DelegateMethod, DelegateResult, SharedDelegate};
use telltale_record::{ErrorReport, Event, panic_message};

use crate::delivery::Delivery;

/// Writes every record as a structured `tracing` event.
pub struct LoggingDelegate {
    /// Level for accepted events and log entries.
    pub level: tracing::Level,
}

impl LoggingDelegate {
    /// Create a new logging delegate.
    pub fn new() -> Self {
        Self {
            level: tracing::Level::INFO,
        }
    }

    /// Set the level for successful records.
    pub fn with_level(mut self, level: tracing::Level) -> Self {
        self.level = level;
        self
    }

    fn emit_event(&self, method: DelegateMethod, event: &Event) {
        let props = event.payload().map(|p| {
            serde_json::Value::Object(telltale_record::normalize_props(p)).to_string()
        });
        macro_rules! emit {
            ($lvl:ident) => {
                tracing::$lvl!(
                    delegate = "logging",
                    method = method.as_str(),
                    name = event.name.as_str(),
                    reason = event.reason.as_deref(),
                    sign = event.sign.as_deref(),
                    msg = event.msg.as_deref(),
                    platform = event.platform.as_deref(),
                    time = event.time,
                    props = props.as_deref(),
                    "Delegate received event"
                )
            };
        }
        match self.level {
            tracing::Level::TRACE => emit!(trace),
            tracing::Level::DEBUG => emit!(debug),
            tracing::Level::INFO => emit!(info),
            tracing::Level::WARN => emit!(warn),
            _ => emit!(error),
        }
    }
}

impl Default for LoggingDelegate {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Delegate for LoggingDelegate {
    async fn event(&self, event: &Event) -> DelegateResult<()> {
        self.emit_event(DelegateMethod::Event, event);
        Ok(())
    }

    async fn event_failure(&self, event: &Event) -> DelegateResult<()> {
        tracing::warn!(
            delegate = "logging",
            method = "event_failure",
            name = event.name.as_str(),
            reason = event.reason.as_deref(),
            sign = event.sign.as_deref(),
            msg = event.msg.as_deref(),
            "Delegate received failed event"
        );
        Ok(())
    }

    async fn error(&self, error: &ErrorReport) -> DelegateResult<()> {
        tracing::error!(
            delegate = "logging",
            method = "error",
            kind = error.kind.map(|k| k.as_str()),
            sign = error.sign.as_deref(),
            msg = error.msg.as_deref(),
            details = error.details.as_deref(),
            time = error.time.as_deref(),
            "Delegate received error"
        );
        Ok(())
    }

    async fn log(&self, entry: &Event) -> DelegateResult<()> {
        self.emit_event(DelegateMethod::Log, entry);
        Ok(())
    }

    fn name(&self) -> &str {
        "logging"
    }
}

/// Keeps deliveries in memory, up to a limit.
pub struct CollectingDelegate {
    deliveries: RwLock<Vec<Delivery>>,
    max_deliveries: usize,
}

impl CollectingDelegate {
    /// Create a delegate holding at most `max_deliveries` deliveries.
    pub fn new(max_deliveries: usize) -> Self {
        Self {
            deliveries: RwLock::new(Vec::new()),
            max_deliveries,
        }
    }

    /// Get collected deliveries.
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.read().clone()
    }

    /// Get the deliveries that arrived through one method.
    pub fn received(&self, method: DelegateMethod) -> Vec<Delivery> {
        self.deliveries
            .read()
            .iter()
            .filter(|d| d.method == method)
            .cloned()
            .collect()
    }

    /// Clear collected deliveries.
    pub fn clear(&self) {
        self.deliveries.write().clear();
    }

    /// Get delivery count.
    pub fn len(&self) -> usize {
        self.deliveries.read().len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.deliveries.read().is_empty()
    }

    fn push(&self, delivery: Delivery) {
        let mut deliveries = self.deliveries.write();
        if deliveries.len() < self.max_deliveries {
            deliveries.push(delivery);
        }
    }
}

impl Default for CollectingDelegate {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl Delegate for CollectingDelegate {
    async fn event(&self, event: &Event) -> DelegateResult<()> {
        self.push(Delivery::event(DelegateMethod::Event, event));
        Ok(())
    }

    async fn event_failure(&self, event: &Event) -> DelegateResult<()> {
        self.push(Delivery::event(DelegateMethod::EventFailure, event));
        Ok(())
    }

    async fn error(&self, error: &ErrorReport) -> DelegateResult<()> {
        self.push(Delivery::error(error));
        Ok(())
    }

    async fn log(&self, entry: &Event) -> DelegateResult<()> {
        self.push(Delivery::event(DelegateMethod::Log, entry));
        Ok(())
    }

    fn name(&self) -> &str {
        "collecting"
    }
}

impl std::fmt::Debug for CollectingDelegate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectingDelegate")
            .field("len", &self.len())
            .field("max_deliveries", &self.max_deliveries)
            .finish()
    }
}

/// Accepts and discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDelegate;

#[async_trait]
impl Delegate for NullDelegate {
    async fn event(&self, _event: &Event) -> DelegateResult<()> {
        Ok(())
    }

    async fn event_failure(&self, _event: &Event) -> DelegateResult<()> {
        Ok(())
    }

    async fn error(&self, _error: &ErrorReport) -> DelegateResult<()> {
        Ok(())
    }

    async fn log(&self, _entry: &Event) -> DelegateResult<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "null"
    }
}

/// Forwards every record to several delegates in order.
///
/// All delegates are attempted even when one fails; the first failure is
/// returned afterwards.
#[derive(Default)]
pub struct FanoutDelegate {
    delegates: Vec<SharedDelegate>,
}

impl FanoutDelegate {
    /// Create an empty fan-out.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a delegate.
    pub fn with(mut self, delegate: SharedDelegate) -> Self {
        self.delegates.push(delegate);
        self
    }

    /// Get delegate count.
    pub fn len(&self) -> usize {
        self.delegates.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.delegates.is_empty()
    }

    async fn each<'a, F>(&'a self, mut call: F) -> DelegateResult<()>
    where
        F: FnMut(&'a SharedDelegate) -> BoxFuture<'a, DelegateResult<()>>,
    {
        let mut first: Option<DelegateError> = None;
        for delegate in &self.delegates {
            let attempt = AssertUnwindSafe(async { call(delegate).await }).catch_unwind();
            let result = attempt.await.unwrap_or_else(|payload| {
                Err(DelegateError::Panicked(
                    panic_message(payload.as_ref()).unwrap_or_else(|| "panic".to_string()),
                ))
            });
            if let Err(e) = result {
                tracing::debug!(delegate = delegate.name(), error = %e, "Fan-out target failed");
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), Err)
    }
}

impl FromIterator<SharedDelegate> for FanoutDelegate {
    fn from_iter<I: IntoIterator<Item = SharedDelegate>>(iter: I) -> Self {
        Self {
            delegates: iter.into_iter().collect(),
        }
    }
}

#[async_trait]
impl Delegate for FanoutDelegate {
    async fn event(&self, event: &Event) -> DelegateResult<()> {
        self.each(|d| d.event(event)).await
    }

    async fn event_failure(&self, event: &Event) -> DelegateResult<()> {
        self.each(|d| d.event_failure(event)).await
    }

    async fn error(&self, error: &ErrorReport) -> DelegateResult<()> {
        self.each(|d| d.error(error)).await
    }

    async fn log(&self, entry: &Event) -> DelegateResult<()> {
        self.each(|d| d.log(entry)).await
    }

    fn name(&self) -> &str {
        "fanout"
    }
}

impl std::fmt::Debug for FanoutDelegate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.delegates.iter().map(|d| d.name()).collect();
        f.debug_struct("FanoutDelegate")
            .field("delegates", &names)
            .finish()
    }
}

/// Share a delegate.
pub fn shared<D: Delegate + 'static>(delegate: D) -> SharedDelegate {
    Arc::new(delegate)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Refusing;

    #[async_trait]
    impl Delegate for Refusing {
        async fn event(&self, _event: &Event) -> DelegateResult<()> {
            Err(DelegateError::Declined("quota".to_string()))
        }
        async fn event_failure(&self, _event: &Event) -> DelegateResult<()> {
            Ok(())
        }
        async fn error(&self, _error: &ErrorReport) -> DelegateResult<()> {
            Ok(())
        }
        async fn log(&self, _entry: &Event) -> DelegateResult<()> {
            Ok(())
        }
    }

    struct Exploding;

    #[async_trait]
    impl Delegate for Exploding {
        async fn event(&self, _event: &Event) -> DelegateResult<()> {
            panic!("backend exploded")
        }
        async fn event_failure(&self, _event: &Event) -> DelegateResult<()> {
            Ok(())
        }
        async fn error(&self, _error: &ErrorReport) -> DelegateResult<()> {
            Ok(())
        }
        async fn log(&self, _entry: &Event) -> DelegateResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_collecting_delegate() {
        let delegate = CollectingDelegate::new(100);

        delegate.event(&Event::create("a")).await.unwrap();
        delegate.event_failure(&Event::create("b")).await.unwrap();
        delegate.error(&ErrorReport::create("c")).await.unwrap();
        delegate.log(&Event::create("d")).await.unwrap();

        assert_eq!(delegate.len(), 4);
        let failures = delegate.received(DelegateMethod::EventFailure);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].record.name(), "b");
    }

    #[tokio::test]
    async fn test_collecting_delegate_max_deliveries() {
        let delegate = CollectingDelegate::new(2);
        for i in 0..5 {
            delegate.event(&Event::create(format!("e{i}"))).await.unwrap();
        }
        assert_eq!(delegate.len(), 2);
    }

    #[tokio::test]
    async fn test_fanout_attempts_all_and_reports_first_failure() {
        let collector = Arc::new(CollectingDelegate::default());
        let fanout = FanoutDelegate::new()
            .with(shared(Refusing))
            .with(collector.clone());

        let result = fanout.event(&Event::create("a")).await;

        assert!(matches!(result, Err(DelegateError::Declined(_))));
        assert_eq!(collector.len(), 1);
        assert!(fanout.log(&Event::create("b")).await.is_ok());
    }

    #[tokio::test]
    async fn test_fanout_continues_past_panicking_target() {
        let collector = Arc::new(CollectingDelegate::default());
        let fanout = FanoutDelegate::new()
            .with(shared(Exploding))
            .with(collector.clone());

        let result = fanout.event(&Event::create("signup")).await;

        match result {
            Err(DelegateError::Panicked(message)) => assert_eq!(message, "backend exploded"),
            other => panic!("expected a panicked target, got {other:?}"),
        }
        assert_eq!(collector.received(DelegateMethod::Event).len(), 1);
    }

    #[tokio::test]
    async fn test_logging_and_null_delegates_accept_everything() {
        let delegates: FanoutDelegate = [shared(LoggingDelegate::new()), shared(NullDelegate)]
            .into_iter()
            .collect();

        assert!(delegates.event(&Event::create("a").with_prop("n", 1)).await.is_ok());
        assert!(delegates.error(&ErrorReport::create("x")).await.is_ok());
        assert_eq!(format!("{delegates:?}"), r#"FanoutDelegate { delegates: ["logging", "null"] }"#);
    }
}
