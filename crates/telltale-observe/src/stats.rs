//! Delivery statistics.

use std::collections::BTreeMap;
use std::time::Instant;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use telltale_core::{Delegate, DelegateMethod, DelegateResult, SharedDelegate};
use telltale_record::{ErrorReport, Event};

/// Counters for one delegate method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodStats {
    /// Records the inner delegate accepted.
    pub accepted: u64,
    /// Records the inner delegate failed on.
    pub failed: u64,
}

impl MethodStats {
    /// Total attempts.
    pub fn total(&self) -> u64 {
        self.accepted + self.failed
    }
}

/// A point-in-time copy of the statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Name of the wrapped delegate.
    pub delegate: String,
    /// Counters keyed by method name.
    pub methods: BTreeMap<String, MethodStats>,
    /// Counters keyed by record name.
    pub names: BTreeMap<String, MethodStats>,
    /// Seconds since the statistics were last reset.
    pub elapsed_secs: f64,
}

impl StatsSnapshot {
    /// Totals across all methods.
    pub fn totals(&self) -> MethodStats {
        self.methods.values().fold(MethodStats::default(), |acc, m| MethodStats {
            accepted: acc.accepted + m.accepted,
            failed: acc.failed + m.failed,
        })
    }

    /// Counters of one method.
    pub fn method(&self, method: DelegateMethod) -> MethodStats {
        self.methods
            .get(method.as_str())
            .copied()
            .unwrap_or_default()
    }

    /// Render as human-readable text.
    pub fn to_text(&self) -> String {
        let mut out = format!("Delegate: {}\n", self.delegate);
        let totals = self.totals();
        out.push_str(&format!(
            "Deliveries: {} ({} accepted, {} failed)\n",
            totals.total(),
            totals.accepted,
            totals.failed
        ));
        for (method, stats) in &self.methods {
            out.push_str(&format!(
                "  {method}: {} accepted, {} failed\n",
                stats.accepted, stats.failed
            ));
        }
        if !self.names.is_empty() {
            out.push_str("Records:\n");
            for (name, stats) in &self.names {
                out.push_str(&format!("  {name}: {}\n", stats.total()));
            }
        }
        out
    }
}

/// Wraps a delegate and counts what happens to each delivery.
///
/// Results of the inner delegate are passed through unchanged.
pub struct StatsDelegate {
    inner: SharedDelegate,
    methods: DashMap<DelegateMethod, MethodStats>,
    names: DashMap<String, MethodStats>,
    started: parking_lot::RwLock<Instant>,
}

impl StatsDelegate {
    /// Wrap a delegate.
    pub fn new(inner: SharedDelegate) -> Self {
        Self {
            inner,
            methods: DashMap::new(),
            names: DashMap::new(),
            started: parking_lot::RwLock::new(Instant::now()),
        }
    }

    /// Counters of one method.
    pub fn method(&self, method: DelegateMethod) -> MethodStats {
        self.methods
            .get(&method)
            .map(|entry| *entry)
            .unwrap_or_default()
    }

    /// Get a snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            delegate: self.inner.name().to_string(),
            methods: self
                .methods
                .iter()
                .map(|entry| (entry.key().as_str().to_string(), *entry.value()))
                .collect(),
            names: self
                .names
                .iter()
                .map(|entry| (entry.key().clone(), *entry.value()))
                .collect(),
            elapsed_secs: self.started.read().elapsed().as_secs_f64(),
        }
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.methods.clear();
        self.names.clear();
        *self.started.write() = Instant::now();
    }

    fn record(&self, method: DelegateMethod, name: &str, result: &DelegateResult<()>) {
        let bump = |stats: &mut MethodStats| match result {
            Ok(()) => stats.accepted += 1,
            Err(_) => stats.failed += 1,
        };
        bump(self.methods.entry(method).or_default().value_mut());
        bump(self.names.entry(name.to_string()).or_default().value_mut());
    }
}

#[async_trait]
impl Delegate for StatsDelegate {
    async fn event(&self, event: &Event) -> DelegateResult<()> {
        let result = self.inner.event(event).await;
        self.record(DelegateMethod::Event, &event.name, &result);
        result
    }

    async fn event_failure(&self, event: &Event) -> DelegateResult<()> {
        let result = self.inner.event_failure(event).await;
        self.record(DelegateMethod::EventFailure, &event.name, &result);
        result
    }

    async fn error(&self, error: &ErrorReport) -> DelegateResult<()> {
        let result = self.inner.error(error).await;
        let name = error.kind.map(|k| k.as_str()).unwrap_or("error");
        self.record(DelegateMethod::Error, name, &result);
        result
    }

    async fn log(&self, entry: &Event) -> DelegateResult<()> {
        let result = self.inner.log(entry).await;
        self.record(DelegateMethod::Log, &entry.name, &result);
        result
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

impl std::fmt::Debug for StatsDelegate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsDelegate")
            .field("inner", &self.inner.name())
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use telltale_core::DelegateError;

    use crate::delegates::{CollectingDelegate, NullDelegate};

    struct Flaky;

    #[async_trait]
    impl Delegate for Flaky {
        async fn event(&self, _event: &Event) -> DelegateResult<()> {
            Err(DelegateError::Unavailable("down".to_string()))
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
    async fn test_counts_accepted_and_failed() {
        let stats = StatsDelegate::new(Arc::new(Flaky));

        assert!(stats.event(&Event::create("signup")).await.is_err());
        stats.event_failure(&Event::create("signup")).await.unwrap();
        stats.error(&ErrorReport::create("x")).await.unwrap();

        assert_eq!(stats.method(DelegateMethod::Event), MethodStats { accepted: 0, failed: 1 });
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.totals(), MethodStats { accepted: 2, failed: 1 });
        assert_eq!(snapshot.names["signup"].total(), 2);
        assert_eq!(snapshot.names["error"].accepted, 1);
    }

    #[tokio::test]
    async fn test_passes_records_through() {
        let inner = Arc::new(CollectingDelegate::default());
        let stats = StatsDelegate::new(inner.clone());

        stats.log(&Event::create("cache")).await.unwrap();

        assert_eq!(inner.len(), 1);
        assert_eq!(stats.name(), "collecting");
    }

    #[tokio::test]
    async fn test_snapshot_serializes_and_resets() {
        let stats = StatsDelegate::new(Arc::new(NullDelegate));
        stats.event(&Event::create("a")).await.unwrap();

        let json = serde_json::to_value(stats.snapshot()).unwrap();
        assert_eq!(json["delegate"], "null");
        assert_eq!(json["methods"]["event"]["accepted"], 1);
        assert!(stats.snapshot().to_text().contains("event: 1 accepted, 0 failed"));

        stats.reset();
        assert_eq!(stats.snapshot().totals().total(), 0);
    }
}
