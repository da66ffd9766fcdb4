//! End-to-end reporting scenarios against standalone trackers.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use telltale::prelude::*;

struct Broken;

#[async_trait]
impl Delegate for Broken {
    async fn event(&self, _event: &Event) -> DelegateResult<()> {
        Err(DelegateError::Unavailable("collector offline".to_string()))
    }
    async fn event_failure(&self, _event: &Event) -> DelegateResult<()> {
        panic!("failure path exploded")
    }
    async fn error(&self, _error: &ErrorReport) -> DelegateResult<()> {
        Err(DelegateError::Declined("rate limited".to_string()))
    }
    async fn log(&self, _entry: &Event) -> DelegateResult<()> {
        Ok(())
    }
}

fn recording() -> (Tracker, Arc<CollectingDelegate>, Arc<MemorySink>) {
    let collector = Arc::new(CollectingDelegate::default());
    let sink = Arc::new(MemorySink::default());
    let tracker = Telltale::builder()
        .with_enabled(true)
        .with_logs(false)
        .with_delegate(collector.clone())
        .with_log_sink(sink.clone())
        .build()
        .unwrap();
    (tracker, collector, sink)
}

#[tokio::test]
async fn test_signup_event_is_forwarded_once() {
    let (tracker, collector, sink) = recording();

    tracker.event("signup", EventArgs::new().with_msg("ok")).await;

    let accepted = collector.received(DelegateMethod::Event);
    assert_eq!(collector.len(), 1);
    assert_eq!(accepted.len(), 1);
    let Record::Event(event) = &accepted[0].record else {
        panic!("expected an event record");
    };
    assert_eq!(event.name, "signup");
    assert_eq!(event.msg.as_deref(), Some("ok"));
    assert!(!event.platform.as_deref().unwrap_or_default().is_empty());
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_failing_call_reports_boom() {
    let (tracker, collector, _) = recording();

    tracker
        .call(TrackOptions::new(), || Err::<(), _>("boom"))
        .await;

    assert!(collector.received(DelegateMethod::Event).is_empty());
    let failures = collector.received(DelegateMethod::EventFailure);
    assert_eq!(failures.len(), 1);
    assert!(failures[0].record.msg().unwrap().contains("boom"));
}

#[tokio::test]
async fn test_value_producing_wraps() {
    let (tracker, collector, _) = recording();

    let parsed = tracker
        .execute(TrackOptions::named("parse"), || "17".parse::<u32>())
        .await;
    let missing = tracker
        .future(TrackOptions::named("fetch"), async {
            Err::<String, _>("404 not found")
        })
        .await;

    assert_eq!(parsed, Some(17));
    assert_eq!(missing, None);
    assert_eq!(collector.received(DelegateMethod::Event).len(), 1);
    assert_eq!(collector.received(DelegateMethod::EventFailure).len(), 1);
}

#[tokio::test]
async fn test_broken_delegate_never_reaches_caller() {
    let sink = Arc::new(MemorySink::default());
    let tracker = Telltale::builder()
        .with_enabled(true)
        .with_delegate(Arc::new(Broken))
        .with_log_sink(sink.clone())
        .build()
        .unwrap();

    tracker.event("signup", EventArgs::new()).await;
    let value = tracker
        .execute(TrackOptions::new(), || Err::<u8, _>("bad input"))
        .await;
    tracker.error(ErrorReport::create("disk full")).await;

    assert_eq!(value, None);
    assert_eq!(sink.count(Polarity::Internal), 3);
    assert!(
        sink.lines()
            .iter()
            .filter(|l| l.polarity == Polarity::Internal)
            .all(|l| l.glyph.as_deref() == Some("☠️"))
    );
}

#[tokio::test]
async fn test_without_delegate_everything_completes() {
    let sink = Arc::new(MemorySink::default());
    let tracker = Telltale::builder()
        .with_enabled(true)
        .with_success_logs(true)
        .with_log_sink(sink.clone())
        .build()
        .unwrap();

    tracker.event("a", EventArgs::new()).await;
    tracker.call(TrackOptions::new(), || Ok::<_, String>(())).await;
    tracker
        .call_async(TrackOptions::new(), async { Err::<(), _>("x") })
        .await;
    assert_eq!(tracker.execute(TrackOptions::new(), || Ok::<_, String>(1)).await, Some(1));
    assert_eq!(tracker.future(TrackOptions::new(), async { Ok::<_, String>(2) }).await, Some(2));
    let items: Vec<u8> = tracker
        .stream(TrackOptions::new(), stream::iter([Ok::<_, String>(1u8)]))
        .collect()
        .await;
    tracker.log(LogEntry::new("a", "b")).await;
    tracker.warn(LogEntry::new("a", "b").failed()).await;
    tracker.error(ErrorReport::create("e")).await;

    assert_eq!(items, vec![1]);
    assert_eq!(sink.len(), 9);
    assert_eq!(sink.count(Polarity::Internal), 0);
}

#[tokio::test]
async fn test_augmented_handles_keep_values() {
    let (tracker, collector, _) = recording();

    let value = async { Ok::<_, String>("payload") }
        .tracked(&tracker, TrackOptions::named("download"))
        .await;
    let items: Vec<i32> = stream::iter([Ok(1), Ok(2), Err("reset"), Ok(4)])
        .tracked_stream(&tracker, TrackOptions::named("feed"))
        .collect()
        .await;

    assert_eq!(value, Some("payload"));
    assert_eq!(items, vec![1, 2]);
    let failures = collector.received(DelegateMethod::EventFailure);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].record.name(), "feed");
}

#[tokio::test]
async fn test_stats_over_fanout() {
    let collector = Arc::new(CollectingDelegate::default());
    let fanout = FanoutDelegate::new()
        .with(Arc::new(NullDelegate))
        .with(collector.clone());
    let stats = Arc::new(StatsDelegate::new(Arc::new(fanout)));
    let tracker = Telltale::builder()
        .with_enabled(true)
        .with_logs(false)
        .with_delegate(stats.clone())
        .build()
        .unwrap();

    tracker.event("a", EventArgs::new()).await;
    tracker.event("a", EventArgs::failed()).await;
    tracker.log(LogEntry::new("b", "c")).await;

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.totals().accepted, 3);
    assert_eq!(snapshot.names["a"].total(), 2);
    assert_eq!(collector.len(), 3);
}

struct Slow;

#[async_trait]
impl Delegate for Slow {
    async fn event(&self, _event: &Event) -> DelegateResult<()> {
        tokio::time::sleep(Duration::from_secs(5)).await;
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
}

#[tokio::test]
async fn test_slow_delegate_is_cut_off() {
    let sink = Arc::new(MemorySink::default());
    let tracker = Telltale::builder()
        .with_enabled(true)
        .with_delegate(Arc::new(Slow))
        .with_delegate_timeout(Duration::from_millis(20))
        .with_log_sink(sink.clone())
        .build()
        .unwrap();

    let started = std::time::Instant::now();
    tracker.event("signup", EventArgs::new()).await;

    assert!(started.elapsed() < Duration::from_secs(5));
    let internal: Vec<LogLine> = sink
        .lines()
        .into_iter()
        .filter(|l| l.polarity == Polarity::Internal)
        .collect();
    assert_eq!(internal.len(), 1);
    assert_eq!(internal[0].glyph.as_deref(), Some("☠️"));
    assert!(
        internal[0]
            .message
            .as_deref()
            .is_some_and(|m| m.contains("timed out"))
    );
}
