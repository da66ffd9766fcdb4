//! Extension methods for tracking futures and streams in place.
//!
//! ```ignore
//! use telltale_core::prelude::*;
//!
//! let profile = fetch_profile(id)
//!     .tracked(&tracker, TrackOptions::named("profile"))
//!     .await;
//!
//! let rows = query_rows()
//!     .tracked_stream(&tracker, TrackOptions::named("rows"))
//!     .collect::<Vec<_>>()
//!     .await;
//! ```

use std::fmt;
use std::future::Future;

use futures::future::BoxFuture;
use futures::stream::{BoxStream, Stream};
use futures::FutureExt;

use crate::tracker::{TrackOptions, Tracker};

/// Track a fallible future with [`Tracker::future`].
pub trait TrackedFutureExt<'a, T, E>: Future<Output = Result<T, E>> + Send + Sized + 'a
where
    T: Send + 'a,
    E: fmt::Display + Send + 'a,
{
    /// Await the future, report the outcome, and yield its value or `None`.
    fn tracked(self, tracker: &Tracker, options: TrackOptions) -> BoxFuture<'a, Option<T>> {
        let tracker = tracker.clone();
        async move { tracker.future(options, self).await }.boxed()
    }
}

impl<'a, T, E, F> TrackedFutureExt<'a, T, E> for F
where
    F: Future<Output = Result<T, E>> + Send + 'a,
    T: Send + 'a,
    E: fmt::Display + Send + 'a,
{
}

/// Track a fallible stream with [`Tracker::stream`].
pub trait TrackedStreamExt<'a, T, E>: Stream<Item = Result<T, E>> + Send + Sized + 'a
where
    T: Send + 'a,
    E: fmt::Display + Send + 'a,
{
    /// Pass items through until the first error, reporting once at the end.
    fn tracked_stream(self, tracker: &Tracker, options: TrackOptions) -> BoxStream<'a, T> {
        tracker.stream(options, self)
    }
}

impl<'a, T, E, S> TrackedStreamExt<'a, T, E> for S
where
    S: Stream<Item = Result<T, E>> + Send + 'a,
    T: Send + 'a,
    E: fmt::Display + Send + 'a,
{
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use futures::stream::{self, StreamExt};

    use crate::config::TrackerConfig;
    use crate::sink::{MemorySink, Polarity};

    fn tracker() -> (Tracker, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::default());
        let tracker = Tracker::new(
            TrackerConfig::disabled()
                .with_success_logs(true)
                .with_log_sink(sink.clone()),
        );
        (tracker, sink)
    }

    #[tokio::test]
    async fn test_tracked_future() {
        let (tracker, sink) = tracker();

        let ok = async { Ok::<_, String>(7) }
            .tracked(&tracker, TrackOptions::named("seven"))
            .await;
        let failed = async { Err::<u8, _>("gone".to_string()) }
            .tracked(&tracker, TrackOptions::new())
            .await;

        assert_eq!(ok, Some(7));
        assert_eq!(failed, None);
        assert_eq!(sink.count(Polarity::Success), 1);
        assert_eq!(sink.rendered()[1], "✖️ future => failed: gone");
    }

    #[tokio::test]
    async fn test_tracked_stream() {
        let (tracker, sink) = tracker();

        let items: Vec<u8> = stream::iter([Ok::<_, String>(1u8), Ok(2)])
            .tracked_stream(&tracker, TrackOptions::named("pages"))
            .collect()
            .await;

        assert_eq!(items, vec![1, 2]);
        assert_eq!(sink.rendered(), vec!["📶 pages => ok".to_string()]);
    }
}
