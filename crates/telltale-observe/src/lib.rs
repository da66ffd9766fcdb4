//! Telltale Observe
//!
//! Ready-made [`Delegate`](telltale_core::Delegate) implementations:
//!
//! - [`LoggingDelegate`]: writes every record as a `tracing` event
//! - [`CollectingDelegate`]: keeps deliveries in memory
//! - [`FanoutDelegate`]: forwards to several delegates
//! - [`NullDelegate`]: accepts and discards
//! - [`StatsDelegate`]: counts what happens to each delivery
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use telltale_observe::{CollectingDelegate, FanoutDelegate, LoggingDelegate, StatsDelegate};
//!
//! let collector = Arc::new(CollectingDelegate::new(100));
//! let fanout = FanoutDelegate::new()
//!     .with(Arc::new(LoggingDelegate::new()))
//!     .with(collector.clone());
//! let stats = Arc::new(StatsDelegate::new(Arc::new(fanout)));
//!
//! // ... hand `stats` to a tracker, report things ...
//!
//! println!("{}", stats.snapshot().to_text());
//! ```

pub mod delegates;
pub mod delivery;
pub mod stats;

// Re-export main types
pub use delegates::{CollectingDelegate, FanoutDelegate, LoggingDelegate, NullDelegate, shared};
pub use delivery::{Delivery, DeliveryId, Record};
pub use stats::{MethodStats, StatsDelegate, StatsSnapshot};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::delegates::{CollectingDelegate, FanoutDelegate, LoggingDelegate, NullDelegate};
    pub use crate::delivery::{Delivery, Record};
    pub use crate::stats::{StatsDelegate, StatsSnapshot};
}
