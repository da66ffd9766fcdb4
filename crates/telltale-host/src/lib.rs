//! Telltale Host Error Bridge
//!
//! This crate connects a [`Tracker`](telltale_core::Tracker) to the two
//! error sources of a host application:
//!
//! - UI framework errors, through a [`UiErrorHandler`]
//! - uncaught platform errors, through a [`PlatformErrorHandler`] whose
//!   return value tells the host whether the error was handled
//!
//! Both handlers report first and then run whatever handler the host had
//! installed before. Panics can be routed through the platform handler with
//! [`install_panic_hook`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use telltale_host::{HostErrorBridge, install_panic_hook};
//!
//! let bridge = Arc::new(HostErrorBridge::new());
//! bridge.register(tracker, None, None);
//! install_panic_hook(bridge.clone());
//! ```

pub mod bridge;
pub mod error;
pub mod panic_hook;

// Re-export main types
pub use bridge::{HostErrorBridge, PlatformErrorHandler, Registration, UiErrorHandler};
pub use error::{HostError, HostResult};
pub use panic_hook::{install_panic_hook, is_panic_hook_installed, reset_panic_hook};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bridge::{HostErrorBridge, PlatformErrorHandler, UiErrorHandler};
    pub use crate::error::{HostError, HostResult};
    pub use crate::panic_hook::install_panic_hook;
}
