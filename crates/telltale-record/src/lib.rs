//! Telltale Records
//!
//! Immutable value types for everything the Telltale telemetry facade
//! reports:
//!
//! - [`Event`]: a discrete, named occurrence
//! - [`ErrorReport`]: a captured failure
//! - [`EventItem`]: a commerce-style structured sub-record
//! - [`Prop`]/[`Props`]: free-form payload values
//!
//! Records serialize to a flat key/value map (the wire shape every delegate
//! agrees on) and parse back from one. Parsing is total: malformed input
//! yields the empty sentinel rather than an error.
//!
//! ```
//! use telltale_record::{Event, props};
//!
//! let event = Event::create("signup")
//!     .with_msg("ok")
//!     .with_props(props! { "plan" => "pro" });
//!
//! let map = event.to_generic_map();
//! assert_eq!(map["name"], "signup");
//!
//! let parsed = Event::parse(&serde_json::Value::Object(map));
//! assert_eq!(parsed.msg.as_deref(), Some("ok"));
//! ```

pub mod error;
pub mod event;
pub mod glyph;
pub mod item;
pub mod report;
pub mod value;

pub use error::{RecordError, RecordResult};
pub use event::Event;
pub use glyph::Glyphs;
pub use item::EventItem;
pub use report::{ErrorKind, ErrorReport, FaultClass, HostFault, UiErrorDetails, panic_message};
pub use value::{Prop, Props, normalize_props, props_from_map};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::event::Event;
    pub use crate::item::EventItem;
    pub use crate::props;
    pub use crate::report::{ErrorKind, ErrorReport, HostFault, UiErrorDetails};
    pub use crate::value::{Prop, Props};
}

/// The platform tag stamped on records when the host supplies none.
pub fn host_platform() -> String {
    std::env::consts::OS.to_string()
}

/// Current time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Current time as an RFC 3339 string.
pub fn now_iso8601() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_imports() {
        use crate::prelude::*;

        let _ = Event::create("x");
        let _ = ErrorReport::create("y");
        let _: Props = props! {};
    }

    #[test]
    fn test_host_platform_is_not_empty() {
        assert!(!host_platform().is_empty());
    }

    #[test]
    fn test_now_iso8601_parses() {
        assert!(chrono::DateTime::parse_from_rfc3339(&now_iso8601()).is_ok());
    }
}
