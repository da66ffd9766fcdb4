//! Captured failures.

use std::any::Any;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::RecordError;
use crate::event::{insert_text, read_text};
use crate::glyph;

/// Where a captured failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// A failed assertion inside the UI framework.
    Assertion,
    /// Any other UI framework error.
    Widget,
    /// An uncaught platform-level error.
    Platform,
}

impl ErrorKind {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Assertion => "assertion",
            ErrorKind::Widget => "widget",
            ErrorKind::Platform => "platform",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ErrorKind {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assertion" => Ok(ErrorKind::Assertion),
            "widget" => Ok(ErrorKind::Widget),
            "platform" => Ok(ErrorKind::Platform),
            other => Err(RecordError::UnknownKind(other.to_string())),
        }
    }
}

/// Classification of a fault raised by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultClass {
    /// An assertion failure.
    Assertion,
    /// A regular exception or error value.
    Exception,
    /// Anything else that was thrown.
    Other,
}

/// A fault raised by the host environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostFault {
    /// How the fault was raised.
    pub class: FaultClass,
    /// Description of the fault.
    pub message: String,
}

impl HostFault {
    /// An assertion failure.
    pub fn assertion(message: impl Into<String>) -> Self {
        Self {
            class: FaultClass::Assertion,
            message: message.into(),
        }
    }

    /// A regular exception.
    pub fn exception(message: impl Into<String>) -> Self {
        Self {
            class: FaultClass::Exception,
            message: message.into(),
        }
    }

    /// Something that is neither an assertion nor an exception.
    pub fn other(message: impl Into<String>) -> Self {
        Self {
            class: FaultClass::Other,
            message: message.into(),
        }
    }

    /// Capture an error value.
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        Self::exception(error.to_string())
    }

    /// Capture a panic payload. Panics raised by `assert!` and friends are
    /// classified as assertions; string payloads as exceptions.
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        match panic_message(payload) {
            Some(message) if message.starts_with("assertion") => Self::assertion(message),
            Some(message) => Self::exception(message),
            None => Self::other("panic with non-string payload"),
        }
    }
}

impl fmt::Display for HostFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Extract the message of a panic payload, if it carries one.
pub fn panic_message(payload: &(dyn Any + Send)) -> Option<String> {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
}

/// Details of an error caught by the host UI framework.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiErrorDetails {
    /// The caught fault.
    pub fault: HostFault,
    /// Stack trace text, if captured.
    pub stack: Option<String>,
    /// Library or subsystem that caught the error.
    pub library: Option<String>,
    /// What the framework was doing when the error happened.
    pub context: Option<String>,
}

impl UiErrorDetails {
    /// Wrap a fault with no further details.
    pub fn new(fault: HostFault) -> Self {
        Self {
            fault,
            stack: None,
            library: None,
            context: None,
        }
    }

    /// Attach a stack trace.
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Attach the catching library.
    pub fn with_library(mut self, library: impl Into<String>) -> Self {
        self.library = Some(library.into());
        self
    }

    /// Attach the framework context.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    fn describe(&self) -> Option<String> {
        let mut lines = Vec::new();
        match (&self.library, &self.context) {
            (Some(library), Some(context)) => lines.push(format!("[{library}] {context}")),
            (Some(library), None) => lines.push(format!("[{library}]")),
            (None, Some(context)) => lines.push(context.clone()),
            (None, None) => {}
        }
        if let Some(stack) = &self.stack {
            lines.push(stack.clone());
        }
        (!lines.is_empty()).then(|| lines.join("\n"))
    }
}

/// One captured failure.
///
/// A report with every field unset is the "empty" sentinel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorReport {
    /// RFC 3339 timestamp.
    pub time: Option<String>,
    /// Opaque host platform tag.
    pub platform: Option<String>,
    /// Error description.
    pub msg: Option<String>,
    /// Short status glyph.
    pub sign: Option<String>,
    /// Extended description or stack trace.
    pub details: Option<String>,
    /// Origin classification. Serialized as `type`.
    pub kind: Option<ErrorKind>,
}

impl ErrorReport {
    /// The empty sentinel.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a report stamped with the current time and host platform.
    pub fn create(msg: impl Into<String>) -> Self {
        Self {
            time: Some(crate::now_iso8601()),
            platform: Some(crate::host_platform()),
            msg: Some(msg.into()),
            sign: Some(glyph::EXCEPTION.to_string()),
            ..Self::default()
        }
    }

    /// Map an error caught by the UI framework.
    ///
    /// Assertions become [`ErrorKind::Assertion`]; everything else is a
    /// [`ErrorKind::Widget`] error whose sign depends on the fault class.
    pub fn from_host_ui_error(details: &UiErrorDetails) -> Self {
        let (kind, sign) = match details.fault.class {
            FaultClass::Assertion => (ErrorKind::Assertion, glyph::ASSERTION),
            FaultClass::Exception => (ErrorKind::Widget, glyph::EXCEPTION),
            FaultClass::Other => (ErrorKind::Widget, glyph::UNKNOWN_FAULT),
        };

        Self {
            time: Some(crate::now_iso8601()),
            platform: Some(crate::host_platform()),
            msg: Some(details.fault.message.clone()),
            sign: Some(sign.to_string()),
            details: details.describe(),
            kind: Some(kind),
        }
    }

    /// Map an uncaught platform-level error.
    pub fn from_host_platform_error(fault: &HostFault, stack: Option<&str>) -> Self {
        Self {
            time: Some(crate::now_iso8601()),
            platform: Some(crate::host_platform()),
            msg: Some(fault.message.clone()),
            sign: Some(glyph::PLATFORM.to_string()),
            details: stack.map(str::to_string),
            kind: Some(ErrorKind::Platform),
        }
    }

    /// Check whether this is the empty sentinel.
    pub fn is_empty(&self) -> bool {
        self.time.is_none()
            && self.platform.is_none()
            && self.msg.is_none()
            && self.sign.is_none()
            && self.details.is_none()
            && self.kind.is_none()
    }

    /// Set the message.
    pub fn with_msg(mut self, msg: impl Into<String>) -> Self {
        self.msg = Some(msg.into());
        self
    }

    /// Set the details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Set the sign.
    pub fn with_sign(mut self, sign: impl Into<String>) -> Self {
        self.sign = Some(sign.into());
        self
    }

    /// Set the platform tag.
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// Set the origin classification.
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Serialize into a flat map, omitting unset and empty fields.
    pub fn to_generic_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        insert_text(&mut map, "time", &self.time);
        insert_text(&mut map, "platform", &self.platform);
        insert_text(&mut map, "msg", &self.msg);
        insert_text(&mut map, "sign", &self.sign);
        insert_text(&mut map, "details", &self.details);
        if let Some(kind) = self.kind {
            map.insert("type".to_string(), Value::String(kind.as_str().to_string()));
        }
        map
    }

    /// Parse from a generic map. Anything that is not a map yields the
    /// sentinel; fields of an unexpected type are left unset.
    pub fn parse(source: &Value) -> Self {
        let Some(map) = source.as_object() else {
            tracing::trace!("Falling back to empty error report");
            return Self::empty();
        };

        Self {
            time: read_text(map, "time"),
            platform: read_text(map, "platform"),
            msg: read_text(map, "msg"),
            sign: read_text(map, "sign"),
            details: read_text(map, "details"),
            kind: map
                .get("type")
                .and_then(Value::as_str)
                .and_then(|s| s.parse().ok()),
        }
    }
}

impl Serialize for ErrorReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_generic_map().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ErrorReport {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::parse(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ui_assertion_mapping() {
        let details = UiErrorDetails::new(HostFault::assertion("'layout' failed"));
        let report = ErrorReport::from_host_ui_error(&details);
        assert_eq!(report.kind, Some(ErrorKind::Assertion));
        assert_eq!(report.sign.as_deref(), Some("🧨"));
        assert_eq!(report.msg.as_deref(), Some("'layout' failed"));
    }

    #[test]
    fn test_ui_exception_and_other_mapping() {
        let report =
            ErrorReport::from_host_ui_error(&UiErrorDetails::new(HostFault::exception("bad state")));
        assert_eq!(report.kind, Some(ErrorKind::Widget));
        assert_eq!(report.sign.as_deref(), Some("🚨"));

        let report = ErrorReport::from_host_ui_error(&UiErrorDetails::new(HostFault::other("42")));
        assert_eq!(report.kind, Some(ErrorKind::Widget));
        assert_eq!(report.sign.as_deref(), Some("💥"));
    }

    #[test]
    fn test_ui_details_text() {
        let details = UiErrorDetails::new(HostFault::exception("x"))
            .with_library("rendering")
            .with_context("during layout")
            .with_stack("#0 main");
        let report = ErrorReport::from_host_ui_error(&details);
        assert_eq!(
            report.details.as_deref(),
            Some("[rendering] during layout\n#0 main")
        );
    }

    #[test]
    fn test_platform_mapping() {
        let report =
            ErrorReport::from_host_platform_error(&HostFault::other("segv"), Some("#0 start"));
        assert_eq!(report.kind, Some(ErrorKind::Platform));
        assert_eq!(report.sign.as_deref(), Some("🛑"));
        assert_eq!(report.details.as_deref(), Some("#0 start"));
        assert!(report.time.is_some());
    }

    #[test]
    fn test_panic_payload_classification() {
        let payload: Box<dyn Any + Send> = Box::new("assertion failed: x > 0");
        assert_eq!(HostFault::from_panic(payload.as_ref()).class, FaultClass::Assertion);

        let payload: Box<dyn Any + Send> = Box::new(String::from("boom"));
        let fault = HostFault::from_panic(payload.as_ref());
        assert_eq!(fault.class, FaultClass::Exception);
        assert_eq!(fault.message, "boom");

        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(HostFault::from_panic(payload.as_ref()).class, FaultClass::Other);
    }

    #[test]
    fn test_sentinel() {
        assert!(ErrorReport::empty().is_empty());
        assert!(ErrorReport::empty().to_generic_map().is_empty());
        assert!(ErrorReport::parse(&json!("nope")).is_empty());
        assert!(ErrorReport::parse(&json!({ "msg": 1, "type": "alien" })).is_empty());
    }

    #[test]
    fn test_map_uses_type_key() {
        let report = ErrorReport::create("x").with_kind(ErrorKind::Widget);
        let map = report.to_generic_map();
        assert_eq!(map.get("type"), Some(&json!("widget")));

        let parsed = ErrorReport::parse(&Value::Object(map));
        assert_eq!(parsed.kind, Some(ErrorKind::Widget));
        assert_eq!(parsed.msg.as_deref(), Some("x"));
    }
}
