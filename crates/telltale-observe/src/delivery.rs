//! Records as seen by a delegate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use telltale_core::DelegateMethod;
use telltale_record::{ErrorReport, Event};

/// Unique identifier for a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeliveryId(Uuid);

impl DeliveryId {
    /// Generate a new random delivery ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DeliveryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The record carried by a delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Record {
    Event(Event),
    Error(ErrorReport),
}

impl Record {
    /// Name of the record: the event name, or the error's type.
    pub fn name(&self) -> &str {
        match self {
            Record::Event(event) => &event.name,
            Record::Error(report) => report.kind.map(|k| k.as_str()).unwrap_or("error"),
        }
    }

    /// The record's sign, if any.
    pub fn sign(&self) -> Option<&str> {
        match self {
            Record::Event(event) => event.sign.as_deref(),
            Record::Error(report) => report.sign.as_deref(),
        }
    }

    /// The record's message, if any.
    pub fn msg(&self) -> Option<&str> {
        match self {
            Record::Event(event) => event.msg.as_deref(),
            Record::Error(report) => report.msg.as_deref(),
        }
    }

    /// Check whether the record is the empty sentinel.
    pub fn is_empty(&self) -> bool {
        match self {
            Record::Event(event) => event.is_empty(),
            Record::Error(report) => report.is_empty(),
        }
    }
}

/// One record handed to a delegate, with the method it arrived through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub id: DeliveryId,
    pub method: DelegateMethod,
    pub received_at: DateTime<Utc>,
    pub record: Record,
}

impl Delivery {
    /// Stamp an event delivery.
    pub fn event(method: DelegateMethod, event: &Event) -> Self {
        Self::new(method, Record::Event(event.clone()))
    }

    /// Stamp an error delivery.
    pub fn error(report: &ErrorReport) -> Self {
        Self::new(DelegateMethod::Error, Record::Error(report.clone()))
    }

    fn new(method: DelegateMethod, record: Record) -> Self {
        Self {
            id: DeliveryId::new(),
            method,
            received_at: Utc::now(),
            record,
        }
    }

    /// Render the delivery as one line of text.
    pub fn summary(&self) -> String {
        let mut line = format!("{} {}", self.method, self.record.name());
        if let Some(sign) = self.record.sign() {
            line = format!("{sign} {line}");
        }
        if let Some(msg) = self.record.msg().filter(|m| !m.is_empty()) {
            line.push_str(": ");
            line.push_str(msg);
        }
        line
    }
}
