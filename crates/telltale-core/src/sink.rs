//! Local log lines and where they go.

use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

/// Which side of the outcome protocol produced a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
    /// The report succeeded.
    Success,
    /// The tracked work or status failed.
    Failure,
    /// The reporting pipeline itself failed.
    Internal,
}

/// One local log line.
///
/// Rendered as `[glyph ]operation[ [reason]][ => status][: message]`. The
/// logger name, numeric tags and timestamp are carried alongside for the
/// sink and are not part of the rendered text.
#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    pub polarity: Polarity,
    pub glyph: Option<String>,
    pub operation: String,
    pub reason: Option<String>,
    pub status: Option<String>,
    pub message: Option<String>,
    /// Display name of the tracker that produced the line.
    pub logger: String,
    pub level: Option<i32>,
    pub sequence_number: Option<i64>,
    /// Present only when the tracker is configured to include time.
    pub time: Option<DateTime<Utc>>,
}

impl LogLine {
    /// Create a bare line for an operation.
    pub fn new(polarity: Polarity, operation: impl Into<String>) -> Self {
        Self {
            polarity,
            glyph: None,
            operation: operation.into(),
            reason: None,
            status: None,
            message: None,
            logger: String::new(),
            level: None,
            sequence_number: None,
            time: None,
        }
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(glyph) = self.glyph.as_deref().filter(|g| !g.is_empty()) {
            write!(f, "{glyph} ")?;
        }
        write!(f, "{}", self.operation)?;
        if let Some(reason) = self.reason.as_deref().filter(|r| !r.is_empty()) {
            write!(f, " [{reason}]")?;
        }
        if let Some(status) = &self.status {
            write!(f, " => {status}")?;
        }
        if let Some(message) = self.message.as_deref().filter(|m| !m.is_empty()) {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

/// Destination of local log lines.
pub trait LogSink: Send + Sync {
    /// Write one line. Must not panic.
    fn write(&self, line: &LogLine);
}

/// Emits every line as a `tracing` event.
///
/// Success lines go out at `INFO`, failures at `WARN`, internal failures at
/// `ERROR`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, line: &LogLine) {
        let time = line.time.map(|t| t.to_rfc3339());
        match line.polarity {
            Polarity::Success => tracing::info!(
                logger = line.logger.as_str(),
                log_level = line.level,
                sequence_number = line.sequence_number,
                time = time.as_deref(),
                "{line}"
            ),
            Polarity::Failure => tracing::warn!(
                logger = line.logger.as_str(),
                log_level = line.level,
                sequence_number = line.sequence_number,
                time = time.as_deref(),
                "{line}"
            ),
            Polarity::Internal => tracing::error!(
                logger = line.logger.as_str(),
                log_level = line.level,
                sequence_number = line.sequence_number,
                time = time.as_deref(),
                "{line}"
            ),
        }
    }
}

/// Keeps lines in memory, up to a limit.
pub struct MemorySink {
    lines: RwLock<Vec<LogLine>>,
    max_lines: usize,
}

impl MemorySink {
    /// Create a sink holding at most `max_lines` lines.
    pub fn new(max_lines: usize) -> Self {
        Self {
            lines: RwLock::new(Vec::new()),
            max_lines,
        }
    }

    /// Get the collected lines.
    pub fn lines(&self) -> Vec<LogLine> {
        self.lines.read().clone()
    }

    /// Get the collected lines rendered as text.
    pub fn rendered(&self) -> Vec<String> {
        self.lines.read().iter().map(ToString::to_string).collect()
    }

    /// Count lines of one polarity.
    pub fn count(&self, polarity: Polarity) -> usize {
        self.lines
            .read()
            .iter()
            .filter(|l| l.polarity == polarity)
            .count()
    }

    /// Clear collected lines.
    pub fn clear(&self) {
        self.lines.write().clear();
    }

    /// Get line count.
    pub fn len(&self) -> usize {
        self.lines.read().len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.lines.read().is_empty()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl LogSink for MemorySink {
    fn write(&self, line: &LogLine) {
        let mut lines = self.lines.write();
        if lines.len() < self.max_lines {
            lines.push(line.clone());
        }
    }
}

impl fmt::Debug for MemorySink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySink")
            .field("len", &self.len())
            .field("max_lines", &self.max_lines)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_line_format() {
        let line = LogLine {
            glyph: Some("✅".to_string()),
            reason: Some("checkout".to_string()),
            status: Some("ok".to_string()),
            message: Some("paid".to_string()),
            ..LogLine::new(Polarity::Success, "call")
        };
        assert_eq!(line.to_string(), "✅ call [checkout] => ok: paid");
    }

    #[test]
    fn test_bare_line_format() {
        let line = LogLine::new(Polarity::Failure, "sync");
        assert_eq!(line.to_string(), "sync");
    }

    #[test]
    fn test_empty_parts_are_skipped() {
        let line = LogLine {
            glyph: Some(String::new()),
            reason: Some(String::new()),
            message: Some(String::new()),
            ..LogLine::new(Polarity::Failure, "x")
        };
        assert_eq!(line.to_string(), "x");
    }

    #[test]
    fn test_memory_sink_caps_lines() {
        let sink = MemorySink::new(2);
        for _ in 0..5 {
            sink.write(&LogLine::new(Polarity::Success, "x"));
        }
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.count(Polarity::Success), 2);
        assert_eq!(sink.count(Polarity::Internal), 0);
    }

    #[test]
    fn test_tracing_sink_does_not_panic_without_subscriber() {
        let line = LogLine {
            time: Some(Utc::now()),
            level: Some(1000),
            ..LogLine::new(Polarity::Internal, "x")
        };
        TracingSink.write(&line);
    }
}
