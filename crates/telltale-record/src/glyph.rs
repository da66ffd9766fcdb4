//! Status glyphs.
//!
//! Every record carries a short `sign` and every local log line starts with
//! one. Each reporting operation owns a [`Glyphs`] pair so that success and
//! failure lines of different operations stay distinguishable.

/// A success/failure glyph pair owned by one kind of reporting operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyphs {
    /// Glyph used when the operation succeeded.
    pub success: &'static str,
    /// Glyph used when the operation failed.
    pub failure: &'static str,
}

impl Glyphs {
    /// Pick the glyph matching an outcome.
    pub fn for_status(&self, status: bool) -> &'static str {
        if status { self.success } else { self.failure }
    }
}

/// Explicit-status events.
pub const EVENT: Glyphs = Glyphs {
    success: "🟢",
    failure: "🔴",
};

/// Wrapped units of work, sync and async.
pub const CALL: Glyphs = Glyphs {
    success: "✅",
    failure: "❌",
};

/// Wrapped value-producing work, sync and async.
pub const EXECUTE: Glyphs = Glyphs {
    success: "☑️",
    failure: "✖️",
};

/// Wrapped sequence producers.
pub const STREAM: Glyphs = Glyphs {
    success: "📶",
    failure: "📵",
};

/// Free-form log entries.
pub const LOG: Glyphs = Glyphs {
    success: "📝",
    failure: "📛",
};

/// Free-form warning entries.
pub const WARN: Glyphs = Glyphs {
    success: "🔔",
    failure: "⚠️",
};

/// Assertion-kind UI framework error.
pub const ASSERTION: &str = "🧨";

/// Exception/error-kind UI framework error.
pub const EXCEPTION: &str = "🚨";

/// UI framework error of any other kind.
pub const UNKNOWN_FAULT: &str = "💥";

/// Uncaught platform-level error.
pub const PLATFORM: &str = "🛑";

/// The reporting pipeline itself failed (delegate raised or timed out).
pub const INTERNAL_FAILURE: &str = "☠️";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glyph_pairs_are_distinguishable() {
        let pairs = [EVENT, CALL, EXECUTE, STREAM, LOG, WARN];
        let mut seen = Vec::new();
        for pair in pairs {
            assert_ne!(pair.success, pair.failure);
            assert!(!seen.contains(&pair.success));
            assert!(!seen.contains(&pair.failure));
            seen.push(pair.success);
            seen.push(pair.failure);
        }
        assert!(!seen.contains(&INTERNAL_FAILURE));
    }

    #[test]
    fn test_for_status() {
        assert_eq!(CALL.for_status(true), "✅");
        assert_eq!(CALL.for_status(false), "❌");
    }
}
