//! Classification of wrapped work.
//!
//! Wrapped work runs inside a fault boundary that turns both returned errors
//! and panics into an explicit [`Outcome`]. The dispatch logic only ever
//! looks at the outcome, never at unwinding.

use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

use futures::FutureExt;

use telltale_record::panic_message;

/// Why a piece of wrapped work failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    /// Description of the failure.
    pub message: String,
    /// The work panicked rather than returning an error.
    pub panicked: bool,
}

impl Fault {
    /// A failure reported through an error value.
    pub fn from_error(error: &impl fmt::Display) -> Self {
        Self {
            message: error.to_string(),
            panicked: false,
        }
    }

    /// A failure caught as a panic.
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        Self {
            message: panic_message(payload).unwrap_or_else(|| "panic".to_string()),
            panicked: true,
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.panicked {
            write!(f, "panicked: {}", self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

/// Result of running wrapped work.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The work completed and produced a value.
    Success(T),
    /// The work failed.
    Failure(Fault),
}

impl<T> Outcome<T> {
    /// Check if the work succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Check if the work failed.
    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    /// The failure, if any.
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(fault) => Some(fault),
        }
    }

    /// The value, or `None` on failure.
    pub fn into_option(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            Outcome::Failure(_) => None,
        }
    }

    /// Split into the value and the fault.
    pub fn into_parts(self) -> (Option<T>, Option<Fault>) {
        match self {
            Outcome::Success(value) => (Some(value), None),
            Outcome::Failure(fault) => (None, Some(fault)),
        }
    }
}

impl<T, E: fmt::Display> From<Result<T, E>> for Outcome<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(e) => Outcome::Failure(Fault::from_error(&e)),
        }
    }
}

/// Run synchronous work inside a fault boundary.
pub fn capture<T, E, F>(work: F) -> Outcome<T>
where
    F: FnOnce() -> Result<T, E>,
    E: fmt::Display,
{
    match panic::catch_unwind(AssertUnwindSafe(work)) {
        Ok(result) => result.into(),
        Err(payload) => Outcome::Failure(Fault::from_panic(payload.as_ref())),
    }
}

/// Await asynchronous work inside a fault boundary.
pub async fn capture_async<T, E, F>(work: F) -> Outcome<T>
where
    F: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    match AssertUnwindSafe(work).catch_unwind().await {
        Ok(result) => result.into(),
        Err(payload) => Outcome::Failure(Fault::from_panic(payload.as_ref())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_success() {
        let outcome = capture(|| Ok::<_, String>(42));
        assert_eq!(outcome, Outcome::Success(42));
    }

    #[test]
    fn test_capture_error() {
        let outcome = capture(|| Err::<(), _>("boom"));
        let fault = outcome.fault().unwrap();
        assert_eq!(fault.message, "boom");
        assert!(!fault.panicked);
    }

    #[test]
    fn test_capture_panic() {
        let outcome: Outcome<()> = capture(|| -> Result<(), String> { panic!("kaboom") });
        let fault = outcome.fault().unwrap();
        assert_eq!(fault.message, "kaboom");
        assert!(fault.panicked);
        assert_eq!(fault.to_string(), "panicked: kaboom");
    }

    #[tokio::test]
    async fn test_capture_async() {
        let outcome = capture_async(async { Ok::<_, String>("v") }).await;
        assert_eq!(outcome.into_option(), Some("v"));

        let outcome = capture_async(async { Err::<u8, _>("late boom") }).await;
        assert_eq!(outcome.into_parts().1.unwrap().message, "late boom");
    }

    #[tokio::test]
    async fn test_capture_async_panic() {
        let outcome = capture_async(async {
            if true {
                panic!("async kaboom");
            }
            Ok::<(), String>(())
        })
        .await;
        assert!(outcome.fault().unwrap().panicked);
    }
}
