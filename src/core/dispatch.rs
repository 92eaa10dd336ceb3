//! Isolated listener invocation shared by the event bus and the state store
//!
//! A listener that returns an error or panics is reported here and never
//! unwinds into the code that triggered the dispatch.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::warn;

use crate::error::SheetbookError;

/// Outcome of one publish / notification cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Listeners that were called
    pub invoked: usize,
    /// Listeners that returned an error or panicked
    pub failed: usize,
}

impl DispatchReport {
    pub(crate) fn record(&mut self, outcome: Result<(), SheetbookError>) {
        self.invoked += 1;
        if outcome.is_err() {
            self.failed += 1;
        }
    }

    pub(crate) fn merge(&mut self, other: DispatchReport) {
        self.invoked += other.invoked;
        self.failed += other.failed;
    }
}

/// Run one listener, converting errors and panics into a logged `Handler` error
pub(crate) fn invoke_isolated<F>(topic: &str, listener: F) -> Result<(), SheetbookError>
where
    F: FnOnce() -> anyhow::Result<()>,
{
    let message = match catch_unwind(AssertUnwindSafe(listener)) {
        Ok(Ok(())) => return Ok(()),
        Ok(Err(err)) => format!("{:#}", err),
        Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
    };

    warn!(topic = topic, error = %message, "Listener failed; continuing dispatch");
    Err(SheetbookError::Handler {
        topic: topic.to_string(),
        message,
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_listener() {
        assert!(invoke_isolated("t", || Ok(())).is_ok());
    }

    #[test]
    fn test_error_becomes_handler_error() {
        let err = invoke_isolated("t", || Err(anyhow::anyhow!("boom"))).unwrap_err();
        assert_eq!(err.to_string(), "Handler error on 't': boom");
    }

    #[test]
    fn test_panic_is_caught() {
        let err = invoke_isolated("t", || panic!("kaput")).unwrap_err();
        assert!(err.to_string().contains("panicked: kaput"));
    }

    #[test]
    fn test_report_counts() {
        let mut report = DispatchReport::default();
        report.record(Ok(()));
        report.record(Err(SheetbookError::Validation("x".into())));
        assert_eq!(report, DispatchReport { invoked: 2, failed: 1 });
    }
}
