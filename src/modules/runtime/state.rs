//! Connector state shared by both operators

use dbconnector_core::Result;
use std::fmt;

/// Result of closing a connector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// A live connection was released
    Closed,
    /// Nothing to release; the connector was not open
    AlreadyClosed,
}

impl fmt::Display for CloseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseOutcome::Closed => write!(f, "closed"),
            CloseOutcome::AlreadyClosed => write!(f, "already closed"),
        }
    }
}

/// Report a failed operation on the diagnostic channel before returning it
pub(crate) trait Reported {
    fn reported(self, operation: &str) -> Self;
}

impl<T> Reported for Result<T> {
    fn reported(self, operation: &str) -> Self {
        if let Err(err) = &self {
            err.report(operation);
        }
        self
    }
}
