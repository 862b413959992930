//! Error types for the query lifecycle

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced through the coordinator's lifecycle
///
/// These are recorded as state, never thrown out of the public surface.
/// Whether an error blocks the UI is decided by the visual derivation, not by
/// inspecting the error itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Opaque failure reported by the external source
    #[error("source error: {message}")]
    Source { message: String },

    /// No data or error arrived within the initial load window
    #[error("initial load timed out after {after:?}")]
    Timeout { after: Duration },
}

impl QueryError {
    /// Wrap a source-reported failure
    pub fn source(message: impl Into<String>) -> Self {
        QueryError::Source {
            message: message.into(),
        }
    }

    /// Check if this error came from the source
    pub fn is_source(&self) -> bool {
        matches!(self, QueryError::Source { .. })
    }

    /// Check if this is an initial-load timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, QueryError::Timeout { .. })
    }
}
