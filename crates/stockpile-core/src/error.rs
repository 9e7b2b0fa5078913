//! Error types and result aliases for Stockpile.
//!
//! This module defines the shared error types used across both engines.
//! The taxonomy separates transient transport failures (retry-safe) from
//! permission failures (distinct condition, same engine treatment) and
//! genuine caller mistakes.

/// The result type used throughout stockpile-core.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in store and engine operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transient network or backend failure on a single operation.
    ///
    /// The operation that produced this error did not mutate engine state,
    /// so the caller may retry it without further cleanup.
    #[error("transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The backend rejected the operation for lack of authorization.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The requested document or collection was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid input was provided (malformed path, oversized batch, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a new transport error with the given message.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new transport error with a source cause.
    #[must_use]
    pub fn transport_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if the error is worth retrying unchanged.
    ///
    /// Transport failures are transient; everything else requires the
    /// caller to change something before trying again.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn transport_preserves_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = Error::transport_with_source("fetch failed", io);
        assert!(err.source().is_some());
        assert!(err.is_transient());
    }

    #[test]
    fn permission_denied_is_not_transient() {
        let err = Error::PermissionDenied("no read access".into());
        assert!(!err.is_transient());
        assert_eq!(err.to_string(), "permission denied: no read access");
    }

    #[test]
    fn display_includes_message() {
        let err = Error::InvalidInput("bad path".into());
        assert_eq!(err.to_string(), "invalid input: bad path");
    }
}
