//! Error types for the sync and deletion engines.

/// The result type used throughout stockpile-sync.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in engine operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The session has been ended; no further operations are accepted.
    #[error("session closed")]
    SessionClosed,

    /// The engine configuration failed validation.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// An error from stockpile-core (store, path, or document layer).
    #[error("core error: {0}")]
    Core(#[from] stockpile_core::Error),
}

impl Error {
    /// Returns true if the error is worth retrying unchanged.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Core(core) => core.is_transient(),
            Self::SessionClosed | Self::InvalidConfig(_) => false,
        }
    }
}
