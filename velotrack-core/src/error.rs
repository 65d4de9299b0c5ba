//! Error types for velotrack-core.

use thiserror::Error;

/// Result type alias for velotrack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for velotrack operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Reconciliation error.
    #[error("reconciliation error: {0}")]
    ReconcileError(#[from] ReconcileError),
}

/// Errors raised while reconciling a solved activation vector.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// The solution vector does not line up with the decision segments.
    #[error("solution has {solution} entries but there are {segments} decision segments")]
    LengthMismatch { segments: usize, solution: usize },

    /// A solution entry is NaN or infinite.
    #[error("solution entry {0} is not finite")]
    NonFinite(usize),
}
