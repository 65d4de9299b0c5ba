//! Generator error types.

use thiserror::Error;

/// Result type for event generation.
pub type Result<T> = std::result::Result<T, Error>;

/// Event generation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Particle counts and primary vertices are not paired up.
    #[error("{particles} particle counts but {vertices} primary vertices")]
    VertexCountMismatch {
        /// Number of particle-count entries.
        particles: usize,
        /// Number of primary vertices.
        vertices: usize,
    },

    /// A generator parameter is out of range.
    #[error("invalid generator parameter: {0}")]
    InvalidParameter(String),
}
