//! Error types for beamtrack-core.

use thiserror::Error;

/// Result type alias for beamtrack-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for beamtrack operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    InvalidConfig(String),

    /// Invalid element or aperture geometry.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Material with a zero or negative interaction cross section.
    #[error("material has no interaction length (A={a}, density={density})")]
    DegenerateMaterial { a: f64, density: f64 },

    /// Index list and bunch have drifted apart.
    #[error("particle index holds {index} entries but the bunch has {bunch}")]
    IndexMismatch { index: usize, bunch: usize },
}
