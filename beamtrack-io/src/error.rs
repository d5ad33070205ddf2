//! I/O error types.

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid output parameters.
    #[error("invalid output configuration: {0}")]
    InvalidConfig(String),

    /// Core library error.
    #[error("core error: {0}")]
    Core(#[from] beamtrack_core::Error),
}
