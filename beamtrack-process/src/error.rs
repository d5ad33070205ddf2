//! Process error types.

use thiserror::Error;

/// Result type for process operations.
pub type Result<T> = std::result::Result<T, ProcessError>;

/// Errors raised while tracking.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// Cumulative losses reached the configured fraction of the initial bunch.
    #[error(
        "particle loss threshold of {}% exceeded ({lost}/{initial}) at {component}",
        .threshold * 100.0
    )]
    ExcessiveParticleLoss {
        /// Qualified name of the element where the threshold was reached.
        component: String,
        /// Threshold as a fraction of the initial bunch size.
        threshold: f64,
        /// Particles lost since initialisation.
        lost: usize,
        /// Bunch size at initialisation.
        initial: usize,
    },

    /// Invalid process configuration.
    #[error("configuration error: {0}")]
    InvalidConfig(String),

    /// Output error.
    #[error("output error: {0}")]
    Io(#[from] beamtrack_io::Error),

    /// Core library error.
    #[error("core error: {0}")]
    Core(#[from] beamtrack_core::Error),
}
