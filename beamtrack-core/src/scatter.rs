//! Scattering model seam used by collimator jaws.

use std::fmt;

use crate::{CollimatorAperture, Particle, Result, RngHandle};

/// Result of passing a particle through a scattering jaw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScatterOutcome {
    /// The particle was absorbed by the jaw and is lost.
    Absorbed,
    /// The particle left the jaw; its coordinates may have been perturbed.
    Survived,
}

impl ScatterOutcome {
    /// Returns `true` for [`ScatterOutcome::Absorbed`].
    #[must_use]
    pub fn is_absorbed(self) -> bool {
        matches!(self, Self::Absorbed)
    }
}

/// Physics model evaluated for particles that hit a collimator jaw.
///
/// `configure` is called once per jaw before the first `scatter` call on it.
pub trait ScatteringModel: fmt::Debug {
    /// Prepares the model for the given jaw and beam momentum (GeV/c).
    ///
    /// # Errors
    /// Returns an error if the jaw material cannot be used for scattering.
    fn configure(&mut self, reference_momentum: f64, jaw: &CollimatorAperture) -> Result<()>;

    /// Tracks `particle` through `length` metres of jaw material.
    fn scatter(
        &mut self,
        particle: &mut Particle,
        length: f64,
        jaw: &CollimatorAperture,
        reference_momentum: f64,
        rng: &mut RngHandle,
    ) -> ScatterOutcome;
}
