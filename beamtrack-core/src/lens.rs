//! Hollow electron lens element parameters.

use crate::units::{lorentz_beta, ELECTRON_MASS_GEV};
use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Direction of the electron beam relative to the circulating beam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ElectronDirection {
    /// Electrons travel against the beam; the electric and magnetic kicks add.
    #[default]
    Counter,
    /// Electrons travel with the beam; the kick is smaller and reversed.
    Co,
}

/// How the lens is switched on from turn to turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OperatingMode {
    /// Kick on every turn.
    #[default]
    Continuous,
    /// Kick modulated at a (possibly stepped) tune.
    Resonant,
    /// Kick on randomly chosen turns.
    Diffusive,
    /// Kick only on every `skip_turn`-th turn.
    PeriodicSkip,
}

/// Measured radial electron density profile used by the radial kick model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RadialProfileVariant {
    /// Tevatron lens: 1.2 A, 2 m, 5 keV.
    #[default]
    Tevatron,
    /// LHC lens design: 5 A, 3 m, 10 keV.
    Lhc,
}

impl RadialProfileVariant {
    /// Breakpoint radii of the measured profile, in the units of the
    /// measurement. The first entry is the inner edge of the hollow beam.
    #[must_use]
    pub fn breakpoints(self) -> [f64; 5] {
        match self {
            Self::Tevatron => [222.5, 252.5, 287.0, 364.5, 426.5],
            Self::Lhc => [222.5, 265.0, 315.0, 435.0, 505.0],
        }
    }
}

/// Radial kick model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum KickModel {
    /// Uniform annulus: quadratic ramp between `rmin` and `rmax`.
    #[default]
    Simple,
    /// Enclosed charge of a measured piecewise-linear profile.
    Radial(RadialProfileVariant),
}

/// Tune modulation parameters for [`OperatingMode::Resonant`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AcParameters {
    /// Central modulation tune.
    pub tune: f64,
    /// Half width of the tune sweep.
    pub delta_tune: f64,
    /// Tune increment per sweep step.
    pub tune_var_per_step: f64,
    /// Turns spent on each sweep step.
    pub turns_per_step: u32,
    /// Phase multiplier.
    pub multiplier: f64,
}

impl AcParameters {
    /// Lower bound of the tune sweep.
    #[must_use]
    pub fn min_tune(&self) -> f64 {
        self.tune - self.delta_tune
    }

    /// Upper bound of the tune sweep.
    #[must_use]
    pub fn max_tune(&self) -> f64 {
        self.tune + self.delta_tune
    }

    /// Returns `true` if the tune is swept rather than fixed.
    #[must_use]
    pub fn is_swept(&self) -> bool {
        self.tune_var_per_step != 0.0 && self.delta_tune != 0.0
    }

    /// Number of discrete tune values in one sweep.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn nstep(&self) -> u64 {
        if !self.is_swept() {
            return 1;
        }
        ((self.max_tune() - self.min_tune()) / self.tune_var_per_step).floor() as u64 + 1
    }

    /// Tune in effect on the given turn.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn operating_tune(&self, turn: u64) -> f64 {
        if !self.is_swept() {
            return self.tune;
        }
        let step = turn / u64::from(self.turns_per_step.max(1));
        self.min_tune() + (step % self.nstep()) as f64 * self.tune_var_per_step
    }
}

/// A hollow electron lens element.
///
/// Radii and offsets are in metres, the current in amperes, the effective
/// length in metres and the rigidity in T·m.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HollowElectronLens {
    /// Electron beam current.
    pub current: f64,
    /// Relativistic beta of the electrons.
    pub electron_beta: f64,
    /// Length over which the electrons interact with the beam.
    pub effective_length: f64,
    /// Magnetic rigidity of the circulating beam.
    pub rigidity: f64,
    /// Inner radius of the hollow electron beam.
    pub rmin: f64,
    /// Outer radius of the hollow electron beam.
    pub rmax: f64,
    /// Horizontal position of the lens axis.
    pub x_offset: f64,
    /// Vertical position of the lens axis.
    pub y_offset: f64,
    /// Electron beam direction.
    pub direction: ElectronDirection,
    /// Operating mode.
    pub mode: OperatingMode,
    /// Kick model.
    pub kick_model: KickModel,
    /// Number of turns between kicks in [`OperatingMode::PeriodicSkip`].
    pub skip_turn: u32,
    /// Horizontal beam size at the lens, used to express radii in sigma.
    pub sigma_x: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    ac: Option<AcParameters>,
}

impl HollowElectronLens {
    /// Creates a continuous, counter-propagating lens with the simple kick model.
    #[must_use]
    pub fn new(current: f64, electron_beta: f64, effective_length: f64, rigidity: f64) -> Self {
        Self {
            current,
            electron_beta,
            effective_length,
            rigidity,
            rmin: 0.0,
            rmax: 0.0,
            x_offset: 0.0,
            y_offset: 0.0,
            direction: ElectronDirection::Counter,
            mode: OperatingMode::Continuous,
            kick_model: KickModel::Simple,
            skip_turn: 0,
            sigma_x: 0.0,
            ac: None,
        }
    }

    /// Sets the electron beta from the gun voltage in kV.
    #[must_use]
    pub fn with_electron_voltage(mut self, kilovolts: f64) -> Self {
        let gamma = 1.0 + kilovolts * 1.0e-6 / ELECTRON_MASS_GEV;
        self.electron_beta = lorentz_beta(gamma);
        self
    }

    /// Sets the inner and outer radii in metres.
    #[must_use]
    pub fn with_radii(mut self, rmin: f64, rmax: f64) -> Self {
        self.rmin = rmin;
        self.rmax = rmax;
        self
    }

    /// Sets the radii in units of the horizontal beam size.
    #[must_use]
    pub fn with_radii_sigma(mut self, rmin_sigma: f64, rmax_sigma: f64, sigma_x: f64) -> Self {
        self.sigma_x = sigma_x;
        self.rmin = rmin_sigma * sigma_x;
        self.rmax = rmax_sigma * sigma_x;
        self
    }

    /// Sets the lens axis position.
    #[must_use]
    pub fn with_offset(mut self, x_offset: f64, y_offset: f64) -> Self {
        self.x_offset = x_offset;
        self.y_offset = y_offset;
        self
    }

    /// Sets the electron beam direction.
    #[must_use]
    pub fn with_direction(mut self, direction: ElectronDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Sets the operating mode.
    #[must_use]
    pub fn with_mode(mut self, mode: OperatingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the kick model.
    #[must_use]
    pub fn with_kick_model(mut self, kick_model: KickModel) -> Self {
        self.kick_model = kick_model;
        self
    }

    /// Sets the skip count for periodic operation.
    #[must_use]
    pub fn with_skip_turn(mut self, skip_turn: u32) -> Self {
        self.skip_turn = skip_turn;
        self
    }

    /// Configures tune modulation and marks the lens as AC configured.
    pub fn set_ac(
        &mut self,
        tune: f64,
        delta_tune: f64,
        tune_var_per_step: f64,
        turns_per_step: u32,
        multiplier: f64,
    ) {
        self.ac = Some(AcParameters {
            tune,
            delta_tune,
            tune_var_per_step,
            turns_per_step,
            multiplier,
        });
    }

    /// Tune modulation parameters, if configured.
    #[must_use]
    pub fn ac(&self) -> Option<&AcParameters> {
        self.ac.as_ref()
    }

    /// Returns `true` once [`HollowElectronLens::set_ac`] has been called.
    #[must_use]
    pub fn is_ac_configured(&self) -> bool {
        self.ac.is_some()
    }

    /// Checks the radii and beam parameters.
    ///
    /// # Errors
    /// Returns [`Error::InvalidGeometry`] unless `0 < rmin < rmax`, and
    /// [`Error::InvalidConfig`] for a non-positive electron beta or rigidity.
    pub fn validate(&self) -> Result<()> {
        if !(self.rmin > 0.0 && self.rmin < self.rmax) {
            return Err(Error::InvalidGeometry(format!(
                "hollow electron lens radii must satisfy 0 < rmin < rmax (rmin={}, rmax={})",
                self.rmin, self.rmax
            )));
        }
        if self.electron_beta <= 0.0 || self.rigidity <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "electron beta and rigidity must be positive (beta={}, rigidity={})",
                self.electron_beta, self.rigidity
            )));
        }
        Ok(())
    }
}
