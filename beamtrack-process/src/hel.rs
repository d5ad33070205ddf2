//! Hollow electron lens process.

use std::f64::consts::PI;
use std::io::Write;

use beamtrack_core::units::{lorentz_beta, lorentz_gamma, PROTON_MASS_GEV};
use beamtrack_core::{
    Bunch, Component, HollowElectronLens, KickModel, OperatingMode, RadialProfileVariant,
    RngHandle,
};
use beamtrack_io::ProfileWriter;

use crate::kick::LensKick;
use crate::stepping::{BunchProcess, CollimationStages, StepContext, StepState};
use crate::{ProcessError, Result};

/// Number of intervals the profile range is divided into; one row is written
/// per interval start except the last.
const PROFILE_POINTS: u32 = 1000;

/// Skip count used when a periodic lens has none configured.
const DEFAULT_SKIP_TURN: u32 = 2;

/// Applies hollow electron lens kicks once per pass through each lens.
///
/// The process counts turns itself: every pass through a lens element
/// increments the counter by one, so it must see each lens once per turn.
#[derive(Debug)]
pub struct HollowElectronLensProcess {
    priority: i32,
    state: StepState,
    initialised: bool,
    proton_beta: f64,
    turn: u64,
    ac_warned: bool,
    skip_warned: bool,
    invalid_warned: bool,
}

impl Default for HollowElectronLensProcess {
    fn default() -> Self {
        Self::new(0)
    }
}

impl HollowElectronLensProcess {
    /// Creates the process with the given priority.
    #[must_use]
    pub fn new(priority: i32) -> Self {
        Self {
            priority,
            state: StepState::default(),
            initialised: false,
            proton_beta: 0.0,
            turn: 0,
            ac_warned: false,
            skip_warned: false,
            invalid_warned: false,
        }
    }

    /// Passes completed through lens elements.
    #[must_use]
    pub fn turn(&self) -> u64 {
        self.turn
    }

    /// Relativistic beta of the beam, 0 until first computed.
    #[must_use]
    pub fn proton_beta(&self) -> f64 {
        self.proton_beta
    }

    fn update_beta(&mut self, reference_momentum: f64) {
        self.proton_beta = lorentz_beta(lorentz_gamma(reference_momentum, PROTON_MASS_GEV));
    }

    /// Kick scale for the current turn, or `None` if the lens is off.
    #[allow(clippy::cast_precision_loss)]
    fn turn_scale(&mut self, lens: &HollowElectronLens, rng: &mut RngHandle) -> Option<f64> {
        match lens.mode {
            OperatingMode::Continuous => Some(1.0),
            OperatingMode::Resonant => {
                let Some(ac) = lens.ac() else {
                    if !self.ac_warned {
                        log::warn!("hollow electron lens in resonant mode without AC parameters");
                        self.ac_warned = true;
                    }
                    return None;
                };
                let tune = ac.operating_tune(self.turn);
                let phi = ac.multiplier * (self.turn as f64 * tune * 2.0 * PI);
                Some(0.5 * (1.0 + phi.cos()))
            }
            OperatingMode::Diffusive => (rng.uniform(-1.0, 1.0) >= 0.0).then_some(1.0),
            OperatingMode::PeriodicSkip => {
                let skip = if lens.skip_turn == 0 {
                    if !self.skip_warned {
                        log::warn!(
                            "hollow electron lens skip turn not set, using {DEFAULT_SKIP_TURN}"
                        );
                        self.skip_warned = true;
                    }
                    DEFAULT_SKIP_TURN
                } else {
                    lens.skip_turn
                };
                (self.turn % u64::from(skip) == 0).then_some(1.0)
            }
        }
    }

    fn kick_bunch(&mut self, ctx: &mut StepContext<'_>) {
        let Some(lens) = ctx.component.hollow_electron_lens() else {
            return;
        };
        if self.proton_beta == 0.0 {
            self.update_beta(ctx.bunch.reference_momentum());
        }
        self.turn += 1;

        let Some(scale) = self.turn_scale(lens, ctx.rng) else {
            return;
        };
        let kick = LensKick::new(lens, self.proton_beta);
        for particle in ctx.bunch.iter_mut() {
            kick.apply(particle, scale);
        }
        log::trace!("lens kick on turn {} with scale {scale}", self.turn);
    }

    /// Tabulates both kick models for `lens` for a beam of the given
    /// momentum.
    ///
    /// `min_sigma` and `max_sigma` bound the radius in units of the lens's
    /// `sigma_x`; the first column is written in the same units. The radial
    /// column uses the lens's profile variant, or the Tevatron profile when
    /// the lens uses the simple model.
    ///
    /// # Errors
    /// Returns [`ProcessError::InvalidConfig`] if the lens has no positive
    /// `sigma_x`, or an output error if writing fails.
    pub fn output_profile<W: Write>(
        lens: &HollowElectronLens,
        momentum: f64,
        min_sigma: f64,
        max_sigma: f64,
        out: W,
    ) -> Result<W> {
        if !(lens.sigma_x.is_finite() && lens.sigma_x > 0.0) {
            return Err(ProcessError::InvalidConfig(format!(
                "lens profile needs a positive sigma_x, got {}",
                lens.sigma_x
            )));
        }
        log::info!(
            "lens profile: rmin = {} ({} sigma), rmax = {} ({} sigma)",
            lens.rmin,
            lens.rmin / lens.sigma_x,
            lens.rmax,
            lens.rmax / lens.sigma_x
        );
        let beta = lorentz_beta(lorentz_gamma(momentum, PROTON_MASS_GEV));
        let kick = LensKick::new(lens, beta);
        let variant = match lens.kick_model {
            KickModel::Radial(variant) => variant,
            KickModel::Simple => RadialProfileVariant::Tevatron,
        };
        let step = (max_sigma - min_sigma) / f64::from(PROFILE_POINTS);
        let mut writer = ProfileWriter::new(out);
        for i in 0..PROFILE_POINTS - 1 {
            let r_sigma = min_sigma + f64::from(i) * step;
            let r = r_sigma * lens.sigma_x;
            writer.write_row(r_sigma, kick.radial(r, variant), kick.simple(r))?;
        }
        writer.finish().map_err(Into::into)
    }
}

impl BunchProcess for HollowElectronLensProcess {
    fn name(&self) -> &str {
        "HOLLOW ELECTRON LENS"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn initialise(&mut self, _bunch: &mut Bunch) {
        self.initialised = true;
        self.state.reset_total();
    }

    fn set_current_component(&mut self, component: &mut Component, bunch: &mut Bunch) {
        let usable = match component.hollow_electron_lens() {
            Some(lens) => match lens.validate() {
                Ok(()) => true,
                Err(err) => {
                    if !self.invalid_warned {
                        log::warn!("skipping {}: {err}", component.qualified_name());
                        self.invalid_warned = true;
                    }
                    false
                }
            },
            None => false,
        };
        if self.initialised && usable {
            self.update_beta(bunch.reference_momentum());
            self.state.arm(component.length(), CollimationStages::AT_EXIT);
        } else {
            self.state.skip(component.length());
        }
    }

    fn do_process(&mut self, ds: f64, ctx: &mut StepContext<'_>) -> Result<()> {
        if self.state.advance(ds) {
            self.kick_bunch(ctx);
            self.state.finish_trigger();
        }
        Ok(())
    }

    fn max_allowed_step(&self) -> f64 {
        self.state.max_allowed_step()
    }

    fn is_active(&self) -> bool {
        self.state.is_active()
    }

    fn total_length(&self) -> f64 {
        self.state.total_length()
    }
}
