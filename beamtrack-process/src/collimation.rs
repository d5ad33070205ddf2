//! Aperture collimation: removes particles outside element apertures.

use std::fmt;
use std::io::Write;

use beamtrack_core::{Bunch, Component, ParticleIndex, ScatterOutcome, SharedIndex};
use beamtrack_io::{BinnedLossWriter, LossFileWriter, LossHistogram, LossRecord};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::stepping::{BunchProcess, CollimationStages, StepContext, StepState};
use crate::{ProcessError, Result};

/// Configuration for [`CollimationProcess`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CollimationConfig {
    /// Stages at which hard-edge apertures are checked.
    pub stages: CollimationStages,
    /// Cumulative loss, in percent of the initial bunch, that aborts the run.
    pub loss_threshold_percent: f64,
    /// Width of the loss report bins in metres.
    pub bin_width: f64,
    /// Use the bunch scattering model on scatter-capable elements.
    pub scatter: bool,
    /// Enable collimator jaw imperfections.
    pub imperfections: bool,
    /// Write one `.loss` file per loss event.
    pub loss_files: bool,
    /// Prefix of `.loss` file names.
    pub file_prefix: String,
    /// Process priority.
    pub priority: i32,
}

impl Default for CollimationConfig {
    fn default() -> Self {
        Self {
            stages: CollimationStages::ALL,
            loss_threshold_percent: 100.0,
            bin_width: 0.1,
            scatter: false,
            imperfections: false,
            loss_files: false,
            file_prefix: String::new(),
            priority: 0,
        }
    }
}

impl CollimationConfig {
    /// Sets the stages at which apertures are checked.
    #[must_use]
    pub fn with_stages(mut self, stages: CollimationStages) -> Self {
        self.stages = stages;
        self
    }

    /// Sets the fatal loss threshold in percent.
    #[must_use]
    pub fn with_loss_threshold(mut self, percent: f64) -> Self {
        self.loss_threshold_percent = percent;
        self
    }

    /// Sets the report bin width.
    #[must_use]
    pub fn with_bin_width(mut self, width: f64) -> Self {
        self.bin_width = width;
        self
    }

    /// Enables jaw scattering.
    #[must_use]
    pub fn with_scatter(mut self, scatter: bool) -> Self {
        self.scatter = scatter;
        self
    }

    /// Enables jaw imperfections.
    #[must_use]
    pub fn with_imperfections(mut self, imperfections: bool) -> Self {
        self.imperfections = imperfections;
        self
    }

    /// Enables per-event loss files with the given name prefix.
    #[must_use]
    pub fn with_loss_files(mut self, prefix: impl Into<String>) -> Self {
        self.loss_files = true;
        self.file_prefix = prefix.into();
        self
    }

    /// Sets the process priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Loss threshold as a fraction.
    #[must_use]
    pub fn loss_threshold(&self) -> f64 {
        self.loss_threshold_percent / 100.0
    }

    /// Checks the configuration.
    ///
    /// # Errors
    /// Returns [`ProcessError::InvalidConfig`] for a non-positive bin width or
    /// a negative threshold.
    pub fn validate(&self) -> Result<()> {
        if !(self.bin_width.is_finite() && self.bin_width > 0.0) {
            return Err(ProcessError::InvalidConfig(format!(
                "bin width must be positive, got {}",
                self.bin_width
            )));
        }
        if self.loss_threshold_percent.is_nan() || self.loss_threshold_percent < 0.0 {
            return Err(ProcessError::InvalidConfig(format!(
                "loss threshold must be non-negative, got {}%",
                self.loss_threshold_percent
            )));
        }
        Ok(())
    }
}

/// Removes particles that fall outside the aperture of each element.
///
/// On elements whose aperture is a scattering jaw, and with scattering
/// enabled, the aperture is checked once at the exit and particles outside
/// it are handed to the bunch scattering model. Elsewhere particles outside
/// the aperture are removed at each configured stage.
pub struct CollimationProcess {
    config: CollimationConfig,
    state: StepState,
    report: Option<BinnedLossWriter<Box<dyn Write>>>,
    loss_files: LossFileWriter,
    index: Option<ParticleIndex>,
    index_pending: bool,
    initialised: bool,
    scatter_here: bool,
    nstart: usize,
    nlost: usize,
}

impl CollimationProcess {
    /// Creates a collimation process.
    ///
    /// # Errors
    /// Returns [`ProcessError::InvalidConfig`] if the configuration does not
    /// validate.
    pub fn new(config: CollimationConfig) -> Result<Self> {
        config.validate()?;
        let loss_files = LossFileWriter::new(config.file_prefix.clone());
        Ok(Self {
            config,
            state: StepState::default(),
            report: None,
            loss_files,
            index: None,
            index_pending: false,
            initialised: false,
            scatter_here: false,
            nstart: 0,
            nlost: 0,
        })
    }

    /// Sends the binned loss report to `sink`.
    #[must_use]
    pub fn with_report_sink(mut self, sink: Box<dyn Write>) -> Self {
        self.report = Some(BinnedLossWriter::new(sink));
        self
    }

    /// Turns process-owned particle indexing on or off.
    ///
    /// Enabled after [`BunchProcess::initialise`], the list starts from the
    /// bunch order at the next element.
    pub fn index_particles(&mut self, enable: bool) {
        match (enable, &self.index) {
            (true, None) => {
                self.index = Some(ParticleIndex::owned());
                self.index_pending = self.initialised;
            }
            (false, _) => {
                self.index = None;
                self.index_pending = false;
            }
            (true, Some(_)) => {}
        }
    }

    /// Tracks original particle ordinals in caller-owned storage.
    pub fn index_particles_shared(&mut self, storage: SharedIndex) {
        self.index = Some(ParticleIndex::shared(storage));
        self.index_pending = self.initialised;
    }

    /// The index list, if indexing is enabled.
    #[must_use]
    pub fn particle_index(&self) -> Option<&ParticleIndex> {
        self.index.as_ref()
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &CollimationConfig {
        &self.config
    }

    /// Particles lost since initialisation.
    #[must_use]
    pub fn losses(&self) -> usize {
        self.nlost
    }

    /// Bunch size at initialisation.
    #[must_use]
    pub fn initial_size(&self) -> usize {
        self.nstart
    }

    /// Report bin width.
    #[must_use]
    pub fn bin_width(&self) -> f64 {
        self.config.bin_width
    }

    fn collimate(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        let s = self.state.s();
        let component = &*ctx.component;
        let Some(aperture) = component.aperture() else {
            return Ok(());
        };
        let mut jaw = if self.scatter_here {
            aperture.collimator()
        } else {
            None
        };
        let length = component.length();
        if let Some(index) = self.index.as_ref() {
            if index.len() != ctx.bunch.len() {
                return Err(beamtrack_core::Error::IndexMismatch {
                    index: index.len(),
                    bunch: ctx.bunch.len(),
                }
                .into());
            }
        }

        let particles = ctx.bunch.take_particles();
        let mut keep = Vec::with_capacity(particles.len());
        let mut survivors = Vec::with_capacity(particles.len());
        let mut lost = Vec::new();
        for mut particle in particles {
            let survives = if aperture.point_inside(particle.x(), particle.y(), s) {
                true
            } else if let Some(collimator) = jaw {
                match ctx.bunch.scatter(&mut particle, length, collimator, ctx.rng) {
                    Ok(outcome) => outcome == ScatterOutcome::Survived,
                    Err(err) => {
                        log::warn!("scattering disabled at {}: {err}", component.qualified_name());
                        jaw = None;
                        false
                    }
                }
            } else {
                false
            };
            keep.push(survives);
            if survives {
                survivors.push(particle);
            } else {
                lost.push(particle);
            }
        }
        ctx.bunch.replace_particles(survivors);
        self.nlost += lost.len();

        let records: Vec<LossRecord> = match self.index.as_mut() {
            Some(index) => {
                let removed = index.retain_mask(&keep)?;
                lost.into_iter()
                    .zip(removed)
                    .map(|(particle, ordinal)| LossRecord::new(particle, Some(ordinal)))
                    .collect()
            }
            None => lost
                .into_iter()
                .map(|particle| LossRecord::new(particle, None))
                .collect(),
        };

        if !records.is_empty() {
            log::debug!(
                "{} particles lost at {} (s = {s}), {} remain",
                records.len(),
                component.qualified_name(),
                ctx.bunch.len()
            );
        }
        self.output(component, &records)?;
        self.check_threshold(component)
    }

    fn output(&mut self, component: &Component, records: &[LossRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let name = component.qualified_name();
        if let Some(report) = self.report.as_mut() {
            let mut histogram = LossHistogram::new(component.length(), self.config.bin_width)?;
            for record in records {
                histogram.record(record.particle.ct());
            }
            report.write_histogram(&name, component.position(), &histogram)?;
        }
        if self.config.loss_files {
            self.loss_files.write(&name, records)?;
        }
        Ok(())
    }

    #[allow(clippy::cast_precision_loss)]
    fn check_threshold(&self, component: &Component) -> Result<()> {
        if self.nstart == 0 {
            return Ok(());
        }
        let threshold = self.config.loss_threshold();
        if self.nlost as f64 / self.nstart as f64 >= threshold {
            return Err(ProcessError::ExcessiveParticleLoss {
                component: component.qualified_name(),
                threshold,
                lost: self.nlost,
                initial: self.nstart,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for CollimationProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollimationProcess")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("index", &self.index)
            .field("nstart", &self.nstart)
            .field("nlost", &self.nlost)
            .finish_non_exhaustive()
    }
}

impl BunchProcess for CollimationProcess {
    fn name(&self) -> &str {
        "PARTICLE COLLIMATION"
    }

    fn priority(&self) -> i32 {
        self.config.priority
    }

    fn initialise(&mut self, bunch: &mut Bunch) {
        self.initialised = true;
        self.state.reset_total();
        self.loss_files.reset_sequence();
        self.nstart = bunch.len();
        self.nlost = 0;
        self.index_pending = false;
        if let Some(index) = self.index.as_mut() {
            index.reset(self.nstart);
        }
    }

    fn set_current_component(&mut self, component: &mut Component, bunch: &mut Bunch) {
        if self.index_pending {
            if let Some(index) = self.index.as_mut() {
                index.reset(bunch.len());
            }
            self.index_pending = false;
        }
        let length = component.length();
        if !self.initialised || component.aperture().is_none() {
            self.scatter_here = false;
            self.state.skip(length);
            return;
        }

        self.scatter_here = self.config.scatter && component.is_scatter_capable();
        if self.scatter_here {
            let checked = component
                .aperture()
                .and_then(|aperture| aperture.collimator())
                .map(|jaw| jaw.material().validate());
            if let Some(Err(err)) = checked {
                log::warn!(
                    "{} falls back to hard-edge collimation: {err}",
                    component.qualified_name()
                );
                self.scatter_here = false;
            }
        }
        if self.scatter_here {
            self.state.arm(length, CollimationStages::AT_EXIT);
            bunch.set_scatter_configured(false);
            if self.config.imperfections {
                if let Some(jaw) = component
                    .aperture_mut()
                    .and_then(|aperture| aperture.collimator_mut())
                {
                    jaw.set_jaw_length(length);
                    jaw.enable_errors(true);
                }
            }
        } else {
            self.state.arm(length, self.config.stages);
        }
    }

    fn do_process(&mut self, ds: f64, ctx: &mut StepContext<'_>) -> Result<()> {
        if self.state.advance(ds) {
            self.collimate(ctx)?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use beamtrack_core::{Particle, RectangularAperture, RngHandle};

    fn bunch_at(xs: &[f64]) -> Bunch {
        Bunch::from_particles(7000.0, 1.0, xs.iter().map(|&x| Particle::at(x, 0.0)).collect())
    }

    fn fire(
        process: &mut CollimationProcess,
        component: &mut Component,
        bunch: &mut Bunch,
    ) -> Result<()> {
        let mut rng = RngHandle::from_seed(0);
        process.set_current_component(component, bunch);
        while process.is_active() {
            let ds = process.max_allowed_step();
            let mut ctx = StepContext {
                component: &mut *component,
                bunch: &mut *bunch,
                rng: &mut rng,
            };
            process.do_process(ds, &mut ctx)?;
        }
        Ok(())
    }

    #[test]
    fn test_losses_and_order() {
        let mut bunch = bunch_at(&[0.0, 0.02, 0.001, -0.03, 0.002]);
        let mut process = CollimationProcess::new(CollimationConfig::default()).unwrap();
        process.index_particles(true);
        process.initialise(&mut bunch);

        let mut magnet = Component::drift("D", 1.0)
            .with_aperture(Box::new(RectangularAperture::new(0.02, 0.02)));
        fire(&mut process, &mut magnet, &mut bunch).unwrap();

        assert_eq!(process.losses(), 2);
        assert_eq!(process.losses() + bunch.len(), process.initial_size());
        let xs: Vec<f64> = bunch.iter().map(Particle::x).collect();
        assert_eq!(xs, vec![0.0, 0.001, 0.002]);
        assert_eq!(process.particle_index().unwrap().to_vec(), vec![0, 2, 4]);
        assert!((process.total_length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_aperture_is_inactive() {
        let mut bunch = bunch_at(&[1.0]);
        let mut process = CollimationProcess::new(CollimationConfig::default()).unwrap();
        process.initialise(&mut bunch);
        let mut drift = Component::drift("D", 2.5);
        process.set_current_component(&mut drift, &mut bunch);
        assert!(!process.is_active());
        assert!((process.total_length() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_uninitialised_is_inactive() {
        let mut bunch = bunch_at(&[1.0]);
        let mut process = CollimationProcess::new(CollimationConfig::default()).unwrap();
        let mut c = Component::drift("D", 1.0)
            .with_aperture(Box::new(RectangularAperture::new(0.02, 0.02)));
        process.set_current_component(&mut c, &mut bunch);
        assert!(!process.is_active());
    }

    #[test]
    fn test_threshold_error_message() {
        let mut bunch = bunch_at(&[0.5, 0.0]);
        let config = CollimationConfig::default().with_loss_threshold(50.0);
        let mut process = CollimationProcess::new(config).unwrap();
        process.initialise(&mut bunch);
        let mut c = Component::drift("TCP", 1.0)
            .with_aperture(Box::new(RectangularAperture::new(0.02, 0.02)));
        let err = fire(&mut process, &mut c, &mut bunch).unwrap_err();
        assert_eq!(
            err.to_string(),
            "particle loss threshold of 50% exceeded (1/2) at Drift.TCP"
        );
    }

    #[test]
    fn test_config_validation() {
        assert!(CollimationConfig::default().validate().is_ok());
        assert!(CollimationConfig::default().with_bin_width(0.0).validate().is_err());
        assert!(CollimationConfig::default()
            .with_loss_threshold(-1.0)
            .validate()
            .is_err());
        let cfg = CollimationConfig::default().with_loss_files("out/");
        assert!(cfg.loss_files);
        assert!((cfg.loss_threshold() - 1.0).abs() < 1e-15);
    }
}
