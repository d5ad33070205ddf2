//! Particle bunch and the optional original-index list.

use std::cell::RefCell;
use std::rc::Rc;

use crate::{
    CollimatorAperture, Error, Particle, Result, RngHandle, ScatterOutcome, ScatteringModel,
};

/// Caller-owned index storage shared with a process.
pub type SharedIndex = Rc<RefCell<Vec<usize>>>;

/// Original ordinals of the particles currently in a bunch.
///
/// Entry `i` names the position particle `i` had when the list was reset.
/// The list is filtered with the same mask as the bunch so both always have
/// the same length.
#[derive(Debug, Clone)]
pub enum ParticleIndex {
    /// Storage allocated and owned by the process.
    Owned(Vec<usize>),
    /// Storage owned by the caller and mutated in place.
    Shared(SharedIndex),
}

impl Default for ParticleIndex {
    fn default() -> Self {
        Self::Owned(Vec::new())
    }
}

impl ParticleIndex {
    /// Creates an empty owned list.
    #[must_use]
    pub fn owned() -> Self {
        Self::default()
    }

    /// Wraps caller-owned storage.
    #[must_use]
    pub fn shared(storage: SharedIndex) -> Self {
        Self::Shared(storage)
    }

    /// Resets the list to the identity order `[0, n)`.
    pub fn reset(&mut self, n: usize) {
        match self {
            Self::Owned(v) => reset_identity(v, n),
            Self::Shared(rc) => reset_identity(&mut rc.borrow_mut(), n),
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Owned(v) => v.len(),
            Self::Shared(rc) => rc.borrow().len(),
        }
    }

    /// Returns `true` if the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Original ordinal of the particle now at position `i`.
    #[must_use]
    pub fn get(&self, i: usize) -> Option<usize> {
        match self {
            Self::Owned(v) => v.get(i).copied(),
            Self::Shared(rc) => rc.borrow().get(i).copied(),
        }
    }

    /// Copies the current entries.
    #[must_use]
    pub fn to_vec(&self) -> Vec<usize> {
        match self {
            Self::Owned(v) => v.clone(),
            Self::Shared(rc) => rc.borrow().clone(),
        }
    }

    /// Keeps entries whose mask value is `true` and returns the removed ones
    /// in their original order.
    ///
    /// # Errors
    /// Returns [`Error::IndexMismatch`] and leaves the list untouched if the
    /// mask length differs from the list length.
    pub fn retain_mask(&mut self, keep: &[bool]) -> Result<Vec<usize>> {
        let len = self.len();
        if len != keep.len() {
            return Err(Error::IndexMismatch {
                index: len,
                bunch: keep.len(),
            });
        }
        Ok(match self {
            Self::Owned(v) => retain_by_mask(v, keep),
            Self::Shared(rc) => retain_by_mask(&mut rc.borrow_mut(), keep),
        })
    }
}

fn reset_identity(v: &mut Vec<usize>, n: usize) {
    v.clear();
    v.extend(0..n);
}

fn retain_by_mask(v: &mut Vec<usize>, keep: &[bool]) -> Vec<usize> {
    let mut removed = Vec::new();
    let mut kept = Vec::with_capacity(v.len());
    for (&ordinal, &k) in v.iter().zip(keep) {
        if k {
            kept.push(ordinal);
        } else {
            removed.push(ordinal);
        }
    }
    *v = kept;
    removed
}

/// An ordered collection of particles with beam-level scalars.
///
/// Particle order is significant: an external [`ParticleIndex`] may track it.
#[derive(Debug, Default)]
pub struct Bunch {
    particles: Vec<Particle>,
    reference_momentum: f64,
    charge_per_particle: f64,
    scatter_configured: bool,
    scattering: Option<Box<dyn ScatteringModel>>,
}

impl Bunch {
    /// Creates an empty bunch with the given reference momentum (GeV/c) and
    /// macro-particle charge.
    #[must_use]
    pub fn new(reference_momentum: f64, charge_per_particle: f64) -> Self {
        Self {
            reference_momentum,
            charge_per_particle,
            ..Self::default()
        }
    }

    /// Creates a bunch holding `particles`.
    #[must_use]
    pub fn from_particles(
        reference_momentum: f64,
        charge_per_particle: f64,
        particles: Vec<Particle>,
    ) -> Self {
        Self {
            particles,
            ..Self::new(reference_momentum, charge_per_particle)
        }
    }

    /// Installs the model used for particles that hit a scattering jaw.
    #[must_use]
    pub fn with_scattering_model(mut self, model: Box<dyn ScatteringModel>) -> Self {
        self.scattering = Some(model);
        self
    }

    /// Number of particles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// Returns `true` if the bunch holds no particles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Appends a particle.
    pub fn push(&mut self, particle: Particle) {
        self.particles.push(particle);
    }

    /// Iterates over the particles.
    pub fn iter(&self) -> std::slice::Iter<'_, Particle> {
        self.particles.iter()
    }

    /// Iterates mutably over the particles.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Particle> {
        self.particles.iter_mut()
    }

    /// The particles as a slice.
    #[must_use]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Swaps in a new particle set, returning the previous one.
    pub fn replace_particles(&mut self, particles: Vec<Particle>) -> Vec<Particle> {
        std::mem::replace(&mut self.particles, particles)
    }

    /// Removes and returns every particle.
    pub fn take_particles(&mut self) -> Vec<Particle> {
        std::mem::take(&mut self.particles)
    }

    /// Reference momentum in GeV/c.
    #[must_use]
    pub fn reference_momentum(&self) -> f64 {
        self.reference_momentum
    }

    /// Charge carried by each macro-particle.
    #[must_use]
    pub fn charge_per_particle(&self) -> f64 {
        self.charge_per_particle
    }

    /// Total bunch charge.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn total_charge(&self) -> f64 {
        self.charge_per_particle * self.particles.len() as f64
    }

    /// Sets or clears the flag recording that the scattering model has been
    /// configured for the current jaw.
    pub fn set_scatter_configured(&mut self, configured: bool) {
        self.scatter_configured = configured;
    }

    /// Returns `true` if the scattering model is configured for the current jaw.
    #[must_use]
    pub fn is_scatter_configured(&self) -> bool {
        self.scatter_configured
    }

    /// Returns `true` if a scattering model is installed.
    #[must_use]
    pub fn has_scattering_model(&self) -> bool {
        self.scattering.is_some()
    }

    /// Passes `particle` through `length` metres of `jaw`.
    ///
    /// The model is configured for the jaw on the first call after the
    /// configured flag was cleared. Without a model every particle is absorbed.
    ///
    /// # Errors
    /// Propagates configuration errors from the scattering model.
    pub fn scatter(
        &mut self,
        particle: &mut Particle,
        length: f64,
        jaw: &CollimatorAperture,
        rng: &mut RngHandle,
    ) -> Result<ScatterOutcome> {
        let Some(model) = self.scattering.as_mut() else {
            return Ok(ScatterOutcome::Absorbed);
        };
        if !self.scatter_configured {
            model.configure(self.reference_momentum, jaw)?;
            self.scatter_configured = true;
        }
        Ok(model.scatter(particle, length, jaw, self.reference_momentum, rng))
    }
}

impl<'a> IntoIterator for &'a Bunch {
    type Item = &'a Particle;
    type IntoIter = std::slice::Iter<'a, Particle>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a> IntoIterator for &'a mut Bunch {
    type Item = &'a mut Particle;
    type IntoIter = std::slice::IterMut<'a, Particle>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MaterialProperties;

    #[derive(Debug, Default)]
    struct CountingModel {
        configured: usize,
        calls: usize,
    }

    impl ScatteringModel for CountingModel {
        fn configure(&mut self, _p0: f64, _jaw: &CollimatorAperture) -> Result<()> {
            self.configured += 1;
            Ok(())
        }

        fn scatter(
            &mut self,
            particle: &mut Particle,
            _length: f64,
            _jaw: &CollimatorAperture,
            _p0: f64,
            _rng: &mut RngHandle,
        ) -> ScatterOutcome {
            self.calls += 1;
            *particle.xp_mut() += 1.0e-6;
            ScatterOutcome::Survived
        }
    }

    fn sample_bunch(n: usize) -> Bunch {
        #[allow(clippy::cast_precision_loss)]
        let particles = (0..n).map(|i| Particle::at(i as f64 * 1e-4, 0.0)).collect();
        Bunch::from_particles(7000.0, 1.0e-9, particles)
    }

    #[test]
    fn test_total_charge() {
        let bunch = sample_bunch(10);
        assert_eq!(bunch.len(), 10);
        assert!((bunch.total_charge() - 1.0e-8).abs() < 1e-20);
    }

    #[test]
    fn test_replace_and_take() {
        let mut bunch = sample_bunch(4);
        let old = bunch.replace_particles(vec![Particle::default()]);
        assert_eq!(old.len(), 4);
        assert_eq!(bunch.len(), 1);
        let taken = bunch.take_particles();
        assert_eq!(taken.len(), 1);
        assert!(bunch.is_empty());
    }

    #[test]
    fn test_scatter_without_model_absorbs() {
        let mut bunch = sample_bunch(1);
        let jaw = CollimatorAperture::new(0.001, 0.1, MaterialProperties::copper());
        let mut rng = RngHandle::from_seed(1);
        let mut p = Particle::at(0.002, 0.0);
        let outcome = bunch.scatter(&mut p, 1.0, &jaw, &mut rng).unwrap();
        assert_eq!(outcome, ScatterOutcome::Absorbed);
        assert!(!bunch.has_scattering_model());
    }

    #[test]
    fn test_scatter_configures_once_per_flag_reset() {
        let mut bunch = sample_bunch(0).with_scattering_model(Box::new(CountingModel::default()));
        let jaw = CollimatorAperture::new(0.001, 0.1, MaterialProperties::copper());
        let mut rng = RngHandle::from_seed(1);
        let mut p = Particle::at(0.002, 0.0);

        for _ in 0..3 {
            assert_eq!(
                bunch.scatter(&mut p, 1.0, &jaw, &mut rng).unwrap(),
                ScatterOutcome::Survived
            );
        }
        assert!(bunch.is_scatter_configured());
        bunch.set_scatter_configured(false);
        bunch.scatter(&mut p, 1.0, &jaw, &mut rng).unwrap();

        let dump = format!("{bunch:?}");
        assert!(dump.contains("configured: 2"), "{dump}");
        assert!(dump.contains("calls: 4"), "{dump}");
        assert!((p.xp() - 4.0e-6).abs() < 1e-18);
    }

    #[test]
    fn test_owned_index_filtering() {
        let mut index = ParticleIndex::owned();
        index.reset(5);
        assert_eq!(index.to_vec(), vec![0, 1, 2, 3, 4]);
        let removed = index.retain_mask(&[true, false, true, false, true]).unwrap();
        assert_eq!(removed, vec![1, 3]);
        assert_eq!(index.to_vec(), vec![0, 2, 4]);
        assert_eq!(index.get(1), Some(2));
        let removed = index.retain_mask(&[false, true, true]).unwrap();
        assert_eq!(removed, vec![0]);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_index_mask_length_mismatch() {
        let mut index = ParticleIndex::owned();
        index.reset(3);
        let err = index.retain_mask(&[true, false]).unwrap_err();
        assert_eq!(err, Error::IndexMismatch { index: 3, bunch: 2 });
        assert_eq!(index.to_vec(), vec![0, 1, 2]);
    }

    #[test]
    fn test_shared_index_visible_to_caller() {
        let storage: SharedIndex = Rc::new(RefCell::new(vec![99]));
        let mut index = ParticleIndex::shared(Rc::clone(&storage));
        index.reset(3);
        assert_eq!(*storage.borrow(), vec![0, 1, 2]);
        index.retain_mask(&[false, true, true]).unwrap();
        assert_eq!(*storage.borrow(), vec![1, 2]);
        assert!(!index.is_empty());
    }
}
