//! Compact nuclear absorption and multiple Coulomb scattering model.

use beamtrack_core::{
    CollimatorAperture, Particle, Result, RngHandle, ScatterOutcome, ScatteringModel,
};

/// Highland constant in GeV.
const HIGHLAND_SCALE: f64 = 0.0136;

/// Jaw scattering with exponential nuclear absorption, mean ionisation loss
/// and a Gaussian multiple scattering angle.
#[derive(Debug, Clone)]
pub struct NuclearScatter {
    lambda: f64,
    dedx: f64,
    radiation_length: f64,
    absorption_cut: f64,
}

impl Default for NuclearScatter {
    fn default() -> Self {
        Self {
            lambda: 0.0,
            dedx: 0.0,
            radiation_length: 0.0,
            absorption_cut: -0.99,
        }
    }
}

impl NuclearScatter {
    /// Creates an unconfigured model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the relative momentum offset at or below which a particle is
    /// considered stopped.
    #[must_use]
    pub fn with_absorption_cut(mut self, dp: f64) -> Self {
        self.absorption_cut = dp;
        self
    }

    /// RMS projected scattering angle after `length` metres (Highland).
    #[must_use]
    pub fn rms_angle(&self, length: f64, momentum: f64) -> f64 {
        if length <= 0.0 || self.radiation_length <= 0.0 || momentum <= 0.0 {
            return 0.0;
        }
        let t = length / self.radiation_length;
        (HIGHLAND_SCALE / momentum * t.sqrt() * (1.0 + 0.038 * t.ln())).max(0.0)
    }
}

impl ScatteringModel for NuclearScatter {
    fn configure(&mut self, _reference_momentum: f64, jaw: &CollimatorAperture) -> Result<()> {
        let material = jaw.material();
        material.validate()?;
        self.lambda = material.lambda;
        self.dedx = material.dedx_gev_per_metre;
        self.radiation_length = material.x0;
        Ok(())
    }

    fn scatter(
        &mut self,
        particle: &mut Particle,
        length: f64,
        _jaw: &CollimatorAperture,
        reference_momentum: f64,
        rng: &mut RngHandle,
    ) -> ScatterOutcome {
        let free_path = -self.lambda * rng.open01().ln();
        if free_path < length {
            *particle.ct_mut() = free_path;
            return ScatterOutcome::Absorbed;
        }

        let momentum = reference_momentum * (1.0 + particle.dp());
        *particle.dp_mut() -= self.dedx * length / reference_momentum;
        if particle.dp() <= self.absorption_cut {
            *particle.ct_mut() = length;
            return ScatterOutcome::Absorbed;
        }

        let theta0 = self.rms_angle(length, momentum);
        if theta0 > 0.0 {
            *particle.xp_mut() += theta0 * rng.normal();
            *particle.yp_mut() += theta0 * rng.normal();
        }
        ScatterOutcome::Survived
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beamtrack_core::MaterialProperties;

    fn configured(material: MaterialProperties) -> (NuclearScatter, CollimatorAperture) {
        let jaw = CollimatorAperture::new(1.0e-3, 1.0, material);
        let mut model = NuclearScatter::new();
        model.configure(7000.0, &jaw).unwrap();
        (model, jaw)
    }

    #[test]
    fn test_thick_jaw_absorbs_most() {
        let (mut model, jaw) = configured(MaterialProperties::tungsten());
        let mut rng = RngHandle::from_seed(11);
        let absorbed = (0..500)
            .filter(|_| {
                let mut p = Particle::at(2.0e-3, 0.0);
                model
                    .scatter(&mut p, 5.0, &jaw, 7000.0, &mut rng)
                    .is_absorbed()
            })
            .count();
        // Five metres of tungsten is dozens of interaction lengths.
        assert!(absorbed > 490, "absorbed {absorbed}");
    }

    #[test]
    fn test_absorption_depth_recorded() {
        let (mut model, jaw) = configured(MaterialProperties::copper());
        let mut rng = RngHandle::from_seed(3);
        for _ in 0..200 {
            let mut p = Particle::at(2.0e-3, 0.0);
            if model.scatter(&mut p, 1.0, &jaw, 7000.0, &mut rng).is_absorbed() {
                assert!(p.ct() >= 0.0 && p.ct() <= 1.0);
            }
        }
    }

    #[test]
    fn test_survivor_is_perturbed() {
        let (mut model, jaw) = configured(MaterialProperties::graphite());
        let mut rng = RngHandle::from_seed(5);
        let mut survivors = 0;
        for _ in 0..200 {
            let mut p = Particle::at(2.0e-3, 0.0);
            if model.scatter(&mut p, 0.01, &jaw, 7000.0, &mut rng) == ScatterOutcome::Survived {
                survivors += 1;
                assert!(p.dp() < 0.0);
                assert!(p.xp() != 0.0 || p.yp() != 0.0);
            }
        }
        assert!(survivors > 150);
    }

    #[test]
    fn test_energy_cut() {
        let (model, jaw) = configured(MaterialProperties::copper());
        let mut model = model.with_absorption_cut(-1.0e-9);
        // Force the nuclear path to exceed the jaw by using a zero-length jaw.
        let mut rng = RngHandle::from_seed(9);
        let mut p = Particle::at(2.0e-3, 0.0);
        *p.dp_mut() = -2.0e-9;
        assert!(model.scatter(&mut p, 0.0, &jaw, 7000.0, &mut rng).is_absorbed());
    }

    #[test]
    fn test_degenerate_material_rejected() {
        let vacuum = MaterialProperties::new(1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        let jaw = CollimatorAperture::new(1.0e-3, 1.0, vacuum);
        assert!(NuclearScatter::new().configure(7000.0, &jaw).is_err());
    }

    #[test]
    fn test_rms_angle() {
        let (model, _) = configured(MaterialProperties::copper());
        assert_eq!(model.rms_angle(0.0, 7000.0), 0.0);
        let a = model.rms_angle(0.1, 7000.0);
        let b = model.rms_angle(0.4, 7000.0);
        assert!(a > 0.0 && b > a);
    }
}
