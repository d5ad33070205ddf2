//! Hollow electron lens kick models.
//!
//! All kicks are radial angles in radians. A negative value deflects the
//! particle towards the lens axis.

use beamtrack_core::{
    ElectronDirection, HollowElectronLens, KickModel, Particle, RadialProfileVariant,
};

/// Electron density at each profile breakpoint, in arbitrary units.
const PROFILE_DENSITY: [f64; 5] = [0.0, 917.0, 397.0, 228.0, 0.0];

/// Kick calculator for one lens at a given beam velocity.
#[derive(Debug, Clone, Copy)]
pub struct LensKick<'a> {
    lens: &'a HollowElectronLens,
    proton_beta: f64,
}

impl<'a> LensKick<'a> {
    /// Creates a calculator for `lens` acting on particles with the given beta.
    #[must_use]
    pub fn new(lens: &'a HollowElectronLens, proton_beta: f64) -> Self {
        Self { lens, proton_beta }
    }

    /// Deflection of a particle at radius `r` outside the whole electron beam.
    ///
    /// Positive for counter-propagating electrons, negative and smaller for
    /// co-propagating ones. Zero at `r = 0`.
    #[must_use]
    pub fn theta_max(&self, r: f64) -> f64 {
        if r == 0.0 {
            return 0.0;
        }
        let lens = self.lens;
        let beta_product = lens.electron_beta * self.proton_beta;
        let denominator = r * 1.0e7 * lens.rigidity * beta_product;
        match lens.direction {
            ElectronDirection::Counter => {
                2.0 * lens.effective_length * lens.current * (1.0 + beta_product) / denominator
            }
            ElectronDirection::Co => {
                -(2.0 * lens.effective_length * lens.current * (1.0 - beta_product)) / denominator
            }
        }
    }

    /// Kick for a uniform annulus between `rmin` and `rmax`.
    #[must_use]
    pub fn simple(&self, r: f64) -> f64 {
        let (rmin, rmax) = (self.lens.rmin, self.lens.rmax);
        if r <= rmin {
            0.0
        } else if r < rmax {
            let ramp = (r * r - rmin * rmin) / (rmax * rmax - rmin * rmin);
            -ramp * self.theta_max(r)
        } else {
            -self.theta_max(r)
        }
    }

    /// Kick for the measured radial profile `variant`.
    #[must_use]
    pub fn radial(&self, r: f64, variant: RadialProfileVariant) -> f64 {
        if r <= self.lens.rmin {
            return 0.0;
        }
        -self.theta_max(r) * enclosed_fraction(r, self.lens.rmin, variant)
    }

    /// Kick from the lens's configured model.
    #[must_use]
    pub fn kick(&self, r: f64) -> f64 {
        match self.lens.kick_model {
            KickModel::Simple => self.simple(r),
            KickModel::Radial(variant) => self.radial(r, variant),
        }
    }

    /// Radius of a particle measured from the lens axis.
    #[must_use]
    pub fn radius_of(&self, particle: &Particle) -> f64 {
        (particle.x() - self.lens.x_offset).hypot(particle.y() - self.lens.y_offset)
    }

    /// Applies the configured kick, multiplied by `scale`, to `particle`.
    ///
    /// Returns the kick applied.
    pub fn apply(&self, particle: &mut Particle, scale: f64) -> f64 {
        let dx = particle.x() - self.lens.x_offset;
        let dy = particle.y() - self.lens.y_offset;
        let theta = self.kick(dx.hypot(dy)) * scale;
        if theta != 0.0 {
            let angle = dy.atan2(dx);
            *particle.xp_mut() += theta * angle.cos();
            *particle.yp_mut() += theta * angle.sin();
        }
        theta
    }
}

/// Fraction of the electron charge enclosed within radius `r`.
///
/// The profile breakpoints are scaled so the first one sits at `rmin`. The
/// density is linear between breakpoints, so each segment's charge is the
/// integral of a quadratic. The result is 0 at or below `rmin`, 1 beyond the
/// last breakpoint and non-decreasing in between.
#[must_use]
pub fn enclosed_fraction(r: f64, rmin: f64, variant: RadialProfileVariant) -> f64 {
    if r <= rmin {
        return 0.0;
    }
    let breakpoints = variant.breakpoints();
    let r0 = breakpoints[0];
    let x: [f64; 5] = breakpoints.map(|ri| ri / r0 * rmin);
    let y = PROFILE_DENSITY;

    // Antiderivative of y(r)·r on segment k.
    let antiderivative = |k: usize, r: f64| {
        let slope = (y[k + 1] - y[k]) / (x[k + 1] - x[k]);
        let intercept = y[k] - x[k] * slope;
        slope * r.powi(3) / 3.0 + intercept * r * r / 2.0
    };
    let segment: [f64; 4] =
        std::array::from_fn(|k| antiderivative(k, x[k + 1]) - antiderivative(k, x[k]));
    let total: f64 = segment.iter().sum();

    let mut enclosed = 0.0;
    for k in 0..4 {
        if r < x[k + 1] {
            enclosed += antiderivative(k, r) - antiderivative(k, x[k]);
            return (enclosed / total).clamp(0.0, 1.0);
        }
        enclosed += segment[k];
    }
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use beamtrack_core::units::{lorentz_beta, lorentz_gamma, rigidity, PROTON_MASS_GEV};

    fn lhc_lens() -> HollowElectronLens {
        HollowElectronLens::new(5.0, 0.195, 3.0, rigidity(7000.0)).with_radii(1.0e-3, 2.0e-3)
    }

    fn lhc_beta() -> f64 {
        lorentz_beta(lorentz_gamma(7000.0, PROTON_MASS_GEV))
    }

    #[test]
    fn test_theta_max_sign_and_scaling() {
        let lens = lhc_lens();
        let kick = LensKick::new(&lens, lhc_beta());
        assert_eq!(kick.theta_max(0.0), 0.0);
        let t1 = kick.theta_max(1.0e-3);
        assert!(t1 > 0.0);
        assert_relative_eq!(kick.theta_max(2.0e-3), t1 / 2.0, max_relative = 1e-12);

        let co = lhc_lens().with_direction(ElectronDirection::Co);
        let co_kick = LensKick::new(&co, lhc_beta());
        let t_co = co_kick.theta_max(1.0e-3);
        assert!(t_co < 0.0);
        assert!(t_co.abs() < t1);
    }

    #[test]
    fn test_simple_model_bounds() {
        let lens = lhc_lens();
        let kick = LensKick::new(&lens, lhc_beta());
        assert_eq!(kick.simple(lens.rmin), 0.0);
        assert_eq!(kick.simple(0.5e-3), 0.0);
        for r in [lens.rmax, 2.5e-3, 1.0e-2] {
            assert_relative_eq!(
                kick.simple(r).abs(),
                kick.theta_max(r).abs(),
                max_relative = 1e-12
            );
        }
        let mid = kick.simple(1.5e-3);
        assert!(mid < 0.0 && mid.abs() < kick.theta_max(1.5e-3));
    }

    #[test]
    fn test_enclosed_fraction_monotonic() {
        for variant in [RadialProfileVariant::Tevatron, RadialProfileVariant::Lhc] {
            let rmin = 1.0e-3;
            let mut previous = 0.0;
            for i in 0..=400 {
                let r = rmin + f64::from(i) * 1.0e-5;
                let f = enclosed_fraction(r, rmin, variant);
                assert!((0.0..=1.0).contains(&f), "f({r}) = {f}");
                assert!(f >= previous - 1e-15, "not monotonic at r = {r}");
                previous = f;
            }
            assert_relative_eq!(enclosed_fraction(rmin * 3.0, rmin, variant), 1.0);
        }
    }

    #[test]
    fn test_enclosed_fraction_continuous_at_breakpoints() {
        let rmin = 1.0e-3;
        let variant = RadialProfileVariant::Lhc;
        let r = variant.breakpoints();
        for ri in &r[1..] {
            let x = ri / r[0] * rmin;
            let below = enclosed_fraction(x - 1e-12, rmin, variant);
            let above = enclosed_fraction(x, rmin, variant);
            assert_relative_eq!(below, above, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_radial_kick_saturates() {
        let lens = lhc_lens().with_kick_model(KickModel::Radial(RadialProfileVariant::Tevatron));
        let kick = LensKick::new(&lens, lhc_beta());
        assert_eq!(kick.kick(lens.rmin), 0.0);
        let far = 5.0e-3;
        assert_relative_eq!(kick.kick(far), -kick.theta_max(far), max_relative = 1e-12);
    }

    #[test]
    fn test_apply_points_to_axis() {
        let lens = lhc_lens().with_offset(1.0e-4, 0.0);
        let kick = LensKick::new(&lens, lhc_beta());
        let mut p = Particle::at(1.0e-4 + 3.0e-3, 0.0);
        let theta = kick.apply(&mut p, 1.0);
        assert!(theta < 0.0);
        assert_relative_eq!(p.xp(), theta);
        assert!(p.yp().abs() < 1e-20);
        assert_relative_eq!(kick.radius_of(&p), 3.0e-3, max_relative = 1e-12);

        let mut inner = Particle::at(1.0e-4, 5.0e-4);
        assert_eq!(kick.apply(&mut inner, 1.0), 0.0);
        assert_eq!(inner.xp(), 0.0);
    }
}
