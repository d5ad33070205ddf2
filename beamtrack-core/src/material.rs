//! Physical properties of collimator jaw materials.

use std::collections::BTreeMap;
use std::fmt;

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const AVOGADRO: f64 = 6.022e23;

/// Bulk properties of a jaw material.
///
/// Cross sections are in barns, `dedx` in MeV g⁻¹ cm², `x0` (radiation length)
/// in metres and `density` in g cm⁻³. The derived quantities are refreshed by
/// [`MaterialProperties::update`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MaterialProperties {
    /// Atomic mass.
    pub a: f64,
    /// Total proton-nucleus cross section.
    pub sigma_t: f64,
    /// Inelastic cross section.
    pub sigma_i: f64,
    /// Rutherford cross section.
    pub sigma_r: f64,
    /// Minimum ionisation energy loss.
    pub dedx: f64,
    /// Radiation length.
    pub x0: f64,
    /// Density.
    pub density: f64,
    /// Electrical conductivity.
    pub conductivity: f64,
    /// Energy loss rate in GeV per metre (derived).
    pub dedx_gev_per_metre: f64,
    /// Nuclear interaction length in metres (derived).
    pub lambda: f64,
    /// Additional named properties.
    #[cfg_attr(feature = "serde", serde(default))]
    pub extra: BTreeMap<String, f64>,
}

impl MaterialProperties {
    /// Creates a material and computes its derived quantities.
    #[allow(clippy::too_many_arguments, clippy::similar_names)]
    #[must_use]
    pub fn new(
        a: f64,
        sigma_t: f64,
        sigma_i: f64,
        sigma_r: f64,
        dedx: f64,
        x0: f64,
        density: f64,
        conductivity: f64,
    ) -> Self {
        let mut material = Self {
            a,
            sigma_t,
            sigma_i,
            sigma_r,
            dedx,
            x0,
            density,
            conductivity,
            dedx_gev_per_metre: 0.0,
            lambda: 0.0,
            extra: BTreeMap::new(),
        };
        material.update();
        material
    }

    /// Copper, as used for secondary collimator jaws.
    #[must_use]
    pub fn copper() -> Self {
        Self::new(63.55, 1.232, 0.782, 0.0153, 1.403, 0.0143, 8.96, 5.98e7)
    }

    /// Graphite, as used for primary collimator jaws.
    #[must_use]
    pub fn graphite() -> Self {
        Self::new(12.01, 0.3312, 0.231, 0.000_076, 1.745, 0.188, 2.0, 7.14e4)
    }

    /// Tungsten, as used for tertiary collimators and absorbers.
    #[must_use]
    pub fn tungsten() -> Self {
        Self::new(183.84, 2.767, 1.65, 0.0768, 1.145, 0.0035, 19.3, 1.77e7)
    }

    /// Recomputes the energy loss rate and the nuclear interaction length.
    pub fn update(&mut self) {
        self.dedx_gev_per_metre = self.dedx * self.density / 10.0;
        self.lambda = self.a * 1.0e-6
            / ((self.sigma_t + self.sigma_r) * self.density * 1.0e-28 * AVOGADRO);
    }

    /// Checks that the material yields a finite, positive interaction length.
    pub fn validate(&self) -> Result<()> {
        if self.lambda.is_finite() && self.lambda > 0.0 {
            Ok(())
        } else {
            Err(Error::DegenerateMaterial {
                a: self.a,
                density: self.density,
            })
        }
    }

    /// Sets a named extra property.
    pub fn set_extra(&mut self, key: impl Into<String>, value: f64) {
        self.extra.insert(key.into(), value);
    }

    /// Returns a named extra property, if set.
    #[must_use]
    pub fn extra(&self, key: &str) -> Option<f64> {
        self.extra.get(key).copied()
    }
}

impl fmt::Display for MaterialProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:5.1}{:7.3}{:7.3}{:9.5}{:6.3}{:7.3}{:13.3e} {:7.1}",
            self.a,
            self.sigma_t,
            self.sigma_i,
            self.sigma_r,
            self.dedx,
            self.density,
            self.conductivity,
            self.x0
        )?;
        for (key, value) in &self.extra {
            write!(f, " {key} {value}")?;
        }
        Ok(())
    }
}
