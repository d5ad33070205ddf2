//! Physical constants and relativistic helpers.
//!
//! Momenta and masses are in GeV/c and GeV, lengths in metres.

/// Proton rest mass (GeV).
pub const PROTON_MASS_GEV: f64 = 0.938_272_088_16;

/// Electron rest mass (GeV).
pub const ELECTRON_MASS_GEV: f64 = 0.000_510_998_950_00;

/// Speed of light in vacuum (m/s).
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Lorentz factor of a particle with momentum `p` and rest mass `m`.
#[inline]
#[must_use]
pub fn lorentz_gamma(p: f64, m: f64) -> f64 {
    (1.0 + (p / m).powi(2)).sqrt()
}

/// Relativistic beta for a given Lorentz factor.
#[inline]
#[must_use]
pub fn lorentz_beta(gamma: f64) -> f64 {
    (1.0 - gamma.powi(-2)).sqrt()
}

/// Magnetic rigidity (T·m) of a unit-charge particle with momentum `p` (GeV/c).
#[inline]
#[must_use]
pub fn rigidity(p: f64) -> f64 {
    p * 1.0e9 / SPEED_OF_LIGHT
}
