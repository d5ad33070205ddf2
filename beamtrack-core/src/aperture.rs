//! Aperture boundaries attached to accelerator components.

use std::fmt;

use crate::MaterialProperties;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Geometric boundary of an element.
///
/// `s` is the arc-length offset from the element entrance, so apertures may
/// vary along the element.
pub trait Aperture: fmt::Debug + Send + Sync {
    /// Returns `true` if the point `(x, y)` at offset `s` is transmitted.
    fn point_inside(&self, x: f64, y: f64, s: f64) -> bool;

    /// Returns the collimator jaw if this aperture supports scattering.
    fn collimator(&self) -> Option<&CollimatorAperture> {
        None
    }

    /// Mutable access to the collimator jaw, if any.
    fn collimator_mut(&mut self) -> Option<&mut CollimatorAperture> {
        None
    }
}

/// Rectangular aperture centred on the reference orbit.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RectangularAperture {
    /// Full horizontal width.
    pub width: f64,
    /// Full vertical height.
    pub height: f64,
}

impl RectangularAperture {
    /// Creates a rectangular aperture from its full width and height.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Aperture for RectangularAperture {
    #[inline]
    fn point_inside(&self, x: f64, y: f64, _s: f64) -> bool {
        x.abs() < self.width / 2.0 && y.abs() < self.height / 2.0
    }
}

/// Circular aperture centred on the reference orbit.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CircularAperture {
    /// Radius.
    pub radius: f64,
}

impl CircularAperture {
    /// Creates a circular aperture.
    #[must_use]
    pub fn new(radius: f64) -> Self {
        Self { radius }
    }
}

impl Aperture for CircularAperture {
    #[inline]
    fn point_inside(&self, x: f64, y: f64, _s: f64) -> bool {
        x * x + y * y < self.radius * self.radius
    }
}

/// Elliptical aperture centred on the reference orbit.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EllipticalAperture {
    /// Horizontal half axis.
    pub half_width: f64,
    /// Vertical half axis.
    pub half_height: f64,
}

impl EllipticalAperture {
    /// Creates an elliptical aperture from its half axes.
    #[must_use]
    pub fn new(half_width: f64, half_height: f64) -> Self {
        Self {
            half_width,
            half_height,
        }
    }
}

impl Aperture for EllipticalAperture {
    #[inline]
    fn point_inside(&self, x: f64, y: f64, _s: f64) -> bool {
        let u = x / self.half_width;
        let v = y / self.half_height;
        u * u + v * v < 1.0
    }
}

/// Two-sided collimator jaws made of a scattering material.
///
/// The transmitted region is `|x - x_offset| < x_half_gap` and
/// `|y - y_offset| < y_half_gap`. With errors enabled the jaws bow inwards
/// along their length by up to `flatness` at the jaw centre.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CollimatorAperture {
    /// Horizontal half gap.
    pub x_half_gap: f64,
    /// Vertical half gap.
    pub y_half_gap: f64,
    /// Horizontal centre of the gap.
    pub x_offset: f64,
    /// Vertical centre of the gap.
    pub y_offset: f64,
    /// Jaw material.
    pub material: MaterialProperties,
    /// Physical jaw length used by imperfection models.
    pub jaw_length: f64,
    /// Jaw flatness error amplitude.
    pub flatness: f64,
    errors: bool,
}

impl CollimatorAperture {
    /// Creates an ideal collimator with the given half gaps.
    #[must_use]
    pub fn new(x_half_gap: f64, y_half_gap: f64, material: MaterialProperties) -> Self {
        Self {
            x_half_gap,
            y_half_gap,
            x_offset: 0.0,
            y_offset: 0.0,
            material,
            jaw_length: 0.0,
            flatness: 0.0,
            errors: false,
        }
    }

    /// Sets the gap centre.
    #[must_use]
    pub fn with_offset(mut self, x_offset: f64, y_offset: f64) -> Self {
        self.x_offset = x_offset;
        self.y_offset = y_offset;
        self
    }

    /// Sets the jaw flatness error amplitude.
    #[must_use]
    pub fn with_flatness(mut self, flatness: f64) -> Self {
        self.flatness = flatness;
        self
    }

    /// Returns the jaw material.
    #[must_use]
    pub fn material(&self) -> &MaterialProperties {
        &self.material
    }

    /// Sets the jaw length used by the imperfection model.
    pub fn set_jaw_length(&mut self, length: f64) {
        self.jaw_length = length;
    }

    /// Switches jaw imperfections on or off.
    pub fn enable_errors(&mut self, enable: bool) {
        self.errors = enable;
    }

    /// Returns `true` if jaw imperfections are active.
    #[must_use]
    pub fn errors_enabled(&self) -> bool {
        self.errors
    }

    /// Inward deviation of the jaw surface at offset `s`.
    #[must_use]
    pub fn jaw_deviation(&self, s: f64) -> f64 {
        if !self.errors || self.jaw_length <= 0.0 {
            return 0.0;
        }
        let u = (s / self.jaw_length).clamp(0.0, 1.0);
        4.0 * self.flatness * u * (1.0 - u)
    }
}

impl Aperture for CollimatorAperture {
    fn point_inside(&self, x: f64, y: f64, s: f64) -> bool {
        let bow = self.jaw_deviation(s);
        (x - self.x_offset).abs() < self.x_half_gap - bow
            && (y - self.y_offset).abs() < self.y_half_gap - bow
    }

    fn collimator(&self) -> Option<&CollimatorAperture> {
        Some(self)
    }

    fn collimator_mut(&mut self) -> Option<&mut CollimatorAperture> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangular() {
        let ap = RectangularAperture::new(0.04, 0.02);
        assert!(ap.point_inside(0.0, 0.0, 0.0));
        assert!(ap.point_inside(0.019, 0.009, 1.0));
        assert!(!ap.point_inside(0.021, 0.0, 0.0));
        assert!(!ap.point_inside(0.0, -0.011, 0.0));
        assert!(ap.collimator().is_none());
    }

    #[test]
    fn test_circular_and_elliptical() {
        let circle = CircularAperture::new(0.01);
        assert!(circle.point_inside(0.007, 0.007, 0.0));
        assert!(!circle.point_inside(0.008, 0.008, 0.0));

        let ellipse = EllipticalAperture::new(0.02, 0.01);
        assert!(ellipse.point_inside(0.019, 0.0, 0.0));
        assert!(!ellipse.point_inside(0.0, 0.011, 0.0));
    }

    #[test]
    fn test_collimator_offset() {
        let jaw = CollimatorAperture::new(0.002, 1.0, MaterialProperties::copper())
            .with_offset(0.001, 0.0);
        assert!(jaw.point_inside(0.0025, 0.0, 0.0));
        assert!(!jaw.point_inside(-0.0015, 0.0, 0.0));
        assert!(jaw.collimator().is_some());
    }

    #[test]
    fn test_jaw_flatness_errors() {
        let mut jaw = CollimatorAperture::new(0.002, 1.0, MaterialProperties::graphite())
            .with_flatness(0.0005);
        // Without errors the bow is ignored.
        assert!(jaw.point_inside(0.0019, 0.0, 0.3));

        jaw.set_jaw_length(0.6);
        jaw.enable_errors(true);
        assert!(jaw.errors_enabled());
        assert!((jaw.jaw_deviation(0.3) - 0.0005).abs() < 1e-15);
        assert!(jaw.jaw_deviation(0.0).abs() < 1e-15);
        // At the jaw centre the effective half gap shrinks to 1.5 mm.
        assert!(!jaw.point_inside(0.0019, 0.0, 0.3));
        assert!(jaw.point_inside(0.0019, 0.0, 0.0));
    }
}
