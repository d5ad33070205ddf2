//! Phase space vector for a single tracked particle.

use std::fmt;
use std::ops::{Index, IndexMut};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of scalars carried by every particle.
pub const PARTICLE_LENGTH: usize = 8;

/// Named slots of the phase space vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Coord {
    /// Horizontal position.
    X = 0,
    /// Horizontal angle.
    Xp = 1,
    /// Vertical position.
    Y = 2,
    /// Vertical angle.
    Yp = 3,
    /// Longitudinal position.
    Ct = 4,
    /// Relative momentum offset.
    Dp = 5,
    /// Particle identifier.
    Id = 6,
    /// Reserved slot.
    Reserved = 7,
}

/// Phase space coordinates of one particle: `(x, xp, y, yp, ct, dp, id, reserved)`.
///
/// Equality is exact element-wise comparison.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Particle {
    coords: [f64; PARTICLE_LENGTH],
}

macro_rules! coord_accessors {
    ($($get:ident, $get_mut:ident => $coord:expr;)*) => {
        $(
            #[doc = concat!("Returns the `", stringify!($get), "` coordinate.")]
            #[inline]
            #[must_use]
            pub fn $get(&self) -> f64 {
                self.coords[$coord as usize]
            }

            #[doc = concat!("Mutable access to the `", stringify!($get), "` coordinate.")]
            #[inline]
            pub fn $get_mut(&mut self) -> &mut f64 {
                &mut self.coords[$coord as usize]
            }
        )*
    };
}

impl Particle {
    /// Creates a particle from its eight coordinates.
    #[inline]
    #[must_use]
    pub fn new(coords: [f64; PARTICLE_LENGTH]) -> Self {
        Self { coords }
    }

    /// Creates a particle with every slot set to `value`.
    #[inline]
    #[must_use]
    pub fn splat(value: f64) -> Self {
        Self {
            coords: [value; PARTICLE_LENGTH],
        }
    }

    /// Creates a particle at the given transverse position with zero angles.
    #[inline]
    #[must_use]
    pub fn at(x: f64, y: f64) -> Self {
        let mut p = Self::default();
        *p.x_mut() = x;
        *p.y_mut() = y;
        p
    }

    coord_accessors! {
        x, x_mut => Coord::X;
        xp, xp_mut => Coord::Xp;
        y, y_mut => Coord::Y;
        yp, yp_mut => Coord::Yp;
        ct, ct_mut => Coord::Ct;
        dp, dp_mut => Coord::Dp;
        id, id_mut => Coord::Id;
        reserved, reserved_mut => Coord::Reserved;
    }

    /// Sets every coordinate to zero.
    pub fn zero(&mut self) {
        self.coords = [0.0; PARTICLE_LENGTH];
    }

    /// Returns the raw coordinate array.
    #[inline]
    #[must_use]
    pub fn as_array(&self) -> &[f64; PARTICLE_LENGTH] {
        &self.coords
    }
}

impl From<[f64; PARTICLE_LENGTH]> for Particle {
    fn from(coords: [f64; PARTICLE_LENGTH]) -> Self {
        Self { coords }
    }
}

impl Index<Coord> for Particle {
    type Output = f64;

    #[inline]
    fn index(&self, coord: Coord) -> &f64 {
        &self.coords[coord as usize]
    }
}

impl IndexMut<Coord> for Particle {
    #[inline]
    fn index_mut(&mut self, coord: Coord) -> &mut f64 {
        &mut self.coords[coord as usize]
    }
}

/// Row format used by loss files: eight 24-wide scientific columns and a newline.
impl fmt::Display for Particle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for value in &self.coords {
            write!(f, "{value:>24.10e}")?;
        }
        writeln!(f)
    }
}
