//! beamtrack-core: Core types for bunch-process particle tracking.
//!
//! This crate provides the data model shared by the tracking processes:
//! phase space vectors, bunches, accelerator components with their
//! apertures, collimator materials, hollow electron lens parameters and
//! the deterministic random source.
//!

pub mod aperture;
pub mod bunch;
pub mod component;
pub mod error;
pub mod lens;
pub mod material;
pub mod particle;
pub mod rng;
pub mod scatter;
pub mod units;

pub use aperture::{
    Aperture, CircularAperture, CollimatorAperture, EllipticalAperture, RectangularAperture,
};
pub use bunch::{Bunch, ParticleIndex, SharedIndex};
pub use component::{Component, ElementKind};
pub use error::{Error, Result};
pub use lens::{
    AcParameters, ElectronDirection, HollowElectronLens, KickModel, OperatingMode,
    RadialProfileVariant,
};
pub use material::MaterialProperties;
pub use particle::{Coord, Particle, PARTICLE_LENGTH};
pub use rng::RngHandle;
pub use scatter::{ScatterOutcome, ScatteringModel};
