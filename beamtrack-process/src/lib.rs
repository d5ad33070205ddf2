//! beamtrack-process: Bunch processes applied while tracking.
//!
//! This crate provides the per-step process protocol and its
//! implementations:
//! - **Collimation** - aperture losses with optional jaw scattering
//! - **Hollow electron lens** - radial kicks from an annular electron beam
//!
//! plus a compact jaw scattering model and a reference run loop.
//!
#![warn(missing_docs)]

mod collimation;
mod error;
mod hel;
pub mod kick;
mod scattering;
pub mod stepping;
mod tracker;

pub use collimation::{CollimationConfig, CollimationProcess};
pub use error::{ProcessError, Result};
pub use hel::HollowElectronLensProcess;
pub use scattering::NuclearScatter;
pub use stepping::{BunchProcess, CollimationStages, Stage, StepContext, StepState};
pub use tracker::ParticleTracker;

// Re-export the types every process works with
pub use beamtrack_core::{Bunch, Component, RngHandle};
