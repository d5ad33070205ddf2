//! beamtrack-io: Output formats for beamtrack.
//!
//! This crate writes what the tracking processes produce: the binned
//! per-element loss report, one file per loss event with the lost
//! particle coordinates, and hollow electron lens kick profile tables.
//!

mod error;
pub mod loss_file;
pub mod loss_report;
mod profile;

pub use error::{Error, Result};
pub use loss_file::{LossFileWriter, LossRecord};
pub use loss_report::{BinnedLossWriter, LossBin, LossHistogram};
pub use profile::ProfileWriter;
