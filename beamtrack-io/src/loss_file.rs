//! Per-event loss files holding the coordinates of lost particles.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use beamtrack_core::Particle;

use crate::Result;

/// A lost particle and, when indexing is enabled, its original ordinal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossRecord {
    /// Coordinates at the point of loss.
    pub particle: Particle,
    /// Position of the particle in the bunch at initialisation.
    pub index: Option<usize>,
}

impl LossRecord {
    /// Creates a record.
    #[must_use]
    pub fn new(particle: Particle, index: Option<usize>) -> Self {
        Self { particle, index }
    }

    /// Writes the record as one line, prefixed by the index if present.
    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        if let Some(index) = self.index {
            write!(out, "{index:>12}")?;
        }
        write!(out, "{}", self.particle)
    }
}

/// Creates one `.loss` file per loss event.
///
/// Files are named `<prefix><qualified name>.<n>.loss` where `n` counts the
/// events at that element, starting from 1.
#[derive(Debug, Default)]
pub struct LossFileWriter {
    prefix: String,
    sequence: HashMap<String, u32>,
}

impl LossFileWriter {
    /// Creates a writer. The prefix may include a directory.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            sequence: HashMap::new(),
        }
    }

    /// File name prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Number of files written so far for an element.
    #[must_use]
    pub fn sequence_number(&self, qualified_name: &str) -> u32 {
        self.sequence.get(qualified_name).copied().unwrap_or(0)
    }

    /// Restarts every sequence counter at zero.
    pub fn reset_sequence(&mut self) {
        self.sequence.clear();
    }

    /// Writes `records` to the next file for `qualified_name` and returns
    /// the path written.
    pub fn write(&mut self, qualified_name: &str, records: &[LossRecord]) -> Result<PathBuf> {
        let n = self.sequence.entry(qualified_name.to_owned()).or_insert(0);
        *n += 1;
        let path = PathBuf::from(format!("{}{qualified_name}.{n}.loss", self.prefix));

        let mut out = BufWriter::new(File::create(&path)?);
        for record in records {
            record.write_to(&mut out)?;
        }
        out.flush()?;
        log::debug!("wrote {} lost particles to {}", records.len(), path.display());
        Ok(path)
    }
}
