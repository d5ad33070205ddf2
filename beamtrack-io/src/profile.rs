//! Tabulated hollow electron lens kick profiles.

use std::io::Write;

use crate::Result;

/// Writes a tab separated kick table.
///
/// Columns: radius, radial-model kick, simple-model kick and the absolute
/// values of both kicks.
#[derive(Debug)]
pub struct ProfileWriter<W: Write> {
    out: W,
    header_written: bool,
}

impl<W: Write> ProfileWriter<W> {
    /// Wraps a sink.
    pub fn new(out: W) -> Self {
        Self {
            out,
            header_written: false,
        }
    }

    /// Writes one row, preceded by the header on the first call.
    pub fn write_row(&mut self, r: f64, kick_radial: f64, kick_simple: f64) -> Result<()> {
        if !self.header_written {
            writeln!(self.out, "#r\tkick_radial\tkick_simple\t|kick_r|\t|kick_s|")?;
            self.header_written = true;
        }
        writeln!(
            self.out,
            "{r}\t{kick_radial}\t{kick_simple}\t{}\t{}",
            kick_radial.abs(),
            kick_simple.abs()
        )?;
        Ok(())
    }

    /// Flushes and returns the sink.
    pub fn finish(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}
