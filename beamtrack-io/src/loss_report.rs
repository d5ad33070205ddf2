//! Binned per-element loss report.

use std::io::Write;

use crate::{Error, Result};

/// Loss counts along one element, in fixed-width bins.
///
/// The element is split into `ceil(length / bin_width)` bins (at least one).
/// Every bin but the last is `bin_width` long; the last covers the remainder.
#[derive(Debug, Clone, PartialEq)]
pub struct LossHistogram {
    length: f64,
    bin_width: f64,
    counts: Vec<usize>,
}

/// One non-empty bin of a [`LossHistogram`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossBin {
    /// Offset of the bin start from the element entrance.
    pub start: f64,
    /// Bin length.
    pub length: f64,
    /// Number of losses in the bin.
    pub count: usize,
}

impl LossHistogram {
    /// Creates an empty histogram for an element of the given length.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] unless `bin_width` is finite and
    /// positive and `length` is finite and non-negative.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn new(length: f64, bin_width: f64) -> Result<Self> {
        if !(bin_width.is_finite() && bin_width > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "bin width must be positive, got {bin_width}"
            )));
        }
        if !(length.is_finite() && length >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "element length must be non-negative, got {length}"
            )));
        }
        let nbins = ((length / bin_width).ceil() as usize).max(1);
        Ok(Self {
            length,
            bin_width,
            counts: vec![0; nbins],
        })
    }

    /// Number of bins.
    #[must_use]
    pub fn nbins(&self) -> usize {
        self.counts.len()
    }

    /// Bin holding a loss at longitudinal offset `ct`.
    ///
    /// Offsets before the element map to the first bin and offsets past it
    /// to the last.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn bin_index(&self, ct: f64) -> usize {
        let raw = (ct / self.bin_width).floor();
        if raw.is_nan() || raw < 0.0 {
            return 0;
        }
        (raw as usize).min(self.counts.len() - 1)
    }

    /// Records one loss at offset `ct`.
    pub fn record(&mut self, ct: f64) {
        let j = self.bin_index(ct);
        self.counts[j] += 1;
    }

    /// Start offset of bin `j`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn bin_start(&self, j: usize) -> f64 {
        self.bin_width * j as f64
    }

    /// Length of bin `j`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn bin_length(&self, j: usize) -> f64 {
        let last = self.counts.len() - 1;
        if j == last {
            self.length - self.bin_width * last as f64
        } else {
            self.bin_width
        }
    }

    /// Count in bin `j`.
    #[must_use]
    pub fn count(&self, j: usize) -> usize {
        self.counts.get(j).copied().unwrap_or(0)
    }

    /// Total number of recorded losses.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Non-empty bins in order along the element.
    pub fn occupied_bins(&self) -> impl Iterator<Item = LossBin> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, &count)| count > 0)
            .map(|(j, &count)| LossBin {
                start: self.bin_start(j),
                length: self.bin_length(j),
                count,
            })
    }
}

/// Writes binned loss lines to a text sink.
///
/// Each line holds the element name (35 columns), the absolute bin start
/// (24 columns), the bin length (24 columns), a tab and the count.
#[derive(Debug)]
pub struct BinnedLossWriter<W: Write> {
    out: W,
}

impl<W: Write> BinnedLossWriter<W> {
    /// Wraps a sink.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Writes one line per non-empty bin and returns the number of lines.
    ///
    /// `position` is the lattice position of the element entrance.
    pub fn write_histogram(
        &mut self,
        name: &str,
        position: f64,
        histogram: &LossHistogram,
    ) -> Result<usize> {
        let mut lines = 0;
        for bin in histogram.occupied_bins() {
            writeln!(
                self.out,
                "{:<35}{:<24}{:<24}\t{}",
                name,
                position + bin.start,
                bin.length,
                bin.count
            )?;
            lines += 1;
        }
        self.out.flush()?;
        Ok(lines)
    }

    /// Mutable access to the sink.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.out
    }

    /// Returns the sink.
    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bin_layout_with_remainder() {
        let h = LossHistogram::new(0.25, 0.1).unwrap();
        assert_eq!(h.nbins(), 3);
        assert!((h.bin_length(0) - 0.1).abs() < 1e-12);
        assert!((h.bin_length(2) - 0.05).abs() < 1e-12);
        assert!((h.bin_start(2) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_exact_multiple_and_zero_length() {
        let h = LossHistogram::new(1.0, 0.1).unwrap();
        assert_eq!(h.nbins(), 10);
        assert!((h.bin_length(9) - 0.1).abs() < 1e-12);

        let thin = LossHistogram::new(0.0, 0.1).unwrap();
        assert_eq!(thin.nbins(), 1);
        assert_eq!(thin.bin_index(0.0), 0);
        assert!(thin.bin_length(0).abs() < 1e-15);
    }

    #[test]
    fn test_out_of_range_clamped() {
        let mut h = LossHistogram::new(0.5, 0.1).unwrap();
        assert_eq!(h.bin_index(-0.3), 0);
        assert_eq!(h.bin_index(0.75), 4);
        assert_eq!(h.bin_index(f64::NAN), 0);
        h.record(0.05);
        h.record(0.45);
        h.record(0.9);
        assert_eq!(h.count(0), 1);
        assert_eq!(h.count(4), 2);
        assert_eq!(h.total(), 3);
    }

    #[test]
    fn test_invalid_width() {
        assert!(LossHistogram::new(1.0, 0.0).is_err());
        assert!(LossHistogram::new(-1.0, 0.1).is_err());
    }

    #[test]
    fn test_report_lines() {
        let mut h = LossHistogram::new(0.6, 0.1).unwrap();
        for ct in [0.01, 0.02, 0.35] {
            h.record(ct);
        }
        let mut writer = BinnedLossWriter::new(Vec::new());
        let lines = writer
            .write_histogram("Collimator.TCP", 100.0, &h)
            .unwrap();
        assert_eq!(lines, 2);

        let text = String::from_utf8(writer.into_inner()).unwrap();
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][..35], format!("{:<35}", "Collimator.TCP"));
        assert!(rows[0].ends_with("\t2"));
        assert!(rows[1][35..59].trim_end().starts_with("100.3"));
        assert!(rows[1].ends_with("\t1"));
    }
}
