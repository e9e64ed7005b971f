//! # Light curves
//!
//! In-memory time series produced by the [`CurveAcquirer`](crate::archive::acquirer::CurveAcquirer)
//! and consumed by the epoch estimator and the fold/emit stage.
//!
//! Data Model
//! -----------------
//! * [`LightCurve`] – parallel `time`, `flux`, `flux_err` columns plus the [`TimeFormat`] of
//!   the time column. The format is resolved once, when a segment is read, and carried along;
//!   nothing downstream re-probes it.
//! * [`FoldedCurve`] – the same samples re-expressed as a phase (days from transit center),
//!   sorted by phase.
//!
//! Time frames
//! -----------------
//! Mission products stamp times in a shifted barycentric frame. [`TimeFormat::offset`] gives
//! the additive constant back to BJD: `bjd = t + offset`. An unrecognized format has a zero
//! offset, i.e. its times are assumed to already be BJD.
//!
//! Processing (see [`processing`])
//! -----------------
//! * `remove_nans`, `normalize`, `flatten` (rolling-median detrending),
//! * [`stitch`](crate::lightcurve::processing::stitch) of several segments into one series,
//! * `fold` on a period/epoch and `bin` of the folded samples.
use crate::constants::{Day, BKJD_OFFSET, BTJD_OFFSET};
use crate::exofold_errors::ExofoldError;

pub mod processing;

/// Zero-point convention of a light-curve time column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeFormat {
    /// Barycentric TESS Julian Date
    Btjd,
    /// Barycentric Kepler Julian Date
    Bkjd,
    /// Unknown or absent tag, times taken as-is
    #[default]
    Unrecognized,
}

impl TimeFormat {
    /// Resolve a format tag (case-insensitive).
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "btjd" => TimeFormat::Btjd,
            "bkjd" => TimeFormat::Bkjd,
            _ => TimeFormat::Unrecognized,
        }
    }

    /// Additive constant converting this format to BJD.
    pub fn offset(&self) -> Day {
        match self {
            TimeFormat::Btjd => BTJD_OFFSET,
            TimeFormat::Bkjd => BKJD_OFFSET,
            TimeFormat::Unrecognized => 0.0,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, TimeFormat::Unrecognized)
    }
}

/// A time series of flux measurements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LightCurve {
    pub time: Vec<f64>,
    pub flux: Vec<f64>,
    pub flux_err: Vec<f64>,
    pub time_format: TimeFormat,
}

impl LightCurve {
    /// Build a light curve from its columns.
    ///
    /// Arguments
    /// -----------------
    /// * `time`, `flux`: sample columns, same length.
    /// * `flux_err`: uncertainties, same length, or empty when unknown (filled with `NaN`).
    /// * `time_format`: convention of `time`.
    ///
    /// Return
    /// ----------
    /// * The light curve, or [`ExofoldError::InvalidInput`] on mismatched column lengths.
    pub fn new(
        time: Vec<f64>,
        flux: Vec<f64>,
        flux_err: Vec<f64>,
        time_format: TimeFormat,
    ) -> Result<Self, ExofoldError> {
        let flux_err = if flux_err.is_empty() {
            vec![f64::NAN; flux.len()]
        } else {
            flux_err
        };
        if time.len() != flux.len() || flux.len() != flux_err.len() {
            return Err(ExofoldError::InvalidInput(format!(
                "light curve columns differ in length: time={}, flux={}, flux_err={}",
                time.len(),
                flux.len(),
                flux_err.len()
            )));
        }
        Ok(LightCurve {
            time,
            flux,
            flux_err,
            time_format,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.time.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Zero-point offset of the time column.
    pub fn time_offset(&self) -> Day {
        self.time_format.offset()
    }
}

/// A light curve folded on an orbital period.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FoldedCurve {
    /// Days from the transit center, in `[-period/2, period/2)`, ascending
    pub phase: Vec<Day>,
    pub flux: Vec<f64>,
    pub flux_err: Vec<f64>,
}

impl FoldedCurve {
    #[inline]
    pub fn len(&self) -> usize {
        self.phase.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.phase.is_empty()
    }

    /// `(phase, flux)` pairs with `|phase| <= half_window` and a finite flux.
    pub fn points_within(&self, half_window: Day) -> Vec<(f64, f64)> {
        self.phase
            .iter()
            .zip(&self.flux)
            .filter(|(p, f)| p.abs() <= half_window && f.is_finite())
            .map(|(p, f)| (*p, *f))
            .collect()
    }
}

#[cfg(test)]
mod lightcurve_test {
    use super::*;

    #[test]
    fn test_time_format_tags() {
        assert_eq!(TimeFormat::from_tag("BTJD"), TimeFormat::Btjd);
        assert_eq!(TimeFormat::from_tag(" bkjd "), TimeFormat::Bkjd);
        assert_eq!(TimeFormat::from_tag("jd"), TimeFormat::Unrecognized);
        assert_eq!(TimeFormat::Btjd.offset(), 2457000.0);
        assert_eq!(TimeFormat::Bkjd.offset(), 2454833.0);
        assert_eq!(TimeFormat::Unrecognized.offset(), 0.0);
    }

    #[test]
    fn test_missing_errors_are_filled() {
        let lc = LightCurve::new(vec![1.0, 2.0], vec![1.0, 1.0], vec![], TimeFormat::Btjd).unwrap();
        assert_eq!(lc.flux_err.len(), 2);
        assert!(lc.flux_err.iter().all(|e| e.is_nan()));
    }

    #[test]
    fn test_mismatched_columns() {
        let err = LightCurve::new(vec![1.0], vec![1.0, 2.0], vec![], TimeFormat::Btjd);
        assert!(matches!(err, Err(ExofoldError::InvalidInput(_))));
    }
}
