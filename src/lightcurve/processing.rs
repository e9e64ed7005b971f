//! Light-curve transformations: cleaning, detrending, stitching, folding and binning.
//!
//! Every transformation returns a new value; inputs are never modified in place. The
//! fallible ones (`flatten`, `normalize`, `fold`, `bin`) report why they could not run so
//! callers can pick a degraded path instead of keeping half-processed data.
use itertools::Itertools;
use tracing::debug;

use super::{FoldedCurve, LightCurve, TimeFormat};
use crate::constants::Day;
use crate::exofold_errors::ExofoldError;

/// Median of the finite values of a slice.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    finite.sort_unstable_by(f64::total_cmp);
    let n = finite.len();
    Some(if n % 2 == 1 {
        finite[n / 2]
    } else {
        0.5 * (finite[n / 2 - 1] + finite[n / 2])
    })
}

/// Centered rolling median, at least one sample per window.
///
/// For an even `window`, the window reaches one sample further into the past than into the
/// future. Near the edges the window is truncated to the available samples.
///
/// Arguments
/// -----------------
/// * `values`: the series to smooth.
/// * `window`: nominal window width in samples (values below 1 are treated as 1).
///
/// Return
/// ----------
/// * A series of the same length; `NaN` where a window holds no finite value.
pub fn rolling_median(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let ahead = (window - 1) / 2;
    let behind = window - 1 - ahead;
    let n = values.len();

    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(behind);
            let hi = (i + ahead + 1).min(n);
            median(&values[lo..hi]).unwrap_or(f64::NAN)
        })
        .collect()
}

impl LightCurve {
    /// Drop samples whose time or flux is not finite.
    pub fn remove_nans(&self) -> LightCurve {
        let keep: Vec<usize> = (0..self.len())
            .filter(|&i| self.time[i].is_finite() && self.flux[i].is_finite())
            .collect();
        self.select(&keep)
    }

    fn select(&self, indices: &[usize]) -> LightCurve {
        LightCurve {
            time: indices.iter().map(|&i| self.time[i]).collect(),
            flux: indices.iter().map(|&i| self.flux[i]).collect(),
            flux_err: indices.iter().map(|&i| self.flux_err[i]).collect(),
            time_format: self.time_format,
        }
    }

    /// Samples ordered by time (stable for equal stamps).
    pub fn sorted_by_time(&self) -> LightCurve {
        let order: Vec<usize> = (0..self.len())
            .sorted_by(|&a, &b| self.time[a].total_cmp(&self.time[b]))
            .collect();
        self.select(&order)
    }

    /// Re-express the time column in another format.
    ///
    /// An unrecognized format counts as plain BJD (offset 0).
    pub fn to_time_format(&self, format: TimeFormat) -> LightCurve {
        let shift = self.time_format.offset() - format.offset();
        LightCurve {
            time: self.time.iter().map(|t| t + shift).collect(),
            flux: self.flux.clone(),
            flux_err: self.flux_err.clone(),
            time_format: format,
        }
    }

    /// Divide flux and uncertainties by the median flux.
    pub fn normalize(&self) -> Result<LightCurve, ExofoldError> {
        let med = median(&self.flux).ok_or(ExofoldError::EmptyLightCurve)?;
        if med == 0.0 || !med.is_finite() {
            return Err(ExofoldError::DegenerateNormalization(format!(
                "median flux is {med}"
            )));
        }
        Ok(LightCurve {
            time: self.time.clone(),
            flux: self.flux.iter().map(|f| f / med).collect(),
            flux_err: self.flux_err.iter().map(|e| e / med).collect(),
            time_format: self.time_format,
        })
    }

    /// Remove slow trends by dividing by a centered rolling median.
    ///
    /// Arguments
    /// -----------------
    /// * `window`: odd width of the smoothing window, in samples.
    ///
    /// Return
    /// ----------
    /// * The detrended light curve (flux around 1).
    /// * [`ExofoldError::WindowTooWide`] when the series is shorter than the window.
    /// * [`ExofoldError::DegenerateNormalization`] when the trend reaches zero.
    pub fn flatten(&self, window: usize) -> Result<LightCurve, ExofoldError> {
        if self.len() < window {
            return Err(ExofoldError::WindowTooWide {
                window,
                len: self.len(),
            });
        }
        let trend = rolling_median(&self.flux, window);
        if trend.iter().any(|t| *t == 0.0 || !t.is_finite()) {
            return Err(ExofoldError::DegenerateNormalization(
                "trend reaches zero or is undefined".into(),
            ));
        }
        Ok(LightCurve {
            time: self.time.clone(),
            flux: self.flux.iter().zip(&trend).map(|(f, t)| f / t).collect(),
            flux_err: self.flux_err.iter().zip(&trend).map(|(e, t)| e / t).collect(),
            time_format: self.time_format,
        })
    }

    /// Detrend, or normalize when detrending fails, or keep the cleaned series.
    ///
    /// Always returns a usable curve: NaN samples are removed first and each fallback starts
    /// from the same cleaned input.
    pub fn flatten_or_normalize(&self, window: usize) -> LightCurve {
        let cleaned = self.remove_nans();
        match cleaned.flatten(window) {
            Ok(flat) => flat,
            Err(flatten_err) => {
                debug!(error = %flatten_err, "flatten failed, normalizing instead");
                cleaned.normalize().unwrap_or_else(|normalize_err| {
                    debug!(error = %normalize_err, "normalize failed, keeping raw series");
                    cleaned
                })
            }
        }
    }

    /// Fold the light curve on an orbital period.
    ///
    /// Arguments
    /// -----------------
    /// * `period`: orbital period in days.
    /// * `epoch`: mid-transit time **in the frame of this light curve**.
    ///
    /// Return
    /// ----------
    /// * A [`FoldedCurve`] whose phase is in days from the transit center, within
    ///   `[-period/2, period/2)`, sorted ascending.
    pub fn fold(&self, period: Day, epoch: Day) -> Result<FoldedCurve, ExofoldError> {
        if !(period.is_finite() && period > 0.0) {
            return Err(ExofoldError::InvalidPeriod(period));
        }
        if !epoch.is_finite() {
            return Err(ExofoldError::InvalidInput(format!("invalid epoch {epoch}")));
        }
        let cleaned = self.remove_nans();
        if cleaned.is_empty() {
            return Err(ExofoldError::EmptyLightCurve);
        }

        let half = 0.5 * period;
        let phase: Vec<f64> = cleaned
            .time
            .iter()
            .map(|t| (t - epoch + half).rem_euclid(period) - half)
            .collect();
        let order: Vec<usize> = (0..phase.len())
            .sorted_by(|&a, &b| phase[a].total_cmp(&phase[b]))
            .collect();

        Ok(FoldedCurve {
            phase: order.iter().map(|&i| phase[i]).collect(),
            flux: order.iter().map(|&i| cleaned.flux[i]).collect(),
            flux_err: order.iter().map(|&i| cleaned.flux_err[i]).collect(),
        })
    }
}

impl FoldedCurve {
    /// Average the folded samples in fixed-width phase bins.
    ///
    /// Bins start at the smallest phase. Each non-empty bin yields one sample at its center
    /// with the mean flux and the propagated uncertainty `sqrt(Σσ²) / n`.
    ///
    /// Return
    /// ----------
    /// * [`ExofoldError::NotEnoughSamplesToBin`] for fewer than two samples or a
    ///   non-positive bin width.
    pub fn bin(&self, bin_width: Day) -> Result<FoldedCurve, ExofoldError> {
        if self.len() < 2 || !(bin_width.is_finite() && bin_width > 0.0) {
            return Err(ExofoldError::NotEnoughSamplesToBin(self.len()));
        }
        let start = self.phase[0];
        let bin_of = |i: &usize| ((self.phase[*i] - start) / bin_width).floor() as i64;

        let mut binned = FoldedCurve::default();
        for (bin, members) in &(0..self.len()).chunk_by(bin_of) {
            let members: Vec<usize> = members.collect();
            let n = members.len() as f64;
            let mean_flux = members.iter().map(|&i| self.flux[i]).sum::<f64>() / n;
            let err = members
                .iter()
                .map(|&i| self.flux_err[i].powi(2))
                .sum::<f64>()
                .sqrt()
                / n;
            binned.phase.push(start + (bin as f64 + 0.5) * bin_width);
            binned.flux.push(mean_flux);
            binned.flux_err.push(err);
        }
        Ok(binned)
    }
}

/// Merge observation segments into one continuous, chronologically ordered series.
///
/// Each segment is cleaned of NaN samples and normalized by its own median (kept raw when
/// it cannot be normalized), brought into the time frame of the first segment with a
/// recognized format, then concatenated and sorted by time. When any non-empty segment has
/// an unrecognized format, the merged frame stays unrecognized and recognized segments are
/// shifted to plain BJD.
///
/// Return
/// ----------
/// * The merged light curve; empty when no segment holds a finite sample.
pub fn stitch(segments: &[LightCurve]) -> LightCurve {
    let formats: Vec<TimeFormat> = segments
        .iter()
        .filter(|s| s.time.iter().zip(&s.flux).any(|(t, f)| t.is_finite() && f.is_finite()))
        .map(|s| s.time_format)
        .collect();
    // A recognized frame is only claimed when every segment carries one.
    let frame = if formats.iter().all(TimeFormat::is_recognized) {
        formats.first().copied().unwrap_or_default()
    } else {
        TimeFormat::Unrecognized
    };

    let mut merged = LightCurve {
        time_format: frame,
        ..LightCurve::default()
    };
    for segment in segments {
        let cleaned = segment.remove_nans();
        if cleaned.is_empty() {
            continue;
        }
        let normalized = cleaned.normalize().unwrap_or(cleaned);
        let aligned = normalized.to_time_format(frame);
        merged.time.extend(aligned.time);
        merged.flux.extend(aligned.flux);
        merged.flux_err.extend(aligned.flux_err);
    }
    merged.sorted_by_time()
}
