//! Reference-epoch estimation from a light curve.
//!
//! When no catalog provides a mid-transit time but the period is known, a rough epoch is
//! taken at the deepest point of the smoothed light curve. This is a heuristic, not a fit.
use crate::constants::Day;
use crate::exofold_errors::ExofoldError;
use crate::lightcurve::processing::rolling_median;
use crate::lightcurve::LightCurve;

/// Smoothing window: 1% of the samples, at least 3.
pub fn smoothing_window(samples: usize) -> usize {
    (samples / 100).max(3)
}

/// Estimate a mid-transit time, in BJD.
///
/// The flux is smoothed with a centered rolling median of [`smoothing_window`] samples
/// (truncated at the edges), the first global minimum of the smoothed flux is selected and
/// its time is shifted by the zero-point offset of the curve.
///
/// Return
/// ----------
/// * The estimated epoch, or [`ExofoldError::EmptyLightCurve`] when no finite sample exists.
pub fn estimate_epoch(curve: &LightCurve) -> Result<Day, ExofoldError> {
    let smoothed = rolling_median(&curve.flux, smoothing_window(curve.len()));
    let deepest = smoothed
        .iter()
        .enumerate()
        .filter(|(i, v)| v.is_finite() && curve.time[*i].is_finite())
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
            Some((_, b)) if b <= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
        .ok_or(ExofoldError::EmptyLightCurve)?;

    Ok(curve.time[deepest] + curve.time_offset())
}

#[cfg(test)]
mod epoch_test {
    use super::*;
    use crate::lightcurve::TimeFormat;
    use approx::assert_relative_eq;

    #[test]
    fn test_smoothing_window() {
        assert_eq!(smoothing_window(0), 3);
        assert_eq!(smoothing_window(299), 3);
        assert_eq!(smoothing_window(1000), 10);
    }

    #[test]
    fn test_dip_location_with_offset() {
        let time: Vec<f64> = (0..500).map(|i| 1000.0 + i as f64 * 0.01).collect();
        let flux: Vec<f64> = time
            .iter()
            .map(|t| if (t - 1002.5).abs() < 0.05 { 0.99 } else { 1.0 })
            .collect();
        let lc = LightCurve::new(time, flux, vec![], TimeFormat::Btjd).unwrap();
        let t0 = estimate_epoch(&lc).unwrap();
        assert_relative_eq!(t0, 2457000.0 + 1002.5, epsilon = 0.06);
    }

    #[test]
    fn test_single_outlier_is_smoothed_away() {
        let mut flux = vec![1.0; 50];
        flux[10] = 0.5;
        flux[30] = 0.98;
        flux[31] = 0.98;
        flux[32] = 0.98;
        let time: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let lc = LightCurve::new(time, flux, vec![], TimeFormat::Unrecognized).unwrap();
        assert_eq!(estimate_epoch(&lc).unwrap(), 30.0);
    }

    #[test]
    fn test_empty_curve() {
        assert_eq!(
            estimate_epoch(&LightCurve::default()),
            Err(ExofoldError::EmptyLightCurve)
        );
    }
}
