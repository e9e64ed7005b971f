//! # Fold-and-emit
//!
//! Final stage of a target: fold the acquired light curve on the resolved period and epoch,
//! then persist three things:
//!
//! 1. a table of the folded samples (`phase_day, flux, flux_err`),
//! 2. a scatter plot of the folded (faint) and binned (opaque) samples restricted to a
//!    display half-window around the transit,
//! 3. one manifest record naming both artifacts.
//!
//! Artifacts are written to a temporary sibling and renamed into place, so a file at the
//! final path is always complete. The table is written before the plot; since presence of
//! both is the completion signal, an interrupted emit is redone on the next run.
//!
//! Modules
//! -----------------
//! * [`plot`] – [`Figure`](crate::emit::plot::Figure) and the SVG renderer.
//! * [`table`] – delimited table writer.
use std::fs;
use std::sync::Arc;

use camino::Utf8Path;
use hifitime::{Epoch, TimeScale};
use tracing::debug;

use crate::archive::acquirer::AcquiredCurve;
use crate::config::{ArtifactPaths, PipelineConfig};
use crate::constants::{Day, Hour, HALF_WINDOW_DURATIONS, HOURS_PER_DAY, MAX_HALF_WINDOW};
use crate::exofold_errors::ExofoldError;
use crate::journal::{Journal, ManifestRecord};
use crate::target::Target;

pub mod plot;
pub mod table;

use plot::{Figure, PlotRenderer};
use table::TableWriter;

/// Julian date of the MJD origin.
const MJD_OFFSET: f64 = 2_400_000.5;

/// Symmetric display half-window around the transit, in days of phase.
///
/// `min(0.5, 3 × duration / period)` when the duration is known and finite, `default`
/// otherwise.
///
/// ```
/// use exofold::emit::half_window;
/// assert!((half_window(Some(4.0), 10.0, 0.15) - 0.05).abs() < 1e-12);
/// assert_eq!(half_window(None, 10.0, 0.15), 0.15);
/// ```
pub fn half_window(duration: Option<Hour>, period: Day, default: Day) -> Day {
    match duration {
        Some(hours) if hours.is_finite() => {
            MAX_HALF_WINDOW.min(HALF_WINDOW_DURATIONS * (hours / HOURS_PER_DAY) / period)
        }
        _ => default,
    }
}

/// Write `bytes` to `path` through a temporary sibling file.
pub(crate) fn write_atomic(path: &Utf8Path, bytes: &[u8]) -> Result<(), ExofoldError> {
    let file_name = path.file_name().unwrap_or("artifact");
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path).inspect_err(|_| {
        let _ = fs::remove_file(&tmp);
    })?;
    Ok(())
}

/// Reference epoch (BJD, TDB) as a calendar date.
pub fn epoch_to_iso(t0_bjd: Day) -> Option<String> {
    t0_bjd
        .is_finite()
        .then(|| Epoch::from_mjd_in_time_scale(t0_bjd - MJD_OFFSET, TimeScale::TDB).to_string())
}

#[derive(Clone)]
pub struct FoldEmitter {
    config: Arc<PipelineConfig>,
    plot: Arc<dyn PlotRenderer>,
    table: Arc<dyn TableWriter>,
    manifest: Arc<Journal>,
}

impl FoldEmitter {
    pub fn new(
        config: Arc<PipelineConfig>,
        plot: Arc<dyn PlotRenderer>,
        table: Arc<dyn TableWriter>,
        manifest: Arc<Journal>,
    ) -> Self {
        FoldEmitter {
            config,
            plot,
            table,
            manifest,
        }
    }

    /// Artifact paths of a target, with the renderer's plot extension.
    pub fn artifacts_for(&self, target: &Target) -> ArtifactPaths {
        let mut paths = self.config.layout.artifacts_for(target);
        paths.plot.set_extension(self.plot.extension());
        paths
    }

    /// Fold a light curve and persist its table, plot and manifest record.
    ///
    /// Arguments
    /// -----------------
    /// * `target`: planet and host.
    /// * `period`: orbital period, days.
    /// * `t0_bjd`: reference epoch, BJD. Converted to the frame of the curve before folding.
    /// * `duration`: transit duration, hours, if known.
    /// * `acquired`: light curve and provenance.
    ///
    /// Return
    /// ----------
    /// * The written artifact paths.
    pub fn emit(
        &self,
        target: &Target,
        period: Day,
        t0_bjd: Day,
        duration: Option<Hour>,
        acquired: &AcquiredCurve,
    ) -> Result<ArtifactPaths, ExofoldError> {
        let paths = self.artifacts_for(target);
        let offset = acquired.curve.time_offset();

        let folded = acquired.curve.fold(period, t0_bjd - offset)?;
        let binned = folded.bin(self.config.time_bin).unwrap_or_else(|e| {
            debug!(planet = %target.planet, error = %e, "binning skipped");
            folded.clone()
        });
        let half = half_window(duration, period, self.config.default_half_window);

        self.table.write(
            &paths.table,
            &[
                ("phase_day", folded.phase.as_slice()),
                ("flux", folded.flux.as_slice()),
                ("flux_err", folded.flux_err.as_slice()),
            ],
        )?;

        let mut figure = Figure::new(
            format!(
                "{} transit (mission={}, author={})",
                target.planet, acquired.mission, acquired.author
            ),
            "Phase (day)",
            "Normalized flux",
            (-half, half),
        );
        for (label, curve, opacity) in [("Folded", &folded, 0.3), ("Binned", &binned, 1.0)] {
            if let Err(e) = figure.scatter(label, &curve.points_within(half), opacity) {
                debug!(planet = %target.planet, error = %e, "plot layer dropped");
            }
        }
        self.plot.save(&figure, &paths.plot)?;

        self.manifest.append(&ManifestRecord {
            planet: target.planet.clone(),
            host: target.host.clone(),
            period_day: period,
            t0_bjd,
            t0_iso: epoch_to_iso(t0_bjd),
            duration_hr: duration,
            time_offset_applied: offset,
            mission: acquired.mission.clone(),
            author: acquired.author.clone(),
            plot: file_name(&paths.plot),
            table: file_name(&paths.table),
        })?;
        Ok(paths)
    }
}

fn file_name(path: &Utf8Path) -> String {
    path.file_name().unwrap_or_default().to_string()
}
