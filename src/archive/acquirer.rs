//! # Curve acquisition cascade
//!
//! [`CurveAcquirer::acquire`] resolves a host name into one usable light curve by walking a
//! fixed preference table:
//!
//! ```text
//! for mission in mission_priority:          (outer loop, first mission with data wins)
//!     search(host, mission)                 failure → search_error, next mission
//!     for author in author_priority:        products filtered on the author label
//!         download → stitch                 failure → download_error, next author
//!     unfiltered: download all → stitch     failure → download_error_auto, author "auto"
//! ```
//!
//! Each step is a fallback [`Strategy`] returning a curve or nothing; the first strategy
//! yielding a non-empty stitched curve wins. The winner is detrended with
//! [`LightCurve::flatten_or_normalize`], so a success always carries usable data.
//!
//! Collaborator failures never reach the caller: they are appended to the run log and the
//! cascade moves on. `Err` is only returned when the log itself cannot be written.
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{ObservationArchive, ObservationProduct};
use crate::config::PipelineConfig;
use crate::constants::UNFILTERED_AUTHOR;
use crate::exofold_errors::ExofoldError;
use crate::journal::{Journal, LogEvent};
use crate::lightcurve::processing::stitch;
use crate::lightcurve::LightCurve;

/// A light curve together with its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquiredCurve {
    pub curve: LightCurve,
    pub mission: String,
    pub author: String,
}

/// One option of the fallback table inside a mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy<'a> {
    /// Products of a single processing author
    Author(&'a str),
    /// Every product of the mission
    Unfiltered,
}

impl Strategy<'_> {
    pub fn label(&self) -> &str {
        match self {
            Strategy::Author(author) => author,
            Strategy::Unfiltered => UNFILTERED_AUTHOR,
        }
    }

    fn select(&self, products: &[ObservationProduct]) -> Vec<ObservationProduct> {
        match self {
            Strategy::Author(author) => products
                .iter()
                .filter(|p| p.author == *author)
                .cloned()
                .collect(),
            Strategy::Unfiltered => products.to_vec(),
        }
    }
}

#[derive(Clone)]
pub struct CurveAcquirer {
    archive: Arc<dyn ObservationArchive>,
    config: Arc<PipelineConfig>,
    log: Arc<Journal>,
}

impl CurveAcquirer {
    pub fn new(
        archive: Arc<dyn ObservationArchive>,
        config: Arc<PipelineConfig>,
        log: Arc<Journal>,
    ) -> Self {
        CurveAcquirer {
            archive,
            config,
            log,
        }
    }

    /// Strategies tried within one mission, in preference order.
    pub fn strategies(&self) -> Vec<Strategy<'_>> {
        self.config
            .author_priority
            .iter()
            .map(|author| Strategy::Author(author.as_str()))
            .chain(std::iter::once(Strategy::Unfiltered))
            .collect()
    }

    /// Acquire the preferred light curve of a host.
    ///
    /// Arguments
    /// -----------------
    /// * `host`: host star name, as given to the archive search.
    ///
    /// Return
    /// ----------
    /// * `Ok(Some(curve))` – the first successful mission/author combination, detrended,
    /// * `Ok(None)` – no combination of the preference table produced data,
    /// * `Err` – the run log could not be written (fatal).
    pub async fn acquire(&self, host: &str) -> Result<Option<AcquiredCurve>, ExofoldError> {
        for mission in &self.config.mission_priority {
            let products = match self.archive.search(host, mission).await {
                Ok(products) => products,
                Err(e) => {
                    warn!(host, mission, error = %e, "search failed");
                    self.log.append(&LogEvent::SearchError {
                        host: host.to_string(),
                        mission: mission.clone(),
                        error: e.to_string(),
                    })?;
                    continue;
                }
            };
            if products.is_empty() {
                debug!(host, mission, "no product");
                continue;
            }

            for strategy in self.strategies() {
                if let Some(curve) = self.attempt(host, mission, &products, strategy).await? {
                    info!(
                        host,
                        mission,
                        author = strategy.label(),
                        samples = curve.len(),
                        "light curve acquired"
                    );
                    return Ok(Some(AcquiredCurve {
                        curve: curve.flatten_or_normalize(self.config.odd_flatten_window()),
                        mission: mission.clone(),
                        author: strategy.label().to_string(),
                    }));
                }
            }
        }
        Ok(None)
    }

    async fn attempt(
        &self,
        host: &str,
        mission: &str,
        products: &[ObservationProduct],
        strategy: Strategy<'_>,
    ) -> Result<Option<LightCurve>, ExofoldError> {
        let selected = strategy.select(products);
        if selected.is_empty() {
            return Ok(None);
        }
        match self.archive.download(&selected).await {
            Ok(segments) => {
                let stitched = stitch(&segments);
                Ok((!stitched.is_empty()).then_some(stitched))
            }
            Err(e) => {
                warn!(host, mission, author = strategy.label(), error = %e, "download failed");
                let event = match strategy {
                    Strategy::Author(author) => LogEvent::DownloadError {
                        host: host.to_string(),
                        mission: mission.to_string(),
                        author: author.to_string(),
                        error: e.to_string(),
                    },
                    Strategy::Unfiltered => LogEvent::DownloadErrorAuto {
                        host: host.to_string(),
                        mission: mission.to_string(),
                        error: e.to_string(),
                    },
                };
                self.log.append(&event)?;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod acquirer_test {
    use super::*;

    #[test]
    fn test_strategy_labels_and_selection() {
        let products = vec![
            ObservationProduct {
                host: "h".into(),
                mission: "TESS".into(),
                author: "SPOC".into(),
                location: "a.csv".into(),
            },
            ObservationProduct {
                host: "h".into(),
                mission: "TESS".into(),
                author: "QLP".into(),
                location: "b.csv".into(),
            },
        ];
        assert_eq!(Strategy::Author("QLP").select(&products).len(), 1);
        assert_eq!(Strategy::Author("K2").select(&products).len(), 0);
        assert_eq!(Strategy::Unfiltered.select(&products).len(), 2);
        assert_eq!(Strategy::Unfiltered.label(), "auto");
        assert_eq!(Strategy::Author("SPOC").label(), "SPOC");
    }
}
