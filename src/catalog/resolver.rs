//! # Parameter resolution
//!
//! [`ParameterResolver::resolve`] turns the raw cells of an input row into normalized
//! [`TargetParameters`]:
//!
//! 1. the local row is normalized (period/epoch in days, duration in hours, sentinels absent);
//! 2. if period or epoch is still missing, the catalog is queried by exact planet name and
//!    **only the missing fields** are filled from the answer;
//! 3. a failed lookup is a soft `fetch_params_error` event: the fields simply stay absent.
//!
//! Several rows for one name are resolved deterministically to the first row; the ambiguity
//! is recorded as an `ambiguous_catalog_match` event.
use std::sync::Arc;

use tracing::{debug, warn};

use super::{CatalogRow, CatalogService};
use crate::constants::TARGET_COLUMNS;
use crate::exofold_errors::ExofoldError;
use crate::journal::{Journal, LogEvent};
use crate::target::{RawParameters, TargetParameters, TargetRow};
use crate::units::{as_days, as_hours};

/// Normalize raw cells into parameters.
pub fn normalize(raw: &RawParameters) -> TargetParameters {
    TargetParameters {
        period: as_days(&raw.period),
        epoch: as_days(&raw.epoch),
        duration: as_hours(&raw.duration),
    }
}

#[derive(Clone)]
pub struct ParameterResolver {
    catalog: Arc<dyn CatalogService>,
    table: String,
    log: Arc<Journal>,
}

impl ParameterResolver {
    pub fn new(catalog: Arc<dyn CatalogService>, table: impl Into<String>, log: Arc<Journal>) -> Self {
        ParameterResolver {
            catalog,
            table: table.into(),
            log,
        }
    }

    /// Resolve the parameters of one input row.
    ///
    /// Return
    /// ----------
    /// * The (possibly still partial) parameters. `Err` only when the run journal fails.
    pub async fn resolve(&self, row: &TargetRow) -> Result<TargetParameters, ExofoldError> {
        let mut params = normalize(&row.local);
        if params.needs_lookup() {
            if let Some(remote) = self.lookup(&row.target.planet).await? {
                params.backfill(&normalize(&remote.raw_parameters()));
            }
        }
        Ok(params)
    }

    /// Catalog row of a planet under the first-row policy.
    ///
    /// Return
    /// ----------
    /// * `Ok(Some(row))` – the first matching row,
    /// * `Ok(None)` – no match, or the lookup failed (logged as `fetch_params_error`),
    /// * `Err` – the run journal could not be written.
    pub async fn lookup(&self, planet: &str) -> Result<Option<CatalogRow>, ExofoldError> {
        match self.catalog.query(&self.table, &TARGET_COLUMNS, planet).await {
            Ok(rows) => {
                debug!(planet, rows = rows.len(), "catalog lookup");
                if rows.len() > 1 {
                    self.log.append(&LogEvent::AmbiguousCatalogMatch {
                        planet: planet.to_string(),
                        rows: rows.len(),
                    })?;
                }
                Ok(rows.into_iter().next())
            }
            Err(e) => {
                warn!(planet, error = %e, "catalog lookup failed");
                self.log.append(&LogEvent::FetchParamsError {
                    planet: planet.to_string(),
                    error: e.to_string(),
                })?;
                Ok(None)
            }
        }
    }
}
