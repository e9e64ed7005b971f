//! # Planet catalog access
//!
//! Orbital parameters come from a remote catalog of confirmed planets. The catalog is an
//! external collaborator reached through the [`CatalogService`] trait; the crate ships
//! [`ExoplanetArchive`](crate::catalog::exoplanet_archive::ExoplanetArchive), a client of the
//! NASA Exoplanet Archive TAP service.
//!
//! Modules
//! -----------------
//! * [`exoplanet_archive`] – TAP/ADQL implementation of [`CatalogService`].
//! * [`resolver`] – [`ParameterResolver`](crate::catalog::resolver::ParameterResolver), which
//!   combines the local input row with a catalog lookup.
use std::collections::HashMap;

use async_trait::async_trait;

use crate::constants::{COL_DURATION, COL_EPOCH, COL_HOST, COL_PERIOD, COL_PLANET};
use crate::exofold_errors::ExofoldError;
use crate::target::RawParameters;
use crate::units::RawValue;

pub mod exoplanet_archive;
pub mod resolver;

/// One catalog row: field name → raw value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogRow(pub HashMap<String, RawValue>);

static NULL: RawValue = RawValue::Null;

impl CatalogRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion, handy for fixtures.
    pub fn with(mut self, field: &str, value: RawValue) -> Self {
        self.0.insert(field.to_string(), value);
        self
    }

    /// Value of a field; [`RawValue::Null`] when the field is missing.
    pub fn get(&self, field: &str) -> &RawValue {
        self.0.get(field).unwrap_or(&NULL)
    }

    pub fn planet(&self) -> Option<String> {
        self.get(COL_PLANET).as_text()
    }

    pub fn host(&self) -> Option<String> {
        self.get(COL_HOST).as_text()
    }

    /// Raw period / epoch / duration values of the row.
    pub fn raw_parameters(&self) -> RawParameters {
        RawParameters {
            period: self.get(COL_PERIOD).clone(),
            epoch: self.get(COL_EPOCH).clone(),
            duration: self.get(COL_DURATION).clone(),
        }
    }
}

/// Escape a string literal for an ADQL query.
pub fn escape_adql(value: &str) -> String {
    value.replace('\'', "''")
}

/// Catalog lookup service.
///
/// Implementations may fail transiently; callers treat every error as a soft event.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Rows of `table` whose planet name is exactly `exact_name`.
    ///
    /// Arguments
    /// -----------------
    /// * `table`: catalog table (e.g. `pscomppars`).
    /// * `fields`: columns to return.
    /// * `exact_name`: planet name, matched verbatim.
    ///
    /// Return
    /// ----------
    /// * Zero, one or (for duplicated catalog entries) several rows.
    async fn query(
        &self,
        table: &str,
        fields: &[&str],
        exact_name: &str,
    ) -> Result<Vec<CatalogRow>, ExofoldError>;

    /// A page of rows matching an ADQL condition, at most `limit` rows when set.
    async fn query_where(
        &self,
        table: &str,
        fields: &[&str],
        condition: &str,
        limit: Option<usize>,
    ) -> Result<Vec<CatalogRow>, ExofoldError>;
}
