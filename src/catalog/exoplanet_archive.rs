//! NASA Exoplanet Archive client.
//!
//! Queries go through the synchronous TAP endpoint with an ADQL statement and
//! `format=json`, which answers with a JSON array of objects (one per row):
//!
//! ```text
//! GET /TAP/sync?query=select pl_name,hostname,pl_orbper from pscomppars where pl_name = 'Kepler-10 b'&format=json
//! [{"pl_name":"Kepler-10 b","hostname":"Kepler-10","pl_orbper":0.837495}]
//! ```
use async_trait::async_trait;
use itertools::Itertools;

use super::{escape_adql, CatalogRow, CatalogService};
use crate::constants::{COL_PLANET, EXOPLANET_ARCHIVE_URL};
use crate::env_state::ExofoldEnv;
use crate::exofold_errors::ExofoldError;
use crate::units::RawValue;

#[derive(Debug, Clone)]
pub struct ExoplanetArchive {
    env: ExofoldEnv,
    endpoint: String,
}

impl ExoplanetArchive {
    pub fn new(env: ExofoldEnv) -> Self {
        Self::with_endpoint(env, EXOPLANET_ARCHIVE_URL)
    }

    pub fn with_endpoint(env: ExofoldEnv, endpoint: impl Into<String>) -> Self {
        ExoplanetArchive {
            env,
            endpoint: endpoint.into(),
        }
    }

    async fn run(&self, adql: &str) -> Result<Vec<CatalogRow>, ExofoldError> {
        let response = self
            .env
            .get_json(&self.endpoint, &[("query", adql), ("format", "json")])
            .await?;
        parse_rows(&response)
    }
}

/// Build an ADQL `select` statement.
pub(crate) fn build_adql(
    table: &str,
    fields: &[&str],
    condition: &str,
    limit: Option<usize>,
) -> String {
    let top = limit.map(|n| format!("top {n} ")).unwrap_or_default();
    format!(
        "select {top}{} from {table} where {condition}",
        fields.iter().join(",")
    )
}

/// Decode a TAP JSON answer into catalog rows.
pub(crate) fn parse_rows(response: &serde_json::Value) -> Result<Vec<CatalogRow>, ExofoldError> {
    let rows = response.as_array().ok_or_else(|| {
        ExofoldError::CatalogError(format!("expected a JSON array, got: {response}"))
    })?;
    rows.iter()
        .map(|row| {
            let object = row.as_object().ok_or_else(|| {
                ExofoldError::CatalogError(format!("expected a JSON object, got: {row}"))
            })?;
            Ok(CatalogRow(
                object
                    .iter()
                    .map(|(k, v)| (k.clone(), RawValue::from(v)))
                    .collect(),
            ))
        })
        .collect()
}

#[async_trait]
impl CatalogService for ExoplanetArchive {
    async fn query(
        &self,
        table: &str,
        fields: &[&str],
        exact_name: &str,
    ) -> Result<Vec<CatalogRow>, ExofoldError> {
        let condition = format!("{COL_PLANET} = '{}'", escape_adql(exact_name));
        self.run(&build_adql(table, fields, &condition, None)).await
    }

    async fn query_where(
        &self,
        table: &str,
        fields: &[&str],
        condition: &str,
        limit: Option<usize>,
    ) -> Result<Vec<CatalogRow>, ExofoldError> {
        self.run(&build_adql(table, fields, condition, limit)).await
    }
}
