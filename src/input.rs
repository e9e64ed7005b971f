//! # Target list loading
//!
//! The target list comes from one of two places:
//!
//! * **a local delimited file** – the delimiter is sniffed from the first non-comment lines
//!   (`#` starts a comment). If the header names every catalog column
//!   (`pl_name, hostname, pl_orbper, pl_tranmid, pl_trandur`) the rows are used as they are;
//!   otherwise the first column is read as a list of planet names, each completed by a
//!   catalog lookup. The configured start offset and maximum count select the rows.
//! * **a remote catalog page** when no input file is available: every planet with a known
//!   period and mid-transit time, bounded by the maximum count.
use std::fs;

use camino::Utf8Path;
use futures::stream::{self, StreamExt, TryStreamExt};
use itertools::Itertools;
use tracing::{info, warn};

use crate::catalog::resolver::ParameterResolver;
use crate::catalog::{CatalogRow, CatalogService};
use crate::config::PipelineConfig;
use crate::constants::{COL_DURATION, COL_EPOCH, COL_PERIOD, TARGET_COLUMNS};
use crate::exofold_errors::ExofoldError;
use crate::target::{RawParameters, Target, TargetRow};
use crate::units::RawValue;

/// Delimiters tried by [`sniff_delimiter`], in preference order.
pub const DELIMITER_CANDIDATES: [u8; 5] = [b',', b'\t', b';', b'|', b':'];

/// Condition of the remote catalog page.
pub const REMOTE_CONDITION: &str = "pl_tranmid IS NOT NULL AND pl_orbper IS NOT NULL";

const SNIFF_MAX_LINES: usize = 200;
const SNIFF_SAMPLE_LINES: usize = 20;

/// Guess the delimiter of a text sample.
///
/// Up to 20 non-blank, non-comment lines among the first 200 are sampled. The first
/// candidate appearing the same, non-zero number of times on every sampled line wins;
/// `,` is the fallback.
pub fn sniff_delimiter(text: &str) -> u8 {
    let sample: Vec<&str> = text
        .lines()
        .take(SNIFF_MAX_LINES)
        .filter(|l| !l.trim().is_empty() && !l.trim_start().starts_with('#'))
        .take(SNIFF_SAMPLE_LINES)
        .collect();

    DELIMITER_CANDIDATES
        .into_iter()
        .find(|&d| {
            let counts: Vec<usize> = sample
                .iter()
                .map(|l| l.bytes().filter(|&b| b == d).count())
                .collect();
            counts.first().is_some_and(|&n| n > 0) && counts.iter().all_equal()
        })
        .unwrap_or(b',')
}

/// Rows of a local input file.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalTargets {
    /// The file carries every catalog column
    Full(Vec<TargetRow>),
    /// The file only names planets
    Names(Vec<String>),
}

/// Read a local target file.
///
/// Arguments
/// -----------------
/// * `path`: delimited file with a header line.
/// * `start`: number of data rows to skip.
/// * `max`: maximum number of rows to keep.
pub fn read_local_targets(
    path: &Utf8Path,
    start: usize,
    max: Option<usize>,
) -> Result<LocalTargets, ExofoldError> {
    let content = fs::read_to_string(path)?;
    let delimiter = sniff_delimiter(&content);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .comment(Some(b'#'))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);
    let full_columns: Option<Vec<usize>> = TARGET_COLUMNS.iter().map(|&c| column(c)).collect();
    let take = max.unwrap_or(usize::MAX);

    let records = reader
        .records()
        .skip(start)
        .take(take)
        .collect::<Result<Vec<_>, _>>()?;

    match full_columns {
        Some(idx) => {
            let cell = |record: &csv::StringRecord, i: usize| {
                RawValue::from_cell(record.get(idx[i]).unwrap_or_default())
            };
            let rows = records
                .iter()
                .filter_map(|record| {
                    let planet = cell(record, 0).as_text()?;
                    Some(TargetRow::new(
                        Target::new(planet, cell(record, 1).as_text()),
                        RawParameters {
                            period: cell(record, 2),
                            epoch: cell(record, 3),
                            duration: cell(record, 4),
                        },
                    ))
                })
                .unique_by(|row| row.target.planet.clone())
                .collect();
            Ok(LocalTargets::Full(rows))
        }
        None => Ok(LocalTargets::Names(
            records
                .iter()
                .filter_map(|record| record.get(0).map(str::trim))
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .unique()
                .collect(),
        )),
    }
}

/// Input row built from a catalog row; `None` when the row names no planet.
pub fn row_from_catalog(row: &CatalogRow) -> Option<TargetRow> {
    let planet = row.planet()?;
    Some(TargetRow::new(
        Target::new(planet, row.host()),
        RawParameters {
            period: row.get(COL_PERIOD).clone(),
            epoch: row.get(COL_EPOCH).clone(),
            duration: row.get(COL_DURATION).clone(),
        },
    ))
}

/// Complete a list of names with catalog lookups, preserving the input order.
///
/// Lookups run concurrently, at most `concurrency` at a time. A name without a catalog
/// answer is kept with absent parameters.
pub async fn enrich_names(
    names: Vec<String>,
    resolver: &ParameterResolver,
    concurrency: usize,
) -> Result<Vec<TargetRow>, ExofoldError> {
    stream::iter(names)
        .map(|name| async move {
            let found = resolver.lookup(&name).await?;
            Ok::<_, ExofoldError>(match found.as_ref().and_then(row_from_catalog) {
                Some(mut row) => {
                    // Keep the requested name: it is the identity of the target.
                    row.target.planet = name;
                    row
                }
                None => TargetRow::name_only(Target::new(name, None)),
            })
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}

/// Load the targets of a run.
///
/// Return
/// ----------
/// * Targets in input order. Fails on an unreadable input file or a failed remote page.
pub async fn load_targets(
    input: Option<&Utf8Path>,
    config: &PipelineConfig,
    catalog: &dyn CatalogService,
    resolver: &ParameterResolver,
) -> Result<Vec<TargetRow>, ExofoldError> {
    match input {
        Some(path) if path.is_file() => {
            info!(%path, "reading local target list");
            match read_local_targets(path, config.start_index, config.max_targets)? {
                LocalTargets::Full(rows) => Ok(rows),
                LocalTargets::Names(names) => {
                    enrich_names(names, resolver, config.pool_size()).await
                }
            }
        }
        _ => {
            if let Some(path) = input {
                warn!(%path, "input file not found, querying the catalog instead");
            }
            let rows = catalog
                .query_where(
                    &config.catalog_table,
                    &TARGET_COLUMNS,
                    REMOTE_CONDITION,
                    config.max_targets,
                )
                .await?;
            Ok(rows
                .iter()
                .filter_map(row_from_catalog)
                .unique_by(|row| row.target.planet.clone())
                .collect())
        }
    }
}
