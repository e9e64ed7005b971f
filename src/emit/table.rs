//! Delimited numeric tables.
use camino::Utf8Path;

use super::write_atomic;
use crate::exofold_errors::ExofoldError;

/// A named numeric column.
pub type Column<'a> = (&'a str, &'a [f64]);

pub trait TableWriter: Send + Sync {
    /// Write `columns` as one table; every column must have the same length.
    fn write(&self, path: &Utf8Path, columns: &[Column<'_>]) -> Result<(), ExofoldError>;
}

/// CSV writer; non-finite values are written as empty cells.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvTableWriter;

impl TableWriter for CsvTableWriter {
    fn write(&self, path: &Utf8Path, columns: &[Column<'_>]) -> Result<(), ExofoldError> {
        let rows = columns.first().map_or(0, |(_, values)| values.len());
        if let Some((name, values)) = columns.iter().find(|(_, v)| v.len() != rows) {
            return Err(ExofoldError::InvalidInput(format!(
                "column '{name}' has {} rows, expected {rows}",
                values.len()
            )));
        }

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(columns.iter().map(|(name, _)| *name))?;
        for i in 0..rows {
            writer.write_record(columns.iter().map(|(_, values)| {
                let v = values[i];
                if v.is_finite() {
                    v.to_string()
                } else {
                    String::new()
                }
            }))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| ExofoldError::IoError(e.into_error()))?;
        write_atomic(path, &bytes)
    }
}
