use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExofoldError {
    #[error("Invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP reqwest error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("Journal append failed on {path}: {source}")]
    JournalError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Catalog query failed: {0}")]
    CatalogError(String),

    #[error("Light curve search failed for {host} ({mission}): {reason}")]
    SearchFailed {
        host: String,
        mission: String,
        reason: String,
    },

    #[error("Light curve download failed: {0}")]
    DownloadFailed(String),

    #[error("Invalid input file: {0}")]
    InvalidInput(String),

    #[error("Light curve has no usable samples")]
    EmptyLightCurve,

    #[error("Flatten window of {window} samples is wider than the light curve ({len} samples)")]
    WindowTooWide { window: usize, len: usize },

    #[error("Cannot normalize light curve: {0}")]
    DegenerateNormalization(String),

    #[error("Invalid orbital period: {0}")]
    InvalidPeriod(f64),

    #[error("Cannot bin {0} folded samples")]
    NotEnoughSamplesToBin(usize),

    #[error("Plot layer '{0}' has no point inside the axis limits")]
    EmptyPlotLayer(String),

    #[error("Worker task aborted: {0}")]
    WorkerAborted(String),
}

impl ExofoldError {
    /// Whether the error must abort the whole run.
    ///
    /// Only failures of the shared journal qualify; every other error is converted into a
    /// soft log event or a terminal outcome by the target worker.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ExofoldError::JournalError { .. } | ExofoldError::WorkerAborted(_)
        )
    }
}

impl PartialEq for ExofoldError {
    fn eq(&self, other: &Self) -> bool {
        use ExofoldError::*;
        match (self, other) {
            (InvalidConfig(a), InvalidConfig(b)) => a == b,

            // Opaque sources: same variant is enough
            (IoError(_), IoError(_)) => true,
            (CsvError(_), CsvError(_)) => true,
            (JsonError(_), JsonError(_)) => true,
            (ReqwestError(_), ReqwestError(_)) => true,
            (JournalError { path: a, .. }, JournalError { path: b, .. }) => a == b,

            (CatalogError(a), CatalogError(b)) => a == b,
            (
                SearchFailed {
                    host: h1,
                    mission: m1,
                    reason: r1,
                },
                SearchFailed {
                    host: h2,
                    mission: m2,
                    reason: r2,
                },
            ) => h1 == h2 && m1 == m2 && r1 == r2,
            (DownloadFailed(a), DownloadFailed(b)) => a == b,
            (InvalidInput(a), InvalidInput(b)) => a == b,
            (
                WindowTooWide {
                    window: w1,
                    len: l1,
                },
                WindowTooWide {
                    window: w2,
                    len: l2,
                },
            ) => w1 == w2 && l1 == l2,
            (DegenerateNormalization(a), DegenerateNormalization(b)) => a == b,
            (InvalidPeriod(a), InvalidPeriod(b)) => a.to_bits() == b.to_bits(),
            (NotEnoughSamplesToBin(a), NotEnoughSamplesToBin(b)) => a == b,
            (EmptyPlotLayer(a), EmptyPlotLayer(b)) => a == b,
            (WorkerAborted(a), WorkerAborted(b)) => a == b,

            // Unit variants
            (EmptyLightCurve, EmptyLightCurve) => true,

            _ => false,
        }
    }
}
