//! # Pipeline configuration
//!
//! This module defines [`PipelineConfig`], the single immutable settings value of a run, and
//! its builder. The configuration is built once at startup, validated by
//! [`PipelineConfigBuilder::build`], then shared as `Arc<PipelineConfig>` by the
//! orchestrator, the target workers and the curve acquirer.
//!
//! ## Contents
//!
//! - [`OutputLayout`] – where plots, tables, the manifest and the run log live,
//! - acquisition preferences (mission and author priority tables, flatten window),
//! - fold/emit settings (bin width, default plot half-window),
//! - retry policy (ceiling, exponential backoff base),
//! - worker pool sizing,
//! - input selection (start offset, maximum count, catalog table).
//!
//! ## Example
//!
//! ```rust,no_run
//! use exofold::config::PipelineConfig;
//!
//! let config = PipelineConfig::builder()
//!     .output_root("/tmp/exofold")
//!     .retry(5)
//!     .max_targets(Some(20))
//!     .build()
//!     .unwrap();
//! config.layout.create_dirs().unwrap();
//! ```
use std::cmp::Ordering::Greater;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};

use crate::constants::{
    Day, AUTHOR_PRIORITY, CATALOG_TABLE, DEFAULT_HALF_WINDOW, FLATTEN_WINDOW, MAX_HALF_WINDOW,
    MIN_WORKERS, MISSION_PRIORITY, RETRY, RETRY_BASE_SLEEP_SECS, TIME_BIN, WORKER_MULTIPLIER,
};
use crate::exofold_errors::ExofoldError;
use crate::target::Target;

/// Directory layout of a run.
///
/// ```text
/// <root>/
/// ├── svg/             one plot per target
/// ├── csv/             one folded table per target
/// ├── lk_cache/        local light-curve archive
/// ├── manifest.jsonl   one record per emitted target
/// └── run_log.jsonl    progress and outcome events
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct OutputLayout {
    pub root: Utf8PathBuf,
    pub plot_dir: Utf8PathBuf,
    pub table_dir: Utf8PathBuf,
    pub cache_dir: Utf8PathBuf,
    pub manifest_path: Utf8PathBuf,
    pub log_path: Utf8PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl AsRef<Utf8Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        OutputLayout {
            plot_dir: root.join("svg"),
            table_dir: root.join("csv"),
            cache_dir: root.join("lk_cache"),
            manifest_path: root.join("manifest.jsonl"),
            log_path: root.join("run_log.jsonl"),
            root,
        }
    }

    /// Create every directory of the layout (no-op for those that exist).
    pub fn create_dirs(&self) -> Result<(), ExofoldError> {
        for dir in [&self.root, &self.plot_dir, &self.table_dir, &self.cache_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Deterministic artifact paths of a target.
    pub fn artifacts_for(&self, target: &Target) -> ArtifactPaths {
        let stem = target.file_stem();
        ArtifactPaths {
            plot: self.plot_dir.join(format!("{stem}.svg")),
            table: self.table_dir.join(format!("{stem}.csv")),
        }
    }
}

impl Default for OutputLayout {
    fn default() -> Self {
        OutputLayout::new("exofold_output")
    }
}

/// Plot and table paths of one target.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactPaths {
    pub plot: Utf8PathBuf,
    pub table: Utf8PathBuf,
}

impl ArtifactPaths {
    /// The idempotency signal: both artifacts are present.
    pub fn exist(&self) -> bool {
        self.plot.is_file() && self.table.is_file()
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub layout: OutputLayout,

    // --- Acquisition ---
    pub mission_priority: Vec<String>,
    pub author_priority: Vec<String>,
    pub flatten_window: usize,

    // --- Fold / emit ---
    pub time_bin: Day,
    pub default_half_window: Day,

    // --- Retry ---
    pub retry: u32,
    pub retry_base_sleep: Duration,

    // --- Concurrency ---
    pub worker_multiplier: usize,
    pub min_workers: usize,

    // --- Input ---
    pub catalog_table: String,
    pub start_index: usize,
    pub max_targets: Option<usize>,
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::new()
    }

    /// Flatten window forced to an odd number of samples.
    pub fn odd_flatten_window(&self) -> usize {
        if self.flatten_window % 2 == 0 {
            self.flatten_window + 1
        } else {
            self.flatten_window
        }
    }

    /// Sleep before the attempt following the failed attempt `attempt` (0-based).
    ///
    /// `retry_base_sleep × 2^attempt`, saturating at [`Duration::MAX`].
    pub fn backoff(&self, attempt: u32) -> Duration {
        // 2^1023 is the largest finite power of two, so a zero base stays zero.
        let factor = 2f64.powi(attempt.min(f64::MAX_EXP as u32 - 1) as i32);
        Duration::try_from_secs_f64(self.retry_base_sleep.as_secs_f64() * factor)
            .unwrap_or(Duration::MAX)
    }

    /// Number of targets processed concurrently.
    ///
    /// `max(min_workers, worker_multiplier × available parallelism)`.
    pub fn pool_size(&self) -> usize {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        (self.worker_multiplier * cpus).max(self.min_workers)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            layout: OutputLayout::default(),

            mission_priority: MISSION_PRIORITY.iter().map(|m| m.to_string()).collect(),
            author_priority: AUTHOR_PRIORITY.iter().map(|a| a.to_string()).collect(),
            flatten_window: FLATTEN_WINDOW,

            time_bin: TIME_BIN,
            default_half_window: DEFAULT_HALF_WINDOW,

            retry: RETRY,
            retry_base_sleep: Duration::from_secs_f64(RETRY_BASE_SLEEP_SECS),

            worker_multiplier: WORKER_MULTIPLIER,
            min_workers: MIN_WORKERS,

            catalog_table: CATALOG_TABLE.to_string(),
            start_index: 0,
            max_targets: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    pub fn output_root(mut self, root: impl AsRef<Utf8Path>) -> Self {
        self.config.layout = OutputLayout::new(root);
        self
    }
    pub fn layout(mut self, layout: OutputLayout) -> Self {
        self.config.layout = layout;
        self
    }
    pub fn cache_dir(mut self, dir: impl AsRef<Utf8Path>) -> Self {
        self.config.layout.cache_dir = dir.as_ref().to_path_buf();
        self
    }

    // --- Acquisition ---
    pub fn mission_priority<S: Into<String>>(mut self, v: impl IntoIterator<Item = S>) -> Self {
        self.config.mission_priority = v.into_iter().map(Into::into).collect();
        self
    }
    pub fn author_priority<S: Into<String>>(mut self, v: impl IntoIterator<Item = S>) -> Self {
        self.config.author_priority = v.into_iter().map(Into::into).collect();
        self
    }
    pub fn flatten_window(mut self, v: usize) -> Self {
        self.config.flatten_window = v;
        self
    }

    // --- Fold / emit ---
    pub fn time_bin(mut self, v: Day) -> Self {
        self.config.time_bin = v;
        self
    }
    pub fn default_half_window(mut self, v: Day) -> Self {
        self.config.default_half_window = v;
        self
    }

    // --- Retry ---
    pub fn retry(mut self, v: u32) -> Self {
        self.config.retry = v;
        self
    }
    pub fn retry_base_sleep(mut self, v: Duration) -> Self {
        self.config.retry_base_sleep = v;
        self
    }

    // --- Concurrency ---
    pub fn worker_multiplier(mut self, v: usize) -> Self {
        self.config.worker_multiplier = v;
        self
    }
    pub fn min_workers(mut self, v: usize) -> Self {
        self.config.min_workers = v;
        self
    }

    // --- Input ---
    pub fn catalog_table(mut self, v: impl Into<String>) -> Self {
        self.config.catalog_table = v.into();
        self
    }
    pub fn start_index(mut self, v: usize) -> Self {
        self.config.start_index = v;
        self
    }
    pub fn max_targets(mut self, v: Option<usize>) -> Self {
        self.config.max_targets = v;
        self
    }

    #[inline]
    fn gt0(x: f64) -> bool {
        x.partial_cmp(&0.0) == Some(Greater)
    }

    pub fn build(self) -> Result<PipelineConfig, ExofoldError> {
        let c = &self.config;

        if c.mission_priority.is_empty() {
            return Err(ExofoldError::InvalidConfig(
                "mission_priority must list at least one mission".into(),
            ));
        }
        if c.mission_priority.iter().any(|m| m.trim().is_empty())
            || c.author_priority.iter().any(|a| a.trim().is_empty())
        {
            return Err(ExofoldError::InvalidConfig(
                "mission and author labels must not be blank".into(),
            ));
        }
        if c.flatten_window < 3 {
            return Err(ExofoldError::InvalidConfig(
                "flatten_window must be at least 3 samples".into(),
            ));
        }
        if !Self::gt0(c.time_bin) {
            return Err(ExofoldError::InvalidConfig("time_bin must be > 0".into()));
        }
        if !Self::gt0(c.default_half_window) || c.default_half_window > MAX_HALF_WINDOW {
            return Err(ExofoldError::InvalidConfig(format!(
                "default_half_window must be in (0, {MAX_HALF_WINDOW}]"
            )));
        }
        if c.retry == 0 {
            return Err(ExofoldError::InvalidConfig("retry must be >= 1".into()));
        }
        if c.worker_multiplier == 0 || c.min_workers == 0 {
            return Err(ExofoldError::InvalidConfig(
                "worker_multiplier and min_workers must be >= 1".into(),
            ));
        }
        if c.catalog_table.trim().is_empty() {
            return Err(ExofoldError::InvalidConfig(
                "catalog_table must not be blank".into(),
            ));
        }
        if c.max_targets == Some(0) {
            return Err(ExofoldError::InvalidConfig(
                "max_targets must be >= 1 when set".into(),
            ));
        }

        Ok(self.config)
    }
}

#[cfg(test)]
mod config_test {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::builder().build().unwrap();
        assert_eq!(config.mission_priority, vec!["TESS", "Kepler", "K2"]);
        assert_eq!(config.author_priority, vec!["SPOC", "QLP", "Kepler", "K2"]);
        assert_eq!(config.odd_flatten_window(), 301);
        assert_eq!(config.retry, 3);
        assert!(config.pool_size() >= 4);
    }

    #[test]
    fn test_even_flatten_window_is_bumped() {
        let config = PipelineConfig::builder().flatten_window(100).build().unwrap();
        assert_eq!(config.odd_flatten_window(), 101);
    }

    #[test]
    fn test_backoff_doubles() {
        let config = PipelineConfig::builder()
            .retry_base_sleep(Duration::from_secs_f64(2.0))
            .build()
            .unwrap();
        assert_eq!(config.backoff(0), Duration::from_secs(2));
        assert_eq!(config.backoff(1), Duration::from_secs(4));
        assert_eq!(config.backoff(2), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_saturates_on_large_attempts() {
        let config = PipelineConfig::builder()
            .retry(70)
            .retry_base_sleep(Duration::from_secs(2))
            .build()
            .unwrap();
        assert_eq!(config.backoff(65), Duration::MAX);
        assert_eq!(config.backoff(u32::MAX), Duration::MAX);

        let no_sleep = PipelineConfig::builder()
            .retry_base_sleep(Duration::ZERO)
            .build()
            .unwrap();
        assert_eq!(no_sleep.backoff(1_000), Duration::ZERO);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert_eq!(
            PipelineConfig::builder().retry(0).build().unwrap_err(),
            ExofoldError::InvalidConfig("retry must be >= 1".into())
        );
        assert!(PipelineConfig::builder().time_bin(f64::NAN).build().is_err());
        assert!(PipelineConfig::builder()
            .mission_priority(Vec::<String>::new())
            .build()
            .is_err());
        assert!(PipelineConfig::builder()
            .default_half_window(0.9)
            .build()
            .is_err());
        assert!(PipelineConfig::builder().max_targets(Some(0)).build().is_err());
    }

    #[test]
    fn test_artifact_paths_use_sanitized_name() {
        let layout = OutputLayout::new("/out");
        let paths = layout.artifacts_for(&Target::new("Kepler-10 b", None));
        assert_eq!(paths.plot, Utf8PathBuf::from("/out/svg/Kepler-10_b.svg"));
        assert_eq!(paths.table, Utf8PathBuf::from("/out/csv/Kepler-10_b.csv"));
        assert!(!paths.exist());
    }
}
