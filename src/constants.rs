//! # Constants and type definitions for exofold
//!
//! This module centralizes the **time-frame offsets**, **default pipeline settings**, and
//! **unit aliases** used throughout the crate.
//!
//! ## Overview
//!
//! - Zero-point offsets of the mission time conventions (BTJD, BKJD) to BJD
//! - Default mission / author preference tables for light-curve acquisition
//! - Default processing thresholds (flatten window, fold bin width, retry policy)
//! - Catalog table and column names used by the parameter lookups
//!
//! The defaults are only starting values for
//! [`PipelineConfigBuilder`](crate::config::PipelineConfigBuilder); nothing in the crate reads
//! them as ambient settings once a [`PipelineConfig`](crate::config::PipelineConfig) is built.

// -------------------------------------------------------------------------------------------------
// Unit aliases
// -------------------------------------------------------------------------------------------------

/// A duration or time stamp expressed in days
pub type Day = f64;

/// A duration expressed in hours
pub type Hour = f64;

/// Number of hours in a day
pub const HOURS_PER_DAY: f64 = 24.0;

/// Number of minutes in a day
pub const MINUTES_PER_DAY: f64 = 1_440.0;

// -------------------------------------------------------------------------------------------------
// Time conventions
// -------------------------------------------------------------------------------------------------

/// Barycentric TESS Julian Date zero point: BJD = BTJD + 2457000
pub const BTJD_OFFSET: Day = 2_457_000.0;

/// Barycentric Kepler Julian Date zero point: BJD = BKJD + 2454833
pub const BKJD_OFFSET: Day = 2_454_833.0;

// -------------------------------------------------------------------------------------------------
// Acquisition defaults
// -------------------------------------------------------------------------------------------------

/// Missions searched for light curves, in preference order
pub const MISSION_PRIORITY: [&str; 3] = ["TESS", "Kepler", "K2"];

/// Processing authors tried within each mission, in preference order
pub const AUTHOR_PRIORITY: [&str; 4] = ["SPOC", "QLP", "Kepler", "K2"];

/// Author label recorded when a light curve comes from the unfiltered fallback search
pub const UNFILTERED_AUTHOR: &str = "auto";

/// Width (in samples) of the trend-removal window; even values are bumped to the next odd
pub const FLATTEN_WINDOW: usize = 301;

// -------------------------------------------------------------------------------------------------
// Fold / emit defaults
// -------------------------------------------------------------------------------------------------

/// Width of the phase bins of the folded light curve, in days
pub const TIME_BIN: Day = 0.001;

/// Half-width of the plotted phase window when the transit duration is unknown
pub const DEFAULT_HALF_WINDOW: Day = 0.15;

/// Upper bound of the plotted half-window
pub const MAX_HALF_WINDOW: Day = 0.5;

/// Multiple of the transit duration shown on each side of the transit center
pub const HALF_WINDOW_DURATIONS: f64 = 3.0;

// -------------------------------------------------------------------------------------------------
// Retry / concurrency defaults
// -------------------------------------------------------------------------------------------------

/// Maximum number of acquisition + fold/emit attempts per target
pub const RETRY: u32 = 3;

/// Base of the exponential backoff between attempts, in seconds
pub const RETRY_BASE_SLEEP_SECS: f64 = 2.0;

/// Worker pool size as a multiple of the available hardware parallelism
pub const WORKER_MULTIPLIER: usize = 1;

/// Lower bound of the worker pool size
pub const MIN_WORKERS: usize = 4;

// -------------------------------------------------------------------------------------------------
// Catalog
// -------------------------------------------------------------------------------------------------

/// NASA Exoplanet Archive TAP endpoint
pub const EXOPLANET_ARCHIVE_URL: &str = "https://exoplanetarchive.ipac.caltech.edu/TAP/sync";

/// Composite planet parameters table
pub const CATALOG_TABLE: &str = "pscomppars";

pub const COL_PLANET: &str = "pl_name";
pub const COL_HOST: &str = "hostname";
pub const COL_PERIOD: &str = "pl_orbper";
pub const COL_EPOCH: &str = "pl_tranmid";
pub const COL_DURATION: &str = "pl_trandur";

/// Columns requested from the catalog and expected in a full local input file
pub const TARGET_COLUMNS: [&str; 5] = [COL_PLANET, COL_HOST, COL_PERIOD, COL_EPOCH, COL_DURATION];
