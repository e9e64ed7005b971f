//! # Targets, parameters and outcomes
//!
//! A [`Target`] is one planet/host pair read from the input. It travels with the raw
//! parameter cells of its input row ([`TargetRow`]) until the
//! [`ParameterResolver`](crate::catalog::resolver::ParameterResolver) turns them into
//! [`TargetParameters`]. Every target ends in exactly one [`Outcome`].
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::constants::{Day, Hour};
use crate::units::RawValue;

static NON_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\-.]+").expect("identifier regex is valid"));

static REPEATED_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_+").expect("separator regex is valid"));

/// Map a target name to a stable, filesystem-safe identifier.
///
/// Runs of characters outside `[A-Za-z0-9_.-]` (Unicode word characters are kept) collapse
/// into a single `_`, and leading/trailing separators are removed.
///
/// ```
/// use exofold::target::sanitize_name;
/// assert_eq!(sanitize_name("Kepler-10 b"), "Kepler-10_b");
/// assert_eq!(sanitize_name("  HD 209458 b / (transit) "), "HD_209458_b_transit");
/// ```
pub fn sanitize_name(name: &str) -> String {
    let replaced = NON_IDENTIFIER.replace_all(name, "_");
    let collapsed = REPEATED_SEPARATOR.replace_all(&replaced, "_");
    collapsed.trim_matches('_').to_string()
}

/// One planet to process. Immutable once read from the input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Target {
    /// Planet name, unique per run
    pub planet: String,
    /// Host star name, used to search light curves
    pub host: String,
}

impl Target {
    /// Build a target; the host falls back to the planet name when absent or blank.
    pub fn new(planet: impl Into<String>, host: Option<String>) -> Self {
        let planet = planet.into().trim().to_string();
        let host = host
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| planet.clone());
        Target { planet, host }
    }

    /// File-name stem of this target's artifacts.
    pub fn file_stem(&self) -> String {
        sanitize_name(&self.planet)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.planet, self.host)
    }
}

/// Raw period / epoch / duration cells of one input row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawParameters {
    pub period: RawValue,
    pub epoch: RawValue,
    pub duration: RawValue,
}

/// A target together with the parameters supplied by its input row.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetRow {
    pub target: Target,
    pub local: RawParameters,
}

impl TargetRow {
    pub fn new(target: Target, local: RawParameters) -> Self {
        TargetRow { target, local }
    }

    /// A row that only names its target; every parameter comes from the catalog.
    pub fn name_only(target: Target) -> Self {
        TargetRow {
            target,
            local: RawParameters::default(),
        }
    }
}

/// Normalized orbital parameters of a target.
///
/// Every field is independently optional. A target is resolved once both `period` and
/// `epoch` are known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TargetParameters {
    /// Orbital period, days
    pub period: Option<Day>,
    /// Reference mid-transit time, BJD days
    pub epoch: Option<Day>,
    /// Transit duration, hours
    pub duration: Option<Hour>,
}

impl TargetParameters {
    pub fn is_resolved(&self) -> bool {
        self.period.is_some() && self.epoch.is_some()
    }

    /// Whether a catalog lookup could still complete the parameters.
    pub fn needs_lookup(&self) -> bool {
        !self.is_resolved()
    }

    /// Fill the absent fields from `other`, keeping every field already present.
    pub fn backfill(&mut self, other: &TargetParameters) {
        self.period = self.period.or(other.period);
        self.epoch = self.epoch.or(other.epoch);
        self.duration = self.duration.or(other.duration);
    }
}

/// Terminal state of one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Plot, table and manifest record were written
    Ok,
    /// Both artifacts already existed; nothing was done
    SkipExists,
    /// Period or epoch stayed unknown after every fallback
    SkipMissingParams,
    /// No mission / author combination produced a light curve
    NoData,
    /// The retry ceiling was exhausted
    Error { last_error: String },
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Ok => "ok",
            Outcome::SkipExists => "skip_exists",
            Outcome::SkipMissingParams => "skip_missing_params",
            Outcome::NoData => "no_data",
            Outcome::Error { .. } => "error",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Error { last_error } => write!(f, "error: {last_error}"),
            other => f.write_str(other.as_str()),
        }
    }
}
