//! # Raw catalog values and unit normalization
//!
//! Parameters reach the pipeline from two places: cells of a local delimited file (always
//! text) and fields of a catalog answer (JSON numbers, strings or nulls). Both are carried as
//! a [`RawValue`] until the [`ParameterResolver`](crate::catalog::resolver::ParameterResolver)
//! normalizes them.
//!
//! Normalization rules
//! -----------------
//! * A value may carry a unit suffix: `"3.52 d"`, `"2.1h"`, `"95 min"`. Without a suffix the
//!   field's natural unit applies (days for period and epoch, hours for duration).
//! * Empty cells, `null`, `NaN`, infinities, unparseable text and non-positive numbers are
//!   **absent**. No sentinel value ever leaves this module as a present quantity.
use std::sync::LazyLock;

use regex::Regex;

use crate::constants::{Day, Hour, HOURS_PER_DAY, MINUTES_PER_DAY};

static QUANTITY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?)\s*([A-Za-z]*)\s*$")
        .expect("quantity regex is valid")
});

/// An unparsed parameter value, as read from a file cell or a catalog field.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RawValue {
    Number(f64),
    Text(String),
    #[default]
    Null,
}

impl RawValue {
    /// Build a value from a delimited-file cell; blank cells are [`RawValue::Null`].
    pub fn from_cell(cell: &str) -> Self {
        let cell = cell.trim();
        if cell.is_empty() {
            RawValue::Null
        } else {
            RawValue::Text(cell.to_string())
        }
    }

    /// Non-blank textual content, used for names and host names.
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawValue::Text(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            RawValue::Number(x) if x.is_finite() => Some(x.to_string()),
            _ => None,
        }
    }
}

impl From<&serde_json::Value> for RawValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Number(n) => n.as_f64().map(RawValue::Number).unwrap_or_default(),
            serde_json::Value::String(s) => RawValue::from_cell(s),
            _ => RawValue::Null,
        }
    }
}

/// Time units accepted as quantity suffixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Day,
    Hour,
    Minute,
}

impl TimeUnit {
    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix.to_ascii_lowercase().as_str() {
            "d" | "day" | "days" => Some(TimeUnit::Day),
            "h" | "hr" | "hrs" | "hour" | "hours" => Some(TimeUnit::Hour),
            "min" | "mins" | "minute" | "minutes" => Some(TimeUnit::Minute),
            _ => None,
        }
    }

    fn to_days(self, value: f64) -> Day {
        match self {
            TimeUnit::Day => value,
            TimeUnit::Hour => value / HOURS_PER_DAY,
            TimeUnit::Minute => value / MINUTES_PER_DAY,
        }
    }
}

/// Parse a raw value into a finite, strictly positive quantity expressed in days.
///
/// Arguments
/// -----------------
/// * `raw`: the value to parse.
/// * `default_unit`: unit applied when the value carries no suffix.
///
/// Return
/// ----------
/// * `Some(days)` for a usable value, `None` otherwise.
fn parse_days(raw: &RawValue, default_unit: TimeUnit) -> Option<Day> {
    let days = match raw {
        RawValue::Number(x) => default_unit.to_days(*x),
        RawValue::Text(text) => {
            let captures = QUANTITY_REGEX.captures(text)?;
            let value: f64 = captures.get(1)?.as_str().parse().ok()?;
            let unit = match captures.get(2).map(|m| m.as_str()).unwrap_or("") {
                "" => default_unit,
                suffix => TimeUnit::from_suffix(suffix)?,
            };
            unit.to_days(value)
        }
        RawValue::Null => return None,
    };
    (days.is_finite() && days > 0.0).then_some(days)
}

/// Normalize a raw value to days (unitless values are read as days).
pub fn as_days(raw: &RawValue) -> Option<Day> {
    parse_days(raw, TimeUnit::Day)
}

/// Normalize a raw value to hours (unitless values are read as hours).
pub fn as_hours(raw: &RawValue) -> Option<Hour> {
    parse_days(raw, TimeUnit::Hour).map(|days| days * HOURS_PER_DAY)
}

#[cfg(test)]
mod units_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_plain_numbers_use_default_unit() {
        assert_eq!(as_days(&RawValue::Number(3.5)), Some(3.5));
        assert_eq!(as_hours(&RawValue::Text("2.25".into())), Some(2.25));
        assert_eq!(as_days(&RawValue::Text("1e1".into())), Some(10.0));
    }

    #[test]
    fn test_suffixes_are_converted() {
        assert_relative_eq!(as_days(&RawValue::Text("12 h".into())).unwrap(), 0.5);
        assert_relative_eq!(as_hours(&RawValue::Text("0.5d".into())).unwrap(), 12.0);
        assert_relative_eq!(as_hours(&RawValue::Text("90 min".into())).unwrap(), 1.5);
        assert_eq!(as_days(&RawValue::Text("3 parsec".into())), None);
    }

    #[test]
    fn test_sentinels_are_absent() {
        assert_eq!(as_days(&RawValue::Null), None);
        assert_eq!(as_days(&RawValue::Number(f64::NAN)), None);
        assert_eq!(as_days(&RawValue::Number(0.0)), None);
        assert_eq!(as_days(&RawValue::Number(-2.0)), None);
        assert_eq!(as_days(&RawValue::Text("nan".into())), None);
        assert_eq!(as_days(&RawValue::Text("inf".into())), None);
        assert_eq!(as_hours(&RawValue::from_cell("   ")), None);
    }

    #[test]
    fn test_from_json() {
        let value: serde_json::Value = serde_json::json!({"a": 1.5, "b": null, "c": "x", "d": true});
        assert_eq!(RawValue::from(&value["a"]), RawValue::Number(1.5));
        assert_eq!(RawValue::from(&value["b"]), RawValue::Null);
        assert_eq!(RawValue::from(&value["c"]), RawValue::Text("x".into()));
        assert_eq!(RawValue::from(&value["d"]), RawValue::Null);
    }
}
