//! Comparison primitives applied to (extracted value, target value) pairs.
//!
//! Target values come from the API as untyped JSON, so every operator coerces
//! explicitly and treats a failed coercion as a non-match rather than an
//! error.
use std::cmp::Ordering;

use chrono::{TimeZone, Utc};
use regex::Regex;

use super::getters::{get_numeric_value, get_string, get_unix_epoch_seconds};

pub fn numeric_compare(
    value: &serde_json::Value,
    target: Option<&serde_json::Value>,
    cmp: impl Fn(f64, f64) -> bool,
) -> bool {
    match (
        get_numeric_value(value),
        target.and_then(get_numeric_value),
    ) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

pub fn version_compare(
    value: &serde_json::Value,
    target: Option<&serde_json::Value>,
    cmp: impl Fn(Ordering) -> bool,
) -> bool {
    let a = get_string(value).and_then(|s| parse_version(&s));
    let b = target.and_then(get_string).and_then(|s| parse_version(&s));
    match (a, b) {
        (Some(a), Some(b)) => cmp(compare_versions(&a, &b)),
        _ => false,
    }
}

/// Dot-separated numeric components, pre-release suffix dropped. Returns None
/// when any component is non-numeric.
fn parse_version(s: &str) -> Option<Vec<i64>> {
    let s = s.trim();
    let base = s.split('-').next().unwrap_or(s);
    if base.is_empty() {
        return None;
    }
    base.split('.')
        .map(|part| part.parse::<i64>().ok())
        .collect()
}

/// Component-wise comparison, missing components zero-extended.
fn compare_versions(a: &[i64], b: &[i64]) -> Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            ord => return ord,
        }
    }
    Ordering::Equal
}

/// Whether any element of the target array is equivalent to the value under
/// deep equality, numeric equality or string equality (case-folded unless
/// `case_sensitive`).
pub fn value_in_array(
    value: &serde_json::Value,
    target: Option<&serde_json::Value>,
    case_sensitive: bool,
) -> bool {
    match target.and_then(|t| t.as_array()) {
        Some(arr) => arr
            .iter()
            .any(|el| values_equivalent(value, el, case_sensitive)),
        None => false,
    }
}

fn values_equivalent(a: &serde_json::Value, b: &serde_json::Value, case_sensitive: bool) -> bool {
    if a == b {
        return true;
    }
    if let (Some(x), Some(y)) = (get_numeric_value(a), get_numeric_value(b)) {
        return x == y;
    }
    match (get_string(a), get_string(b)) {
        (Some(x), Some(y)) => {
            if case_sensitive {
                x == y
            } else {
                x.to_lowercase() == y.to_lowercase()
            }
        }
        _ => false,
    }
}

/// Case-folded string test of the value against every element of the target
/// array, e.g. starts-with or contains.
pub fn string_compare_any(
    value: &serde_json::Value,
    target: Option<&serde_json::Value>,
    pred: impl Fn(&str, &str) -> bool,
) -> bool {
    let value = match get_string(value) {
        Some(s) => s.to_lowercase(),
        None => return false,
    };
    match target.and_then(|t| t.as_array()) {
        Some(arr) => arr.iter().any(|el| match get_string(el) {
            Some(t) => pred(&value, &t.to_lowercase()),
            None => false,
        }),
        None => false,
    }
}

/// Regex match; a pattern that does not compile never matches.
pub fn string_matches(value: &serde_json::Value, target: Option<&serde_json::Value>) -> bool {
    let value = match get_string(value) {
        Some(s) => s,
        None => return false,
    };
    let pattern = match target.and_then(get_string) {
        Some(p) => p,
        None => return false,
    };
    match Regex::new(&pattern) {
        Ok(re) => re.is_match(&value),
        Err(_) => false,
    }
}

pub fn time_compare(
    value: &serde_json::Value,
    target: Option<&serde_json::Value>,
    cmp: impl Fn(i64, i64) -> bool,
) -> bool {
    match (
        get_unix_epoch_seconds(value),
        target.and_then(get_unix_epoch_seconds),
    ) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

/// Whether both timestamps fall on the same UTC calendar date.
pub fn same_calendar_day(value: &serde_json::Value, target: Option<&serde_json::Value>) -> bool {
    let a = match get_unix_epoch_seconds(value) {
        Some(v) => v,
        None => return false,
    };
    let b = match target.and_then(get_unix_epoch_seconds) {
        Some(v) => v,
        None => return false,
    };
    match (Utc.timestamp_opt(a, 0).single(), Utc.timestamp_opt(b, 0).single()) {
        (Some(a), Some(b)) => a.date_naive() == b.date_naive(),
        _ => false,
    }
}
