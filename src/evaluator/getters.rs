use chrono::{Datelike, LocalResult, TimeZone, Utc};
use sha2::{Digest, Sha256};

/// SHA-256 of the key, first 8 bytes taken as a big-endian u64. Must stay
/// bit-compatible with the API's bucketing, so the construction is fixed.
pub fn get_hash(s: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    let digest = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}

/// Numbers and numeric strings coerce; everything else is non-numeric.
pub fn get_numeric_value(v: &serde_json::Value) -> Option<f64> {
    match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// String form of a scalar for string comparisons. Composite values and null
/// have no string form.
pub fn get_string(v: &serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// Reads a numeric timestamp as unix seconds.
///
/// The control plane does not say whether a value is seconds or milliseconds.
/// If reading it as seconds lands more than 100 years past the current year,
/// it must have been milliseconds.
pub fn get_unix_epoch_seconds(v: &serde_json::Value) -> Option<i64> {
    let raw = match v {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?,
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    let horizon = Utc::now().year() + 100;
    match Utc.timestamp_opt(raw, 0) {
        LocalResult::Single(dt) if dt.year() <= horizon => Some(raw),
        _ => Some(raw / 1000),
    }
}
