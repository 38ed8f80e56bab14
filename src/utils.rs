//! Shared helpers for timestamps, naming and geodesy.

use crate::constants::EARTH_RADIUS_M;
use crate::error::{QcError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Naive UTC timestamp used for every time axis in the crate
pub type Timestamp = NaiveDateTime;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a timestamp string.
///
/// Accepts RFC 3339 (converted to UTC), naive ISO-8601 date-times, plain
/// dates (midnight) and integer/float epoch seconds.
pub fn parse_timestamp(value: &str) -> Result<Timestamp> {
    let trimmed = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.naive_utc());
    }

    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(dt);
        }
    }

    // Trailing 'Z' without an offset colon form, e.g. 2020-01-01T00:00:00Z
    if let Some(stripped) = trimmed.strip_suffix('Z') {
        for format in NAIVE_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(stripped, format) {
                return Ok(dt);
            }
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt);
        }
    }

    if let Ok(seconds) = trimmed.parse::<f64>() {
        return timestamp_from_epoch_seconds(seconds).ok_or_else(|| QcError::InvalidTimestamp {
            value: value.to_string(),
        });
    }

    Err(QcError::InvalidTimestamp {
        value: value.to_string(),
    })
}

/// Parse an optional timestamp from a configuration value (`null` → `None`)
pub fn parse_timestamp_value(value: &Value) -> Result<Option<Timestamp>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => parse_timestamp(s).map(Some),
        Value::Number(n) => n
            .as_f64()
            .and_then(timestamp_from_epoch_seconds)
            .map(Some)
            .ok_or_else(|| QcError::InvalidTimestamp {
                value: n.to_string(),
            }),
        other => Err(QcError::InvalidTimestamp {
            value: other.to_string(),
        }),
    }
}

/// Convert unix epoch seconds to a timestamp
pub fn timestamp_from_epoch_seconds(seconds: f64) -> Option<Timestamp> {
    if !seconds.is_finite() {
        return None;
    }
    let millis = (seconds * 1000.0).round() as i64;
    DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc())
}

/// Convert epoch milliseconds to a timestamp
pub fn timestamp_from_epoch_millis(millis: i64) -> Option<Timestamp> {
    DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc())
}

/// Whole seconds elapsed between two timestamps, as a float
pub fn seconds_between(start: &Timestamp, end: &Timestamp) -> f64 {
    (*end - *start).num_seconds() as f64
}

/// Median spacing of a time axis in whole seconds, `None` for fewer than two values
pub fn median_interval_seconds(times: &[Timestamp]) -> Option<f64> {
    if times.len() < 2 {
        return None;
    }
    let mut diffs: Vec<i64> = times
        .windows(2)
        .map(|w| (w[1] - w[0]).num_milliseconds())
        .collect();
    diffs.sort_unstable();

    let mid = diffs.len() / 2;
    let median_ms = if diffs.len() % 2 == 0 {
        (diffs[mid - 1] + diffs[mid]) as f64 / 2.0
    } else {
        diffs[mid] as f64
    };
    Some((median_ms / 1000.0).trunc())
}

/// Sanity check a time axis.
///
/// Returns `true` when times are strictly increasing and, if given, no gap
/// exceeds `max_time_interval` seconds.
pub fn check_timestamps(times: &[Timestamp], max_time_interval: Option<f64>) -> bool {
    times.windows(2).all(|w| {
        let gap = seconds_between(&w[0], &w[1]);
        gap > 0.0 && max_time_interval.is_none_or(|max| gap <= max)
    })
}

fn leading_invalid() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9_]").expect("valid regex"))
}

fn invalid_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^_a-zA-Z0-9]").expect("valid regex"))
}

/// Make a CF-safe variable name.
///
/// Names starting with a digit or underscore get a `v_` prefix and every
/// character outside `[_a-zA-Z0-9]` becomes an underscore.
pub fn cf_safe_name(name: &str) -> String {
    let prefixed = if leading_invalid().is_match(name) {
        format!("v_{name}")
    } else {
        name.to_string()
    };
    invalid_chars().replace_all(&prefixed, "_").into_owned()
}

/// Haversine distance in meters between two points given in degrees
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

/// Distance in meters from each point to the previous one.
///
/// The first element is 0. Any leg touching a NaN coordinate is NaN.
pub fn great_circle_distance(lat: &[f64], lon: &[f64]) -> Vec<f64> {
    let n = lat.len().min(lon.len());
    let mut dist = vec![0.0; n];
    for i in 1..n {
        dist[i] = haversine_distance(lat[i - 1], lon[i - 1], lat[i], lon[i]);
    }
    dist
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> Timestamp {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();

        assert_eq!(ts("2020-01-01T00:00:00"), expected);
        assert_eq!(ts("2020-01-01T00:00:00Z"), expected);
        assert_eq!(ts("2020-01-01 00:00:00"), expected);
        assert_eq!(ts("2020-01-01"), expected);
        assert_eq!(ts("2020-01-01T01:00:00+01:00"), expected);
        assert_eq!(ts("1577836800"), expected);
        assert!(parse_timestamp("not a date").is_err());
    }

    #[test]
    fn test_parse_timestamp_value() {
        assert_eq!(parse_timestamp_value(&Value::Null).unwrap(), None);
        assert_eq!(
            parse_timestamp_value(&serde_json::json!(0)).unwrap(),
            Some(ts("1970-01-01"))
        );
        assert!(parse_timestamp_value(&serde_json::json!([1, 2])).is_err());
    }

    #[test]
    fn test_cf_safe_name() {
        assert_eq!(
            cf_safe_name("variable1.qartod.gross_range_test"),
            "variable1_qartod_gross_range_test"
        );
        assert_eq!(cf_safe_name("1abc"), "v_1abc");
        assert_eq!(cf_safe_name("_abc"), "v__abc");
        assert_eq!(cf_safe_name("sea water-temp"), "sea_water_temp");
    }

    #[test]
    fn test_median_interval() {
        let times = vec![
            ts("2020-01-01T00:00:00"),
            ts("2020-01-01T00:01:00"),
            ts("2020-01-01T00:02:00"),
            ts("2020-01-01T00:05:00"),
        ];
        assert_eq!(median_interval_seconds(&times), Some(60.0));
        assert_eq!(median_interval_seconds(&times[..1]), None);
    }

    #[test]
    fn test_check_timestamps() {
        let times = vec![
            ts("2020-01-01T00:00:00"),
            ts("2020-01-01T00:01:00"),
            ts("2020-01-01T00:05:00"),
        ];
        assert!(check_timestamps(&times, None));
        assert!(!check_timestamps(&times, Some(120.0)));

        let duplicated = vec![times[0], times[0]];
        assert!(!check_timestamps(&duplicated, None));

        let reversed: Vec<_> = times.iter().rev().cloned().collect();
        assert!(!check_timestamps(&reversed, None));
    }

    #[test]
    fn test_great_circle_distance() {
        let lat = vec![0.0, 0.0, f64::NAN];
        let lon = vec![0.0, 1.0, 1.0];
        let dist = great_circle_distance(&lat, &lon);

        assert_eq!(dist[0], 0.0);
        // One degree of longitude on the equator
        assert!((dist[1] - 111_195.0).abs() < 10.0);
        assert!(dist[2].is_nan());
    }
}
