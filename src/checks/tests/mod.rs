//! Unit tests for the test kernels

pub mod package_tests;
pub mod qartod_tests;

use crate::flags::{QartodFlag, flags_from_values};
use crate::utils::{Timestamp, parse_timestamp};
use chrono::Duration;

/// Flags from raw codes
pub fn flags(values: &[u8]) -> Vec<QartodFlag> {
    flags_from_values(values).unwrap()
}

/// `n` timestamps `step_seconds` apart starting at 2020-01-01
pub fn regular_times(n: usize, step_seconds: i64) -> Vec<Timestamp> {
    let start = parse_timestamp("2020-01-01T00:00:00").unwrap();
    (0..n)
        .map(|i| start + Duration::seconds(step_seconds * i as i64))
        .collect()
}

pub fn params(value: serde_json::Value) -> crate::registry::Params {
    value.as_object().cloned().unwrap()
}
