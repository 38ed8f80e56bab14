//! Unit tests for the stream adapters


use crate::config::Config;
use crate::flags::{QartodFlag, flags_from_values};
use crate::stream::{ContextResult, QcStream};
use crate::utils::{Timestamp, parse_timestamp};
use chrono::Duration;
use serde_json::Value;

pub fn flags(values: &[u8]) -> Vec<QartodFlag> {
    flags_from_values(values).unwrap()
}

/// `n` hourly timestamps starting at 2020-01-01
pub fn hourly(n: usize) -> Vec<Timestamp> {
    let start = parse_timestamp("2020-01-01T00:00:00").unwrap();
    (0..n).map(|i| start + Duration::hours(i as i64)).collect()
}

pub fn config(value: Value) -> Config {
    Config::from_value(&value).unwrap()
}

/// Run a stream to completion, panicking on adapter errors
pub fn run_all<S: QcStream>(stream: &S, config: &Config) -> Vec<ContextResult> {
    stream.run(config).collect::<crate::error::Result<Vec<_>>>().unwrap()
}
