//! Numeric QC test kernels.
//!
//! Each package module exposes typed kernels (plain slices in, one flag per
//! input position out) and the registry entry points that bind a
//! configuration's parameter mapping onto them.

pub mod argo;
pub mod axds;
pub mod qartod;

#[cfg(test)]
pub mod tests;

use crate::error::{QcError, Result};
use crate::flags::QartodFlag;
use crate::registry::Params;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Sorted, inclusive `(min, max)` pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub min: f64,
    pub max: f64,
}

impl Span {
    pub fn new(a: f64, b: f64) -> Self {
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }

    /// Build from a declared list, which must hold exactly two values
    pub fn from_values(test: &str, name: &str, values: &[f64]) -> Result<Self> {
        match values {
            [a, b] => Ok(Self::new(*a, *b)),
            _ => Err(QcError::parameter(
                test,
                format!("{name} must have 2 values, found {}", values.len()),
            )),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// True if `value` is strictly below `min` or above `max`; NaN is never outside
    pub fn excludes(&self, value: f64) -> bool {
        value < self.min || value > self.max
    }

    pub fn within(&self, other: &Span) -> bool {
        self.min >= other.min && self.max <= other.max
    }
}

/// Deserialize declared parameters into a kernel's parameter struct
pub(crate) fn parse_params<T: DeserializeOwned>(test: &str, params: &Params) -> Result<T> {
    serde_json::from_value(Value::Object(params.clone()))
        .map_err(|e| QcError::parameter(test, e.to_string()))
}

pub(crate) fn ensure_same_len(test: &str, expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(QcError::shape(test, expected, found));
    }
    Ok(())
}

/// Set every NaN input position to MISSING
pub(crate) fn mark_missing(flags: &mut [QartodFlag], inp: &[f64]) {
    for (flag, value) in flags.iter_mut().zip(inp) {
        if value.is_nan() {
            *flag = QartodFlag::Missing;
        }
    }
}
