//! Error handling for QC configuration parsing and test execution.
//!
//! Provides error types with context for configuration loading, test
//! resolution, kernel parameter validation and stream data conversion.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid QC configuration: {reason}")]
    ConfigParse { reason: String },

    #[error("Invalid region geometry: {reason}")]
    InvalidRegion { reason: String },

    #[error("Could not parse timestamp '{value}'")]
    InvalidTimestamp { value: String },

    #[error("No test package \"{package}\" was found")]
    UnknownPackage { package: String },

    #[error("No test \"{package}.{test}\" was found")]
    UnknownTest { package: String, test: String },

    #[error("Invalid parameter for {test}: {reason}")]
    InvalidParameter { test: String, reason: String },

    #[error("{test} requires the \"{argument}\" input")]
    MissingInput { test: String, argument: String },

    #[error("Shape mismatch in {context}: expected {expected}, found {found}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        found: usize,
    },

    #[error("Invalid QARTOD flag value: {value}")]
    InvalidFlag { value: u8 },

    #[error("Stream data error for '{stream_id}': {reason}")]
    StreamData { stream_id: String, reason: String },
}

impl QcError {
    /// Create a configuration parse error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::ConfigParse {
            reason: reason.into(),
        }
    }

    /// Create an invalid parameter error for a named test
    pub fn parameter(test: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            test: test.into(),
            reason: reason.into(),
        }
    }

    pub fn missing_input(test: impl Into<String>, argument: impl Into<String>) -> Self {
        Self::MissingInput {
            test: test.into(),
            argument: argument.into(),
        }
    }

    pub fn shape(context: impl Into<String>, expected: usize, found: usize) -> Self {
        Self::ShapeMismatch {
            context: context.into(),
            expected,
            found,
        }
    }

    pub fn stream_data(stream_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StreamData {
            stream_id: stream_id.into(),
            reason: reason.into(),
        }
    }

    /// True for resolution misses that are skipped with a warning instead of failing
    pub fn is_resolution_miss(&self) -> bool {
        matches!(
            self,
            QcError::UnknownPackage { .. } | QcError::UnknownTest { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, QcError>;
