//! Runtime settings for stream adapters and stores.
//!
//! Holds the axis naming used to find time/depth/position data in a source
//! and the options the table store uses when writing results.

use crate::constants::{
    DEFAULT_LAT_AXIS, DEFAULT_LON_AXIS, DEFAULT_ROLLUP_NAME, DEFAULT_TIME_AXIS, DEFAULT_Z_AXIS,
};
use crate::error::Result;
use polars::prelude::ParquetCompression;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Names of the auxiliary axes in a data source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisNames {
    pub time: String,
    pub z: String,
    pub lat: String,
    pub lon: String,
}

impl Default for AxisNames {
    fn default() -> Self {
        Self {
            time: DEFAULT_TIME_AXIS.to_string(),
            z: DEFAULT_Z_AXIS.to_string(),
            lat: DEFAULT_LAT_AXIS.to_string(),
            lon: DEFAULT_LON_AXIS.to_string(),
        }
    }
}

impl AxisNames {
    pub fn with_time(mut self, name: impl Into<String>) -> Self {
        self.time = name.into();
        self
    }

    pub fn with_z(mut self, name: impl Into<String>) -> Self {
        self.z = name.into();
        self
    }

    pub fn with_lat(mut self, name: impl Into<String>) -> Self {
        self.lat = name.into();
        self
    }

    pub fn with_lon(mut self, name: impl Into<String>) -> Self {
        self.lon = name.into();
        self
    }

    /// All axis names, time first
    pub fn all(&self) -> [&str; 4] {
        [&self.time, &self.z, &self.lat, &self.lon]
    }

    /// True if `name` is one of the axes
    pub fn contains(&self, name: &str) -> bool {
        self.all().contains(&name)
    }
}

/// Supported compression algorithms for parquet output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionAlgorithm {
    /// Snappy compression - good balance of speed and compression
    Snappy,
    /// ZSTD compression - better compression ratio, slower
    Zstd,
    /// LZ4 compression - fastest, lower compression ratio
    Lz4,
    /// No compression
    Uncompressed,
}

impl CompressionAlgorithm {
    /// Convert to polars ParquetCompression type
    pub fn to_polars_compression(&self) -> ParquetCompression {
        match self {
            CompressionAlgorithm::Snappy => ParquetCompression::Snappy,
            CompressionAlgorithm::Zstd => ParquetCompression::Zstd(None),
            CompressionAlgorithm::Lz4 => ParquetCompression::Lz4Raw,
            CompressionAlgorithm::Uncompressed => ParquetCompression::Uncompressed,
        }
    }

    /// Parse a CLI-style name (snappy, zstd, lz4, none)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "snappy" => Some(Self::Snappy),
            "zstd" => Some(Self::Zstd),
            "lz4" => Some(Self::Lz4),
            "none" | "uncompressed" => Some(Self::Uncompressed),
            _ => None,
        }
    }
}

/// Global settings for running QC and storing results
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QcSettings {
    /// Axis names used by the table and grid adapters
    pub axes: AxisNames,

    /// Compute a total aggregate over all collected results before storing
    pub compute_rollup: bool,

    /// Column name of the total aggregate
    pub rollup_name: String,

    /// Write the tested data columns next to the flag columns
    pub write_data: bool,

    /// Write time/z/lat/lon columns next to the flag columns
    pub write_axes: bool,

    /// Compression for parquet output
    pub compression: CompressionAlgorithm,
}

impl Default for QcSettings {
    fn default() -> Self {
        Self {
            axes: AxisNames::default(),
            compute_rollup: false,
            rollup_name: DEFAULT_ROLLUP_NAME.to_string(),
            write_data: false,
            write_axes: true,
            compression: CompressionAlgorithm::Snappy,
        }
    }
}

impl QcSettings {
    /// Load settings from a YAML (or JSON) file; missing keys keep their defaults
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let settings: QcSettings = serde_yaml::from_str(&text)?;
        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn with_axes(mut self, axes: AxisNames) -> Self {
        self.axes = axes;
        self
    }

    /// Enable the total aggregate under the given column name
    pub fn with_rollup(mut self, name: impl Into<String>) -> Self {
        self.compute_rollup = true;
        self.rollup_name = name.into();
        self
    }

    pub fn with_write_data(mut self) -> Self {
        self.write_data = true;
        self
    }

    pub fn without_axes(mut self) -> Self {
        self.write_axes = false;
        self
    }

    pub fn with_compression(mut self, compression: CompressionAlgorithm) -> Self {
        self.compression = compression;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let settings = QcSettings::default();
        assert_eq!(settings.axes.time, "time");
        assert_eq!(settings.axes.z, "z");
        assert!(!settings.compute_rollup);
        assert!(settings.write_axes);
        assert_eq!(settings.compression, CompressionAlgorithm::Snappy);
    }

    #[test]
    fn test_builders() {
        let settings = QcSettings::default()
            .with_axes(AxisNames::default().with_time("obs_time").with_z("depth"))
            .with_rollup("qc_rollup")
            .with_write_data()
            .without_axes();

        assert_eq!(settings.axes.time, "obs_time");
        assert!(settings.axes.contains("depth"));
        assert!(settings.compute_rollup);
        assert_eq!(settings.rollup_name, "qc_rollup");
        assert!(settings.write_data);
        assert!(!settings.write_axes);
    }

    #[test]
    fn test_partial_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "axes:\n  time: timestamp\ncompression: zstd").unwrap();

        let settings = QcSettings::from_yaml_file(file.path()).unwrap();
        assert_eq!(settings.axes.time, "timestamp");
        assert_eq!(settings.axes.lat, "lat");
        assert_eq!(settings.compression, CompressionAlgorithm::Zstd);
    }

    #[test]
    fn test_compression_names() {
        assert_eq!(
            CompressionAlgorithm::from_name("NONE"),
            Some(CompressionAlgorithm::Uncompressed)
        );
        assert_eq!(CompressionAlgorithm::from_name("brotli"), None);
    }
}
