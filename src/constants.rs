//! Application constants for the QARTOD QC engine
//!
//! This module contains flag values, default axis names, test package names
//! and other fixed values used throughout the crate.

// =============================================================================
// QARTOD Flag Values
// =============================================================================

/// Primary QARTOD flag codes as defined by the IOOS QARTOD manuals
pub mod flag_values {
    /// Data passed the test
    pub const GOOD: u8 = 1;

    /// Test was not evaluated for this value
    pub const UNKNOWN: u8 = 2;

    /// Data is questionable
    pub const SUSPECT: u8 = 3;

    /// Data failed the test
    pub const FAIL: u8 = 4;

    /// Data value was missing or masked
    pub const MISSING: u8 = 9;

    /// All valid flag values, in ascending numeric order
    pub const ALL: &[u8] = &[GOOD, UNKNOWN, SUSPECT, FAIL, MISSING];
}

/// CF `flag_meanings`, space separated and in the same order as `flag_values::ALL`
pub const FLAG_MEANINGS: &str = "GOOD UNKNOWN SUSPECT FAIL MISSING";

/// Value a test reports when it could not be evaluated
pub const NOTEVAL_VALUE: u8 = flag_values::UNKNOWN;

// =============================================================================
// Test Packages
// =============================================================================

/// IOOS QARTOD manual tests
pub const QARTOD_PACKAGE: &str = "qartod";

/// Axiom Data Science tests
pub const AXDS_PACKAGE: &str = "axds";

/// ARGO QC manual tests
pub const ARGO_PACKAGE: &str = "argo";

/// Name of the aggregate (rollup) test
pub const AGGREGATE_TEST: &str = "aggregate";

/// Default column name for a total aggregate computed over collected results
pub const DEFAULT_ROLLUP_NAME: &str = "rollup";

// =============================================================================
// Axis Defaults
// =============================================================================

/// Default time column / variable name
pub const DEFAULT_TIME_AXIS: &str = "time";

/// Default depth column / variable name
pub const DEFAULT_Z_AXIS: &str = "z";

/// Default latitude column / variable name
pub const DEFAULT_LAT_AXIS: &str = "lat";

/// Default longitude column / variable name
pub const DEFAULT_LON_AXIS: &str = "lon";

// =============================================================================
// Configuration Keys
// =============================================================================

/// Top-level key holding a list of region/window groups
pub const CONTEXTS_KEY: &str = "contexts";

/// Key holding the stream map of a single context
pub const STREAMS_KEY: &str = "streams";

/// Legacy alias of `STREAMS_KEY`
pub const CONFIGS_KEY: &str = "configs";

pub const REGION_KEY: &str = "region";
pub const WINDOW_KEY: &str = "window";
pub const ATTRS_KEY: &str = "attrs";
pub const WINDOW_STARTING_KEY: &str = "starting";
pub const WINDOW_ENDING_KEY: &str = "ending";

// =============================================================================
// Geodesy
// =============================================================================

/// Mean earth radius (IUGG) in meters used for great circle distances
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;
