//! Test registry.
//!
//! Maps `(package, test)` names from a configuration to the test
//! implementations in [`crate::checks`]. Each entry declares which runtime
//! inputs it accepts so stream adapters only hand a test the auxiliary
//! arrays it uses.

use crate::checks::{argo, axds, qartod};
use crate::constants::{AGGREGATE_TEST, ARGO_PACKAGE, AXDS_PACKAGE, QARTOD_PACKAGE};
use crate::error::{QcError, Result};
use crate::flags::QartodFlag;
use crate::utils::Timestamp;
use serde_json::{Map, Value};
use std::fmt;

/// Test parameters exactly as declared in the configuration
pub type Params = Map<String, Value>;

/// A numeric test kernel
pub type KernelFn = fn(&TestInputs<'_>, &Params) -> Result<Vec<QartodFlag>>;

/// A test that combines the results of other tests
pub type AggregateFn = fn(&[&[QartodFlag]]) -> Result<Vec<QartodFlag>>;

/// Runtime inputs a stream adapter can supply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arg {
    Inp,
    Tinp,
    Zinp,
    Lat,
    Lon,
}

impl Arg {
    pub fn name(self) -> &'static str {
        match self {
            Arg::Inp => "inp",
            Arg::Tinp => "tinp",
            Arg::Zinp => "zinp",
            Arg::Lat => "lat",
            Arg::Lon => "lon",
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Subset data handed to a kernel
#[derive(Debug, Clone, Copy, Default)]
pub struct TestInputs<'a> {
    pub inp: Option<&'a [f64]>,
    pub tinp: Option<&'a [Timestamp]>,
    pub zinp: Option<&'a [f64]>,
    pub lat: Option<&'a [f64]>,
    pub lon: Option<&'a [f64]>,
}

impl<'a> TestInputs<'a> {
    pub fn new(inp: &'a [f64]) -> Self {
        Self {
            inp: Some(inp),
            ..Self::default()
        }
    }

    pub fn with_tinp(mut self, tinp: &'a [Timestamp]) -> Self {
        self.tinp = Some(tinp);
        self
    }

    pub fn with_zinp(mut self, zinp: &'a [f64]) -> Self {
        self.zinp = Some(zinp);
        self
    }

    pub fn with_lat(mut self, lat: &'a [f64]) -> Self {
        self.lat = Some(lat);
        self
    }

    pub fn with_lon(mut self, lon: &'a [f64]) -> Self {
        self.lon = Some(lon);
        self
    }

    /// Keep only the inputs named in `accepts`
    pub fn filtered(&self, accepts: &[Arg]) -> Self {
        let keep = |arg: Arg| accepts.contains(&arg);
        Self {
            inp: self.inp.filter(|_| keep(Arg::Inp)),
            tinp: self.tinp.filter(|_| keep(Arg::Tinp)),
            zinp: self.zinp.filter(|_| keep(Arg::Zinp)),
            lat: self.lat.filter(|_| keep(Arg::Lat)),
            lon: self.lon.filter(|_| keep(Arg::Lon)),
        }
    }

    pub fn require_inp(&self, test: &str) -> Result<&'a [f64]> {
        self.inp.ok_or_else(|| QcError::missing_input(test, Arg::Inp.name()))
    }

    pub fn require_tinp(&self, test: &str) -> Result<&'a [Timestamp]> {
        self.tinp
            .ok_or_else(|| QcError::missing_input(test, Arg::Tinp.name()))
    }

    pub fn require_zinp(&self, test: &str) -> Result<&'a [f64]> {
        self.zinp
            .ok_or_else(|| QcError::missing_input(test, Arg::Zinp.name()))
    }

    pub fn require_lat(&self, test: &str) -> Result<&'a [f64]> {
        self.lat.ok_or_else(|| QcError::missing_input(test, Arg::Lat.name()))
    }

    pub fn require_lon(&self, test: &str) -> Result<&'a [f64]> {
        self.lon.ok_or_else(|| QcError::missing_input(test, Arg::Lon.name()))
    }
}

/// How a registered test is evaluated
#[derive(Debug, Clone, Copy)]
pub enum TestKind {
    Kernel(KernelFn),
    /// Runs after the other tests of its stream and context, over their flags
    Aggregate(AggregateFn),
}

/// A registered test
#[derive(Debug)]
pub struct TestDefinition {
    pub package: &'static str,
    pub name: &'static str,
    pub accepts: &'static [Arg],
    pub kind: TestKind,
    pub standard_name: &'static str,
    pub long_name: &'static str,
}

impl TestDefinition {
    /// `package.test`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.package, self.name)
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self.kind, TestKind::Aggregate(_))
    }

    pub fn accepts(&self, arg: Arg) -> bool {
        self.accepts.contains(&arg)
    }

    /// Run a kernel test; inputs not declared in `accepts` are dropped first
    pub fn run(&self, inputs: &TestInputs<'_>, params: &Params) -> Result<Vec<QartodFlag>> {
        match self.kind {
            TestKind::Kernel(func) => func(&inputs.filtered(self.accepts), params),
            TestKind::Aggregate(_) => Err(QcError::parameter(
                self.qualified_name(),
                "aggregate tests run over other test results",
            )),
        }
    }

    /// Run an aggregate test over the results of other tests
    pub fn combine(&self, results: &[&[QartodFlag]]) -> Result<Vec<QartodFlag>> {
        match self.kind {
            TestKind::Aggregate(func) => func(results),
            TestKind::Kernel(_) => Err(QcError::parameter(
                self.qualified_name(),
                "kernel tests run over stream data",
            )),
        }
    }
}

use Arg::{Inp, Lat, Lon, Tinp, Zinp};

static TESTS: &[TestDefinition] = &[
    TestDefinition {
        package: QARTOD_PACKAGE,
        name: AGGREGATE_TEST,
        accepts: &[],
        kind: TestKind::Aggregate(qartod::qartod_compare),
        standard_name: "aggregate_quality_flag",
        long_name: "Aggregate Flag",
    },
    TestDefinition {
        package: QARTOD_PACKAGE,
        name: "gross_range_test",
        accepts: &[Inp],
        kind: TestKind::Kernel(qartod::gross_range_test),
        standard_name: "gross_range_test_quality_flag",
        long_name: "Gross Range Test Quality Flag",
    },
    TestDefinition {
        package: QARTOD_PACKAGE,
        name: "location_test",
        accepts: &[Lat, Lon],
        kind: TestKind::Kernel(qartod::location_test),
        standard_name: "location_test_quality_flag",
        long_name: "Location Test Quality Flag",
    },
    TestDefinition {
        package: QARTOD_PACKAGE,
        name: "climatology_test",
        accepts: &[Inp, Tinp, Zinp],
        kind: TestKind::Kernel(qartod::climatology_test),
        standard_name: "climatology_test_quality_flag",
        long_name: "Climatology Test Quality Flag",
    },
    TestDefinition {
        package: QARTOD_PACKAGE,
        name: "spike_test",
        accepts: &[Inp],
        kind: TestKind::Kernel(qartod::spike_test),
        standard_name: "spike_test_quality_flag",
        long_name: "Spike Test Quality Flag",
    },
    TestDefinition {
        package: QARTOD_PACKAGE,
        name: "rate_of_change_test",
        accepts: &[Inp, Tinp],
        kind: TestKind::Kernel(qartod::rate_of_change_test),
        standard_name: "rate_of_change_test_quality_flag",
        long_name: "Rate of Change Test Quality Flag",
    },
    TestDefinition {
        package: QARTOD_PACKAGE,
        name: "flat_line_test",
        accepts: &[Inp, Tinp],
        kind: TestKind::Kernel(qartod::flat_line_test),
        standard_name: "flat_line_test_quality_flag",
        long_name: "Flat Line Test Quality Flag",
    },
    TestDefinition {
        package: QARTOD_PACKAGE,
        name: "attenuated_signal_test",
        accepts: &[Inp, Tinp],
        kind: TestKind::Kernel(qartod::attenuated_signal_test),
        standard_name: "attenuated_signal_test_quality_flag",
        long_name: "Attenuated Signal Test Quality Flag",
    },
    TestDefinition {
        package: QARTOD_PACKAGE,
        name: "density_inversion_test",
        accepts: &[Inp, Zinp],
        kind: TestKind::Kernel(qartod::density_inversion_test),
        standard_name: "density_inversion_test_quality_flag",
        long_name: "Density Inversion Test Quality Flag",
    },
    TestDefinition {
        package: AXDS_PACKAGE,
        name: "valid_range_test",
        accepts: &[Inp],
        kind: TestKind::Kernel(axds::valid_range_test),
        standard_name: "valid_range_test_quality_flag",
        long_name: "Valid Range Test Quality Flag",
    },
    TestDefinition {
        package: ARGO_PACKAGE,
        name: "pressure_increasing_test",
        accepts: &[Inp],
        kind: TestKind::Kernel(argo::pressure_increasing_test),
        standard_name: "pressure_increasing_test_quality_flag",
        long_name: "Pressure Increasing Test Quality Flag",
    },
    TestDefinition {
        package: ARGO_PACKAGE,
        name: "speed_test",
        accepts: &[Lat, Lon, Tinp],
        kind: TestKind::Kernel(argo::speed_test),
        standard_name: "speed_test_quality_flag",
        long_name: "Speed Test Quality Flag",
    },
];

/// Every registered test
pub fn all_tests() -> &'static [TestDefinition] {
    TESTS
}

/// Registered package names, in registration order
pub fn packages() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = Vec::new();
    for def in TESTS {
        if !names.contains(&def.package) {
            names.push(def.package);
        }
    }
    names
}

/// Resolve a `(package, test)` pair
pub fn lookup(package: &str, test: &str) -> Result<&'static TestDefinition> {
    if !TESTS.iter().any(|def| def.package == package) {
        return Err(QcError::UnknownPackage {
            package: package.to_string(),
        });
    }
    TESTS
        .iter()
        .find(|def| def.package == package && def.name == test)
        .ok_or_else(|| QcError::UnknownTest {
            package: package.to_string(),
            test: test.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let def = lookup("qartod", "gross_range_test").unwrap();
        assert_eq!(def.qualified_name(), "qartod.gross_range_test");
        assert!(def.accepts(Arg::Inp));
        assert!(!def.accepts(Arg::Tinp));
        assert!(lookup("qartod", "aggregate").unwrap().is_aggregate());
    }

    #[test]
    fn test_lookup_misses() {
        let err = lookup("qartod", "made_up_test").unwrap_err();
        assert!(matches!(err, QcError::UnknownTest { .. }));
        assert!(err.is_resolution_miss());

        let err = lookup("ioos_qc.nope", "gross_range_test").unwrap_err();
        assert!(matches!(err, QcError::UnknownPackage { .. }));
    }

    #[test]
    fn test_names_are_unique() {
        let all = all_tests();
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert!(a.package != b.package || a.name != b.name);
            }
        }
        assert_eq!(packages(), vec!["qartod", "axds", "argo"]);
    }

    #[test]
    fn test_inputs_filtered_by_accepts() {
        let inp = [1.0, 2.0];
        let lat = [0.0, 0.0];
        let inputs = TestInputs::new(&inp).with_lat(&lat).with_lon(&lat);

        let filtered = inputs.filtered(&[Arg::Lat, Arg::Lon]);
        assert!(filtered.inp.is_none());
        assert!(filtered.lat.is_some());
        assert!(matches!(
            filtered.require_inp("qartod.spike_test"),
            Err(QcError::MissingInput { .. })
        ));
    }
}
