//! Stream adapters.
//!
//! An adapter runs a [`Config`] against one kind of data source and yields a
//! [`ContextResult`] for every (context, stream) pair the source can serve.
//! All adapters share the same contract:
//!
//! 1. subset the stream by the context's time window (half-open);
//! 2. slice the time/depth/position axes to that subset;
//! 3. run every call of the stream, handing each test only the inputs it
//!    declares, then any aggregate calls over those results;
//! 4. emit one record carrying the per-test flags, the subset mask over the
//!    full stream and the subset axes.
//!
//! A stream that is missing from the source is skipped with a warning. Test
//! failures are logged and recorded on the result instead of aborting the run.

pub mod array;
pub mod grid;
pub mod table;

#[cfg(test)]
pub mod tests;

use crate::config::{Call, Config, Context, ContextConfig};
use crate::error::{QcError, Result};
use crate::flags::QartodFlag;
use crate::registry::TestInputs;
use crate::utils::Timestamp;
use serde::Serialize;
use tracing::{Span, debug, error, warn};

pub use array::{ArrayInput, ArrayStream, AuxValues};
pub use grid::{GridStream, LabeledGridStream};
pub use table::TableStream;

/// Flags produced by one test over one context subset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    pub package: String,
    pub test: String,
    pub flags: Vec<QartodFlag>,
}

impl TestResult {
    fn from_call(call: &Call, flags: Vec<QartodFlag>) -> Self {
        Self {
            package: call.package().to_string(),
            test: call.test().to_string(),
            flags,
        }
    }
}

/// A test that raised instead of producing flags
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestFailure {
    pub stream_id: String,
    pub package: String,
    pub test: String,
    pub context: String,
    pub message: String,
}

impl TestFailure {
    fn new(call: &Call, error: &QcError) -> Self {
        Self {
            stream_id: call.stream_id.clone(),
            package: call.package().to_string(),
            test: call.test().to_string(),
            context: call.context.to_string(),
            message: error.to_string(),
        }
    }
}

/// The outcome of running one context against one stream
#[derive(Debug, Clone)]
pub struct ContextResult {
    pub stream_id: String,
    pub context: Context,
    /// Per-test flags in declaration order, each as long as the subset
    pub results: Vec<TestResult>,
    pub failures: Vec<TestFailure>,
    /// Positions of the full stream covered by this context
    pub subset_indexes: Vec<bool>,
    pub data: Vec<f64>,
    pub tinp: Option<Vec<Timestamp>>,
    pub zinp: Option<Vec<f64>>,
    pub lat: Option<Vec<f64>>,
    pub lon: Option<Vec<f64>>,
}

impl ContextResult {
    /// Length of the full stream
    pub fn full_len(&self) -> usize {
        self.subset_indexes.len()
    }

    /// Number of positions in the subset
    pub fn subset_len(&self) -> usize {
        self.data.len()
    }

    pub fn covers_all(&self) -> bool {
        self.subset_indexes.iter().all(|&b| b)
    }

    pub fn result(&self, package: &str, test: &str) -> Option<&TestResult> {
        self.results
            .iter()
            .find(|r| r.package == package && r.test == test)
    }
}

/// A data source that QC configurations can run against
pub trait QcStream {
    /// Span that scopes every log record of a run
    fn span(&self) -> &Span;

    /// Run the calls of one stream in one context; `None` if the stream is absent
    fn run_stream(&self, context: &ContextConfig, stream_id: &str) -> Option<Result<ContextResult>>;

    /// Lazily run every (context, stream) pair of the configuration in declaration order
    fn run<'a>(&'a self, config: &'a Config) -> Box<dyn Iterator<Item = Result<ContextResult>> + 'a> {
        Box::new(config.contexts().iter().flat_map(move |cc| {
            cc.streams().into_iter().filter_map(move |stream_id| {
                let _enter = self.span().enter();
                self.run_stream(cc, stream_id)
            })
        }))
    }
}

/// Subset data for one stream in one context
#[derive(Debug, Clone, Default)]
pub(crate) struct SubsetInputs {
    pub data: Vec<f64>,
    pub tinp: Option<Vec<Timestamp>>,
    pub zinp: Option<Vec<f64>>,
    pub lat: Option<Vec<f64>>,
    pub lon: Option<Vec<f64>>,
}

impl SubsetInputs {
    /// Select the masked positions of the full-length arrays
    pub fn select(
        mask: &[bool],
        data: &[f64],
        tinp: Option<&[Timestamp]>,
        zinp: Option<&[f64]>,
        lat: Option<&[f64]>,
        lon: Option<&[f64]>,
    ) -> Self {
        Self {
            data: select(data, mask),
            tinp: tinp.map(|v| select(v, mask)),
            zinp: zinp.map(|v| select(v, mask)),
            lat: lat.map(|v| select(v, mask)),
            lon: lon.map(|v| select(v, mask)),
        }
    }

    fn test_inputs(&self) -> TestInputs<'_> {
        TestInputs {
            inp: Some(&self.data),
            tinp: self.tinp.as_deref(),
            zinp: self.zinp.as_deref(),
            lat: self.lat.as_deref(),
            lon: self.lon.as_deref(),
        }
    }
}

/// Values at the positions where `mask` is true
pub(crate) fn select<T: Clone>(values: &[T], mask: &[bool]) -> Vec<T> {
    values
        .iter()
        .zip(mask)
        .filter(|(_, keep)| **keep)
        .map(|(v, _)| v.clone())
        .collect()
}

/// Subset mask of a context's window over a time axis.
///
/// Covers everything when the window is unbounded, or when there is no time
/// axis to apply it to.
pub(crate) fn window_mask(context: &Context, times: Option<&[Timestamp]>, len: usize) -> Vec<bool> {
    if context.window.is_unbounded() {
        return vec![true; len];
    }
    match times {
        Some(times) => context.window.mask(times),
        None => {
            warn!("Skipping window subset {}, no time axis", context.window);
            vec![true; len]
        }
    }
}

/// Region subsetting hook. Regions are parsed and kept on the context but do
/// not narrow the mask.
pub(crate) fn apply_region(
    _mask: &mut [bool],
    context: &Context,
    lat: Option<&[f64]>,
    lon: Option<&[f64]>,
) {
    let Some(region) = &context.region else {
        return;
    };
    if lat.is_none() || lon.is_none() {
        warn!("Skipping region subset, lat and lon are required");
        return;
    }
    debug!(
        "Region with {} geometries is not applied to the subset",
        region.geometries.len()
    );
}

fn check_len(call: &Call, expected: usize, flags: Vec<QartodFlag>) -> Result<Vec<QartodFlag>> {
    if flags.len() != expected {
        return Err(QcError::shape(call.to_string(), expected, flags.len()));
    }
    Ok(flags)
}

/// Run the calls of one stream over its subset.
///
/// Kernel tests run first in declaration order, then aggregate tests over
/// the kernel results. Results keep the declaration order of their calls.
pub(crate) fn execute_calls(
    stream_id: &str,
    context: &Context,
    calls: &[&Call],
    subset_indexes: Vec<bool>,
    inputs: SubsetInputs,
) -> ContextResult {
    let expected = inputs.data.len();
    let test_inputs = inputs.test_inputs();
    let mut slots: Vec<Option<TestResult>> = calls.iter().map(|_| None).collect();
    let mut failures = Vec::new();

    for (i, call) in calls.iter().enumerate() {
        if call.is_aggregate() {
            continue;
        }
        match call
            .run(&test_inputs)
            .and_then(|flags| check_len(call, expected, flags))
        {
            Ok(flags) => slots[i] = Some(TestResult::from_call(call, flags)),
            Err(e) => {
                error!("{} failed in {}: {}", call, context, e);
                failures.push(TestFailure::new(call, &e));
            }
        }
    }

    let mut aggregates = Vec::new();
    {
        let kernel_flags: Vec<&[QartodFlag]> =
            slots.iter().flatten().map(|r| r.flags.as_slice()).collect();
        for (i, call) in calls.iter().enumerate() {
            if !call.is_aggregate() {
                continue;
            }
            match call
                .definition()
                .combine(&kernel_flags)
                .and_then(|flags| check_len(call, expected, flags))
            {
                Ok(flags) => aggregates.push((i, TestResult::from_call(call, flags))),
                Err(e) => {
                    error!("{} failed in {}: {}", call, context, e);
                    failures.push(TestFailure::new(call, &e));
                }
            }
        }
    }
    for (i, result) in aggregates {
        slots[i] = Some(result);
    }

    debug!(
        "{} in {}: {} of {} positions, {} results, {} failures",
        stream_id,
        context,
        expected,
        subset_indexes.len(),
        slots.iter().flatten().count(),
        failures.len()
    );

    ContextResult {
        stream_id: stream_id.to_string(),
        context: context.clone(),
        results: slots.into_iter().flatten().collect(),
        failures,
        subset_indexes,
        data: inputs.data,
        tinp: inputs.tinp,
        zinp: inputs.zinp,
        lat: inputs.lat,
        lon: inputs.lon,
    }
}
