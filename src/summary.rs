//! Per-stream flag count summaries over collected results.

use crate::flags::{FlagCounts, QartodFlag};
use crate::results::{CollectedResult, CollectedResults, ResultMap};
use std::collections::BTreeMap;

/// Stream label used for results without a stream id, like the rollup
pub const UNNAMED_STREAM: &str = "unknown";

/// Flag counts keyed by stream id
pub type FlagSummary = BTreeMap<String, FlagCounts>;

/// Anything holding flag arrays labelled by stream
pub trait FlagSource {
    fn flag_arrays(&self) -> Vec<(&str, &[QartodFlag])>;
}

impl FlagSource for [CollectedResult] {
    fn flag_arrays(&self) -> Vec<(&str, &[QartodFlag])> {
        self.iter()
            .map(|r| (r.stream_id.as_str(), r.flags.as_slice()))
            .collect()
    }
}

impl FlagSource for Vec<CollectedResult> {
    fn flag_arrays(&self) -> Vec<(&str, &[QartodFlag])> {
        self.as_slice().flag_arrays()
    }
}

impl FlagSource for CollectedResults {
    fn flag_arrays(&self) -> Vec<(&str, &[QartodFlag])> {
        self.results().flag_arrays()
    }
}

impl FlagSource for ResultMap {
    fn flag_arrays(&self) -> Vec<(&str, &[QartodFlag])> {
        self.iter()
            .flat_map(|(stream_id, packages)| {
                packages
                    .values()
                    .flat_map(|tests| tests.values())
                    .map(move |flags| (stream_id.as_str(), flags.as_slice()))
            })
            .collect()
    }
}

/// Count flags per stream, summing over every test of the stream
pub fn summarize_flags<S: FlagSource + ?Sized>(results: &S) -> FlagSummary {
    let mut summary = FlagSummary::new();
    for (stream_id, flags) in results.flag_arrays() {
        let label = if stream_id.is_empty() {
            UNNAMED_STREAM
        } else {
            stream_id
        };
        summary.entry(label.to_string()).or_default().add_all(flags);
    }
    summary
}
