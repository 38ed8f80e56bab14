//! Result collection.
//!
//! Adapters emit one [`ContextResult`] per (context, stream), each covering
//! only the positions its context selected. The collector scatters those
//! partial results back into full-length arrays, one per
//! `stream: package.test` key, in the order keys are first seen.
//!
//! Positions no context covered keep the UNKNOWN fill. When two contexts
//! cover the same position for the same test, the one merged last wins.

use crate::checks::qartod::qartod_compare;
use crate::constants::QARTOD_PACKAGE;
use crate::error::{QcError, Result};
use crate::flags::QartodFlag;
use crate::stream::{ContextResult, TestFailure};
use crate::utils::Timestamp;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Nested `stream -> package -> test -> flags` mapping
pub type ResultMap = BTreeMap<String, BTreeMap<String, BTreeMap<String, Vec<QartodFlag>>>>;

/// Full-length flags and axes for one `stream: package.test` key
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedResult {
    pub stream_id: String,
    pub package: String,
    pub test: String,
    pub flags: Vec<QartodFlag>,
    /// Stream values, NaN where no context covered the position
    pub data: Vec<f64>,
    pub tinp: Option<Vec<Option<Timestamp>>>,
    pub zinp: Option<Vec<f64>>,
    pub lat: Option<Vec<f64>>,
    pub lon: Option<Vec<f64>>,
}

impl CollectedResult {
    fn empty(stream_id: &str, package: &str, test: &str, len: usize) -> Self {
        Self {
            stream_id: stream_id.to_string(),
            package: package.to_string(),
            test: test.to_string(),
            flags: vec![QartodFlag::Unknown; len],
            data: vec![f64::NAN; len],
            tinp: None,
            zinp: None,
            lat: None,
            lon: None,
        }
    }

    pub fn key(&self) -> String {
        hash_key(&self.stream_id, &self.package, &self.test)
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    fn merge_axes(&mut self, cr: &ContextResult) {
        let mask = &cr.subset_indexes;
        let all = cr.covers_all();
        let len = mask.len();

        merge_into(&mut self.data, mask, &cr.data, all);
        if let Some(tinp) = &cr.tinp {
            let values: Vec<Option<Timestamp>> = tinp.iter().copied().map(Some).collect();
            merge_into(self.tinp.get_or_insert_with(|| vec![None; len]), mask, &values, all);
        }
        for (target, values) in [
            (&mut self.zinp, &cr.zinp),
            (&mut self.lat, &cr.lat),
            (&mut self.lon, &cr.lon),
        ] {
            if let Some(values) = values {
                merge_into(target.get_or_insert_with(|| vec![f64::NAN; len]), mask, values, all);
            }
        }
    }
}

fn hash_key(stream_id: &str, package: &str, test: &str) -> String {
    format!("{stream_id}: {package}.{test}")
}

/// Write `values` into the positions of `target` selected by `mask`.
/// A mask covering everything replaces the target outright.
fn merge_into<T: Clone>(target: &mut Vec<T>, mask: &[bool], values: &[T], covers_all: bool) {
    if covers_all {
        *target = values.to_vec();
        return;
    }
    let slots = target
        .iter_mut()
        .zip(mask)
        .filter(|(_, keep)| **keep)
        .map(|(slot, _)| slot);
    for (slot, value) in slots.zip(values) {
        *slot = value.clone();
    }
}

/// Collected results of a run, in first-seen key order
#[derive(Debug, Clone, Default)]
pub struct CollectedResults {
    results: Vec<CollectedResult>,
    index: HashMap<String, usize>,
    failures: Vec<TestFailure>,
}

impl CollectedResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scatter one context result into the collection
    pub fn add(&mut self, cr: ContextResult) -> Result<()> {
        let len = cr.full_len();
        for tr in &cr.results {
            let key = hash_key(&cr.stream_id, &tr.package, &tr.test);
            let i = match self.index.get(&key) {
                Some(&i) => i,
                None => {
                    self.results
                        .push(CollectedResult::empty(&cr.stream_id, &tr.package, &tr.test, len));
                    self.index.insert(key.clone(), self.results.len() - 1);
                    self.results.len() - 1
                }
            };

            let collected = &mut self.results[i];
            if collected.len() != len {
                return Err(QcError::shape(key, collected.len(), len));
            }
            if tr.flags.len() != cr.subset_len() {
                return Err(QcError::shape(key, cr.subset_len(), tr.flags.len()));
            }
            merge_into(&mut collected.flags, &cr.subset_indexes, &tr.flags, cr.covers_all());
            collected.merge_axes(&cr);
        }
        self.failures.extend(cr.failures);
        Ok(())
    }

    pub fn results(&self) -> &[CollectedResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<CollectedResult> {
        self.results
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CollectedResult> {
        self.results.iter()
    }

    pub fn get(&self, stream_id: &str, package: &str, test: &str) -> Option<&CollectedResult> {
        self.index
            .get(&hash_key(stream_id, package, test))
            .map(|&i| &self.results[i])
    }

    /// Tests that raised during the run
    pub fn failures(&self) -> &[TestFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Distinct stream ids in first-seen order
    pub fn stream_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for r in &self.results {
            if !ids.contains(&r.stream_id.as_str()) {
                ids.push(&r.stream_id);
            }
        }
        ids
    }

    /// Bare flag arrays keyed `stream -> package -> test`
    pub fn to_dict(&self) -> ResultMap {
        let mut map = ResultMap::new();
        for r in &self.results {
            map.entry(r.stream_id.clone())
                .or_default()
                .entry(r.package.clone())
                .or_default()
                .insert(r.test.clone(), r.flags.clone());
        }
        map
    }

    /// Combine every collected flag array into one rollup result, appended
    /// under an empty stream id as `qartod.<name>`.
    pub fn compute_aggregate(&mut self, name: &str) -> Result<&CollectedResult> {
        let vectors: Vec<&[QartodFlag]> = self.results.iter().map(|r| r.flags.as_slice()).collect();
        let flags = qartod_compare(&vectors)?;
        info!("Computed {} over {} results", name, vectors.len());

        let mut rollup = CollectedResult::empty("", QARTOD_PACKAGE, name, flags.len());
        rollup.flags = flags;
        let i = self.insert(rollup);
        Ok(&self.results[i])
    }

    /// Add a finished result, replacing any result with the same key.
    /// Returns its position.
    pub fn insert(&mut self, result: CollectedResult) -> usize {
        let key = result.key();
        match self.index.get(&key) {
            Some(&i) => {
                self.results[i] = result;
                i
            }
            None => {
                self.results.push(result);
                self.index.insert(key, self.results.len() - 1);
                self.results.len() - 1
            }
        }
    }
}

impl<'a> IntoIterator for &'a CollectedResults {
    type Item = &'a CollectedResult;
    type IntoIter = std::slice::Iter<'a, CollectedResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

/// Collect a run into full-length results per `stream: package.test`.
///
/// Adapter errors (unreadable stream data) abort the collection; failed
/// tests are carried in [`CollectedResults::failures`].
pub fn collect_results<I>(results: I) -> Result<CollectedResults>
where
    I: IntoIterator<Item = Result<ContextResult>>,
{
    let mut collected = CollectedResults::new();
    let mut merged = 0usize;
    for cr in results {
        collected.add(cr?)?;
        merged += 1;
    }
    debug!(
        "Collected {} context results into {} results with {} failures",
        merged,
        collected.len(),
        collected.failures().len()
    );
    Ok(collected)
}

/// Collect a run into bare flag arrays keyed `stream -> package -> test`
pub fn collect_results_dict<I>(results: I) -> Result<ResultMap>
where
    I: IntoIterator<Item = Result<ContextResult>>,
{
    Ok(collect_results(results)?.to_dict())
}
