//! In-memory array adapter.
//!
//! The source is either one unnamed array, used for every stream of the
//! configuration, or a set of named arrays keyed by stream id. Axes are
//! parallel arrays, or scalars broadcast to the stream length.

use super::{QcStream, SubsetInputs, apply_region, execute_calls, window_mask};
use crate::config::{Call, ContextConfig};
use crate::error::{QcError, Result};
use crate::stream::ContextResult;
use crate::utils::Timestamp;
use tracing::{Span, info_span, warn};

/// Stream data for an [`ArrayStream`]
#[derive(Debug, Clone)]
pub enum ArrayInput {
    /// One array serving every stream id
    Single(Vec<f64>),
    /// Arrays keyed by stream id, in insertion order
    Named(Vec<(String, Vec<f64>)>),
}

impl ArrayInput {
    pub fn get(&self, stream_id: &str) -> Option<&[f64]> {
        match self {
            ArrayInput::Single(values) => Some(values),
            ArrayInput::Named(streams) => streams
                .iter()
                .find(|(name, _)| name == stream_id)
                .map(|(_, values)| values.as_slice()),
        }
    }
}

/// A depth or position axis
#[derive(Debug, Clone, PartialEq)]
pub enum AuxValues {
    Scalar(f64),
    Values(Vec<f64>),
}

impl AuxValues {
    /// Expand to `len` values; arrays must already have that length
    pub fn broadcast(&self, stream_id: &str, name: &str, len: usize) -> Result<Vec<f64>> {
        match self {
            AuxValues::Scalar(v) => Ok(vec![*v; len]),
            AuxValues::Values(values) if values.len() == len => Ok(values.clone()),
            AuxValues::Values(values) => Err(QcError::stream_data(
                stream_id,
                format!("{name} has {} values, stream has {len}", values.len()),
            )),
        }
    }
}

impl From<f64> for AuxValues {
    fn from(value: f64) -> Self {
        AuxValues::Scalar(value)
    }
}

impl From<Vec<f64>> for AuxValues {
    fn from(values: Vec<f64>) -> Self {
        AuxValues::Values(values)
    }
}

/// Runs configurations against in-memory arrays
#[derive(Debug)]
pub struct ArrayStream {
    inp: ArrayInput,
    tinp: Option<Vec<Timestamp>>,
    zinp: Option<AuxValues>,
    lat: Option<AuxValues>,
    lon: Option<AuxValues>,
    span: Span,
}

impl ArrayStream {
    /// One array used for every stream id
    pub fn new(inp: Vec<f64>) -> Self {
        Self::from_input(ArrayInput::Single(inp))
    }

    /// Arrays keyed by stream id
    pub fn named<S: Into<String>>(streams: impl IntoIterator<Item = (S, Vec<f64>)>) -> Self {
        Self::from_input(ArrayInput::Named(
            streams
                .into_iter()
                .map(|(name, values)| (name.into(), values))
                .collect(),
        ))
    }

    pub fn from_input(inp: ArrayInput) -> Self {
        Self {
            inp,
            tinp: None,
            zinp: None,
            lat: None,
            lon: None,
            span: info_span!("array_stream"),
        }
    }

    pub fn with_time(mut self, tinp: Vec<Timestamp>) -> Self {
        self.tinp = Some(tinp);
        self
    }

    pub fn with_z(mut self, zinp: impl Into<AuxValues>) -> Self {
        self.zinp = Some(zinp.into());
        self
    }

    pub fn with_lat(mut self, lat: impl Into<AuxValues>) -> Self {
        self.lat = Some(lat.into());
        self
    }

    pub fn with_lon(mut self, lon: impl Into<AuxValues>) -> Self {
        self.lon = Some(lon.into());
        self
    }

    /// Scope log records of every run to `span`
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn input(&self) -> &ArrayInput {
        &self.inp
    }

    fn evaluate(&self, cc: &ContextConfig, stream_id: &str, data: &[f64]) -> Result<ContextResult> {
        let n = data.len();
        if let Some(tinp) = &self.tinp {
            if tinp.len() != n {
                return Err(QcError::stream_data(
                    stream_id,
                    format!("time has {} values, stream has {n}", tinp.len()),
                ));
            }
        }
        let broadcast = |axis: &Option<AuxValues>, name: &str| {
            axis.as_ref()
                .map(|values| values.broadcast(stream_id, name, n))
                .transpose()
        };
        let zinp = broadcast(&self.zinp, "z")?;
        let lat = broadcast(&self.lat, "lat")?;
        let lon = broadcast(&self.lon, "lon")?;

        let mut mask = window_mask(&cc.context, self.tinp.as_deref(), n);
        apply_region(&mut mask, &cc.context, lat.as_deref(), lon.as_deref());

        let inputs = SubsetInputs::select(
            &mask,
            data,
            self.tinp.as_deref(),
            zinp.as_deref(),
            lat.as_deref(),
            lon.as_deref(),
        );
        let calls: Vec<&Call> = cc.calls_for(stream_id).collect();
        Ok(execute_calls(stream_id, &cc.context, &calls, mask, inputs))
    }
}

impl QcStream for ArrayStream {
    fn span(&self) -> &Span {
        &self.span
    }

    fn run_stream(&self, cc: &ContextConfig, stream_id: &str) -> Option<Result<ContextResult>> {
        let Some(data) = self.inp.get(stream_id) else {
            warn!("{} not in the input arrays, skipping", stream_id);
            return None;
        };
        Some(self.evaluate(cc, stream_id, data))
    }
}
