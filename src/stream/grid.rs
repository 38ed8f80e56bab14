//! Gridded dataset adapters.
//!
//! [`GridStream`] reads every numeric variable of a [`GridDataset`] into
//! flat arrays up front and hands the work to an [`ArrayStream`] per
//! variable. [`LabeledGridStream`] keeps the dataset and subsets each
//! variable on request by the labels of its time dimension, turning the
//! selection back into a mask over that variable's native shape.

use super::{ArrayStream, QcStream, SubsetInputs, apply_region, execute_calls, window_mask};
use crate::config::{Call, Context, ContextConfig};
use crate::error::{QcError, Result};
use crate::grid::{GridDataset, GridVariable, expand_axis, index_along};
use crate::settings::AxisNames;
use crate::stream::ContextResult;
use crate::utils::Timestamp;
use tracing::{Span, debug, info_span, warn};

/// Axis values expanded to the row-major positions of one variable
#[derive(Debug, Default)]
struct VariableAxes {
    tinp: Option<Vec<Timestamp>>,
    zinp: Option<Vec<f64>>,
    lat: Option<Vec<f64>>,
    lon: Option<Vec<f64>>,
}

impl VariableAxes {
    fn resolve(
        dataset: &GridDataset,
        axes: &AxisNames,
        stream_id: &str,
        variable: &GridVariable,
    ) -> Result<Self> {
        let tinp = match dataset.variable(&axes.time) {
            None => None,
            Some(time) => {
                let Some(values) = time.as_time() else {
                    return Err(QcError::stream_data(
                        stream_id,
                        format!("time axis {} does not hold timestamps", axes.time),
                    ));
                };
                let expanded = expand_axis(&time.dims, values, &variable.dims, variable.shape());
                if expanded.is_none() {
                    warn!("{} cannot be aligned with {}, ignoring it", axes.time, stream_id);
                }
                expanded
            }
        };

        let numeric = |name: &str| -> Option<Vec<f64>> {
            let axis = dataset.variable(name)?;
            let Some(values) = axis.as_float() else {
                warn!("Axis {} is not numeric, ignoring it", name);
                return None;
            };
            let expanded = expand_axis(&axis.dims, values, &variable.dims, variable.shape());
            if expanded.is_none() {
                warn!("{} cannot be aligned with {}, ignoring it", name, stream_id);
            }
            expanded
        };

        Ok(Self {
            tinp,
            zinp: numeric(&axes.z),
            lat: numeric(&axes.lat),
            lon: numeric(&axes.lon),
        })
    }
}

fn stream_values(stream_id: &str, variable: &GridVariable) -> Result<Vec<f64>> {
    variable
        .as_float()
        .map(|values| values.iter().copied().collect())
        .ok_or_else(|| QcError::stream_data(stream_id, "variable is not numeric"))
}

/// Eager grid adapter: each variable is flattened into an array stream
#[derive(Debug)]
pub struct GridStream {
    streams: Vec<(String, ArrayStream)>,
    span: Span,
}

impl GridStream {
    pub fn new(dataset: &GridDataset) -> Result<Self> {
        Self::with_axes(dataset, AxisNames::default())
    }

    pub fn with_axes(dataset: &GridDataset, axes: AxisNames) -> Result<Self> {
        let mut streams = Vec::new();
        for (name, variable) in dataset.variables() {
            if axes.contains(name) || variable.as_float().is_none() {
                continue;
            }
            let data = stream_values(name, variable)?;
            let resolved = VariableAxes::resolve(dataset, &axes, name, variable)?;

            let mut stream = ArrayStream::named([(name, data)]);
            if let Some(tinp) = resolved.tinp {
                stream = stream.with_time(tinp);
            }
            if let Some(zinp) = resolved.zinp {
                stream = stream.with_z(zinp);
            }
            if let Some(lat) = resolved.lat {
                stream = stream.with_lat(lat);
            }
            if let Some(lon) = resolved.lon {
                stream = stream.with_lon(lon);
            }
            streams.push((name.to_string(), stream));
        }
        debug!("Loaded {} grid variables", streams.len());

        Ok(Self {
            streams,
            span: info_span!("grid_stream"),
        })
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn stream_ids(&self) -> Vec<&str> {
        self.streams.iter().map(|(name, _)| name.as_str()).collect()
    }
}

impl QcStream for GridStream {
    fn span(&self) -> &Span {
        &self.span
    }

    fn run_stream(&self, cc: &ContextConfig, stream_id: &str) -> Option<Result<ContextResult>> {
        let Some((_, stream)) = self.streams.iter().find(|(name, _)| name == stream_id) else {
            warn!("{} is not a variable in the dataset, skipping", stream_id);
            return None;
        };
        stream.run_stream(cc, stream_id)
    }
}

/// Lazy grid adapter subsetting each variable by time labels
#[derive(Debug)]
pub struct LabeledGridStream {
    dataset: GridDataset,
    axes: AxisNames,
    span: Span,
}

impl LabeledGridStream {
    pub fn new(dataset: GridDataset) -> Self {
        Self::with_axes(dataset, AxisNames::default())
    }

    pub fn with_axes(dataset: GridDataset, axes: AxisNames) -> Self {
        Self {
            dataset,
            axes,
            span: info_span!("labeled_grid_stream"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn dataset(&self) -> &GridDataset {
        &self.dataset
    }

    pub fn into_dataset(self) -> GridDataset {
        self.dataset
    }

    /// Mask over the variable's positions selected by the context window.
    ///
    /// With a 1-D time coordinate along one of the variable's dimensions,
    /// the window selects labels on that dimension and every position with a
    /// selected label is kept. Otherwise the window is applied to the
    /// expanded time values position by position.
    fn label_mask(
        &self,
        context: &Context,
        variable: &GridVariable,
        tinp: Option<&[Timestamp]>,
    ) -> Vec<bool> {
        let n = variable.len();
        if context.window.is_unbounded() {
            return vec![true; n];
        }
        let labelled = self.dataset.variable(&self.axes.time).and_then(|time| {
            let labels = time.as_time()?;
            if time.dims.len() != 1 {
                return None;
            }
            let k = variable.dims.iter().position(|d| *d == time.dims[0])?;
            Some((labels, k))
        });

        match labelled {
            Some((labels, k)) => {
                let selected: Vec<bool> = labels.iter().map(|t| context.window.contains(t)).collect();
                debug!(
                    "{} of {} labels on {} in {}",
                    selected.iter().filter(|&&s| s).count(),
                    selected.len(),
                    variable.dims[k],
                    context.window
                );
                (0..n)
                    .map(|pos| selected[index_along(pos, variable.shape(), k)])
                    .collect()
            }
            None => window_mask(context, tinp, n),
        }
    }

    fn evaluate(&self, cc: &ContextConfig, stream_id: &str, variable: &GridVariable) -> Result<ContextResult> {
        let data = stream_values(stream_id, variable)?;
        let resolved = VariableAxes::resolve(&self.dataset, &self.axes, stream_id, variable)?;

        let mut mask = self.label_mask(&cc.context, variable, resolved.tinp.as_deref());
        apply_region(&mut mask, &cc.context, resolved.lat.as_deref(), resolved.lon.as_deref());

        let inputs = SubsetInputs::select(
            &mask,
            &data,
            resolved.tinp.as_deref(),
            resolved.zinp.as_deref(),
            resolved.lat.as_deref(),
            resolved.lon.as_deref(),
        );
        let calls: Vec<&Call> = cc.calls_for(stream_id).collect();
        Ok(execute_calls(stream_id, &cc.context, &calls, mask, inputs))
    }
}

impl QcStream for LabeledGridStream {
    fn span(&self) -> &Span {
        &self.span
    }

    fn run_stream(&self, cc: &ContextConfig, stream_id: &str) -> Option<Result<ContextResult>> {
        let Some(variable) = self.dataset.variable(stream_id) else {
            warn!("{} is not a variable in the dataset, skipping", stream_id);
            return None;
        };
        Some(self.evaluate(cc, stream_id, variable))
    }
}
