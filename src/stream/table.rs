//! Tabular adapter over a polars `DataFrame`.
//!
//! Stream ids are column names; time, depth and position are read from the
//! axis columns named in [`AxisNames`] when present.

use super::{QcStream, SubsetInputs, apply_region, execute_calls, window_mask};
use crate::config::{Call, ContextConfig};
use crate::error::{QcError, Result};
use crate::settings::AxisNames;
use crate::stream::ContextResult;
use crate::utils::{Timestamp, parse_timestamp, timestamp_from_epoch_millis, timestamp_from_epoch_seconds};
use polars::prelude::*;
use std::path::Path;
use tracing::{Span, debug, info_span, warn};

/// Runs configurations against the columns of a table
#[derive(Debug)]
pub struct TableStream {
    df: DataFrame,
    axes: AxisNames,
    tinp: Option<Vec<Timestamp>>,
    zinp: Option<Vec<f64>>,
    lat: Option<Vec<f64>>,
    lon: Option<Vec<f64>>,
    span: Span,
}

impl TableStream {
    /// Table with the default axis names
    pub fn new(df: DataFrame) -> Result<Self> {
        Self::with_axes(df, AxisNames::default())
    }

    pub fn with_axes(df: DataFrame, axes: AxisNames) -> Result<Self> {
        let tinp = if has_column(&df, &axes.time) {
            Some(column_to_timestamps(&df, &axes.time)?)
        } else {
            None
        };
        let numeric_axis = |name: &str| -> Result<Option<Vec<f64>>> {
            if has_column(&df, name) {
                column_to_f64(&df, name).map(Some)
            } else {
                Ok(None)
            }
        };
        let zinp = numeric_axis(&axes.z)?;
        let lat = numeric_axis(&axes.lat)?;
        let lon = numeric_axis(&axes.lon)?;

        debug!(
            "Table with {} rows, axis columns: {:?}",
            df.height(),
            axes.all()
                .iter()
                .filter(|name| has_column(&df, name))
                .collect::<Vec<_>>()
        );

        Ok(Self {
            df,
            axes,
            tinp,
            zinp,
            lat,
            lon,
            span: info_span!("table_stream"),
        })
    }

    /// Read a CSV file with a header row, parsing date columns
    pub fn from_csv(path: &Path, axes: AxisNames) -> Result<Self> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_parse_options(CsvParseOptions::default().with_try_parse_dates(true))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;
        Self::with_axes(df, axes)
    }

    pub fn from_parquet(path: &Path, axes: AxisNames) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let df = ParquetReader::new(file).finish()?;
        Self::with_axes(df, axes)
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn axes(&self) -> &AxisNames {
        &self.axes
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    fn evaluate(&self, cc: &ContextConfig, stream_id: &str) -> Result<ContextResult> {
        let data = column_to_f64(&self.df, stream_id)?;
        let n = data.len();

        let mut mask = window_mask(&cc.context, self.tinp.as_deref(), n);
        apply_region(&mut mask, &cc.context, self.lat.as_deref(), self.lon.as_deref());

        let inputs = SubsetInputs::select(
            &mask,
            &data,
            self.tinp.as_deref(),
            self.zinp.as_deref(),
            self.lat.as_deref(),
            self.lon.as_deref(),
        );
        let calls: Vec<&Call> = cc.calls_for(stream_id).collect();
        Ok(execute_calls(stream_id, &cc.context, &calls, mask, inputs))
    }
}

impl QcStream for TableStream {
    fn span(&self) -> &Span {
        &self.span
    }

    fn run_stream(&self, cc: &ContextConfig, stream_id: &str) -> Option<Result<ContextResult>> {
        if !has_column(&self.df, stream_id) {
            warn!("{} is not a column in the table, skipping", stream_id);
            return None;
        }
        Some(self.evaluate(cc, stream_id))
    }
}

fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_index(name).is_some()
}

/// Numeric column as f64, nulls as NaN
pub(crate) fn column_to_f64(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let series = df.column(name)?.as_materialized_series();
    let cast = series.cast(&DataType::Float64).map_err(|e| {
        QcError::stream_data(name, format!("cannot read {} as numbers: {e}", series.dtype()))
    })?;
    Ok(cast
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

/// Time column from datetime, date, string or epoch-seconds values
pub(crate) fn column_to_timestamps(df: &DataFrame, name: &str) -> Result<Vec<Timestamp>> {
    let series = df.column(name)?.as_materialized_series();
    let null_time = || QcError::stream_data(name, "time axis contains nulls");

    match series.dtype() {
        DataType::Datetime(_, _) | DataType::Date => {
            let millis = series
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
                .cast(&DataType::Int64)?;
            millis
                .i64()?
                .into_iter()
                .map(|v| v.and_then(timestamp_from_epoch_millis).ok_or_else(null_time))
                .collect()
        }
        DataType::String => series
            .str()?
            .into_iter()
            .map(|v| v.ok_or_else(null_time).and_then(parse_timestamp))
            .collect(),
        other => match series.cast(&DataType::Float64) {
            Ok(seconds) => seconds
                .f64()?
                .into_iter()
                .map(|v| v.and_then(timestamp_from_epoch_seconds).ok_or_else(null_time))
                .collect(),
            Err(_) => Err(QcError::stream_data(
                name,
                format!("unsupported time column type {other}"),
            )),
        },
    }
}
