//! In-memory coordinate-indexed dataset.
//!
//! A [`GridDataset`] holds named n-dimensional variables over named
//! dimensions, in the shape the gridded stream adapters consume. Flag
//! arrays produced by the collector can be written back as variables with
//! the dimensions of the stream they were computed on.

use crate::constants::{FLAG_MEANINGS, flag_values};
use crate::error::{QcError, Result};
use crate::flags::{QartodFlag, flags_to_values};
use crate::utils::Timestamp;
use ndarray::{ArrayD, IxDyn};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

/// Values of one grid variable
#[derive(Debug, Clone, PartialEq)]
pub enum GridValues {
    Float(ArrayD<f64>),
    Time(ArrayD<Timestamp>),
    Flags(ArrayD<u8>),
}

impl GridValues {
    pub fn shape(&self) -> &[usize] {
        match self {
            GridValues::Float(values) => values.shape(),
            GridValues::Time(values) => values.shape(),
            GridValues::Flags(values) => values.shape(),
        }
    }

    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridVariable {
    pub dims: Vec<String>,
    pub values: GridValues,
    pub attrs: Map<String, Value>,
}

impl GridVariable {
    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_float(&self) -> Option<&ArrayD<f64>> {
        match &self.values {
            GridValues::Float(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<&ArrayD<Timestamp>> {
        match &self.values {
            GridValues::Time(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_flags(&self) -> Option<&ArrayD<u8>> {
        match &self.values {
            GridValues::Flags(values) => Some(values),
            _ => None,
        }
    }
}

/// Named variables over named dimensions, in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridDataset {
    dims: Vec<(String, usize)>,
    variables: Vec<(String, GridVariable)>,
}

impl GridDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`GridDataset::add_variable`]
    pub fn with_variable(mut self, name: &str, dims: &[&str], values: GridValues) -> Result<Self> {
        self.add_variable(name, dims, values)?;
        Ok(self)
    }

    /// 1-D float variable built from a vector
    pub fn with_series(self, name: &str, dim: &str, values: Vec<f64>) -> Result<Self> {
        let len = values.len();
        let values = ArrayD::from_shape_vec(IxDyn(&[len]), values)
            .map_err(|e| QcError::stream_data(name, e.to_string()))?;
        self.with_variable(name, &[dim], GridValues::Float(values))
    }

    /// 1-D time variable built from a vector
    pub fn with_times(self, name: &str, dim: &str, values: Vec<Timestamp>) -> Result<Self> {
        let len = values.len();
        let values = ArrayD::from_shape_vec(IxDyn(&[len]), values)
            .map_err(|e| QcError::stream_data(name, e.to_string()))?;
        self.with_variable(name, &[dim], GridValues::Time(values))
    }

    /// Add or replace a variable. Every dimension must agree in size with
    /// the variables already present.
    pub fn add_variable(&mut self, name: &str, dims: &[&str], values: GridValues) -> Result<()> {
        let shape = values.shape().to_vec();
        if shape.len() != dims.len() {
            return Err(QcError::stream_data(
                name,
                format!("{} dimensions named for a {}-d array", dims.len(), shape.len()),
            ));
        }
        let mut new_dims: Vec<(String, usize)> = Vec::new();
        for (dim, &size) in dims.iter().zip(&shape) {
            let known = self
                .dim_len(dim)
                .or_else(|| new_dims.iter().find(|(d, _)| d == dim).map(|(_, s)| *s));
            match known {
                Some(existing) if existing != size => {
                    return Err(QcError::stream_data(
                        name,
                        format!("dimension {dim} has size {existing}, variable has {size}"),
                    ));
                }
                Some(_) => {}
                None => new_dims.push((dim.to_string(), size)),
            }
        }
        self.dims.extend(new_dims);

        let variable = GridVariable {
            dims: dims.iter().map(|d| d.to_string()).collect(),
            values,
            attrs: Map::new(),
        };
        match self.variables.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => {
                warn!("Replacing existing variable {}", name);
                *existing = variable;
            }
            None => self.variables.push((name.to_string(), variable)),
        }
        Ok(())
    }

    pub fn dims(&self) -> &[(String, usize)] {
        &self.dims
    }

    pub fn dim_len(&self, dim: &str) -> Option<usize> {
        self.dims.iter().find(|(d, _)| d == dim).map(|(_, size)| *size)
    }

    pub fn variable(&self, name: &str) -> Option<&GridVariable> {
        self.variables.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn variable_mut(&mut self, name: &str) -> Option<&mut GridVariable> {
        self.variables.iter_mut().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variable(name).is_some()
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, &GridVariable)> {
        self.variables.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Store a full-length flag array as variable `name`, shaped and
    /// dimensioned like the stream variable it was computed on.
    pub fn insert_flags(&mut self, stream_id: &str, name: &str, flags: &[QartodFlag]) -> Result<()> {
        let Some(stream) = self.variable(stream_id) else {
            return Err(QcError::stream_data(stream_id, "not a variable in the dataset"));
        };
        if stream.len() != flags.len() {
            return Err(QcError::shape(
                format!("{stream_id} -> {name}"),
                stream.len(),
                flags.len(),
            ));
        }
        let shape = stream.shape().to_vec();
        let dims: Vec<String> = stream.dims.clone();
        let values = ArrayD::from_shape_vec(IxDyn(&shape), flags_to_values(flags))
            .map_err(|e| QcError::stream_data(stream_id, e.to_string()))?;

        let dim_refs: Vec<&str> = dims.iter().map(String::as_str).collect();
        self.add_variable(name, &dim_refs, GridValues::Flags(values))?;
        if let Some(variable) = self.variable_mut(name) {
            variable.attrs.insert("ioos_qc_target".into(), json!(stream_id));
            variable.attrs.insert("flag_meanings".into(), json!(FLAG_MEANINGS));
            variable.attrs.insert("flag_values".into(), json!(flag_values::ALL));
        }
        debug!("Inserted {} flags for {} as {}", flags.len(), stream_id, name);
        Ok(())
    }
}

/// Expand an axis variable to the row-major positions of a variable.
///
/// An axis with the same dimensions is flattened as is; a 1-D axis along
/// one of the variable's dimensions is broadcast over the others; any other
/// axis is used positionally only when it has the same number of values.
pub(crate) fn expand_axis<T: Clone>(
    axis_dims: &[String],
    axis: &ArrayD<T>,
    var_dims: &[String],
    var_shape: &[usize],
) -> Option<Vec<T>> {
    let total: usize = var_shape.iter().product();
    if axis_dims == var_dims {
        return Some(axis.iter().cloned().collect());
    }
    if axis_dims.len() == 1 {
        if let Some(k) = var_dims.iter().position(|d| *d == axis_dims[0]) {
            let values: Vec<T> = axis.iter().cloned().collect();
            return Some(
                (0..total)
                    .map(|pos| values[index_along(pos, var_shape, k)].clone())
                    .collect(),
            );
        }
    }
    if axis.len() == total {
        return Some(axis.iter().cloned().collect());
    }
    None
}

/// Index along dimension `k` of row-major flat position `pos`
pub(crate) fn index_along(pos: usize, shape: &[usize], k: usize) -> usize {
    let stride: usize = shape[k + 1..].iter().product();
    (pos / stride) % shape[k]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn grid_2d() -> GridDataset {
        let temp = ArrayD::from_shape_vec(IxDyn(&[2, 3]), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        GridDataset::new()
            .with_series("depth", "depth", vec![0.0, 10.0, 20.0])
            .unwrap()
            .with_variable("temp", &["time", "depth"], GridValues::Float(temp))
            .unwrap()
    }

    #[test]
    fn test_dimension_sizes_must_agree() {
        let grid = grid_2d();
        assert_eq!(grid.dim_len("depth"), Some(3));
        assert_eq!(grid.dim_len("time"), Some(2));

        let result = grid.with_series("bad", "depth", vec![1.0, 2.0]);
        assert!(matches!(result, Err(QcError::StreamData { .. })));
    }

    #[test]
    fn test_rejected_variable_registers_no_dimension() {
        let mut grid = grid_2d();
        let values = ArrayD::from_shape_vec(IxDyn(&[4, 2]), vec![0.0; 8]).unwrap();
        let result = grid.add_variable("salt", &["station", "depth"], GridValues::Float(values));

        assert!(matches!(result, Err(QcError::StreamData { .. })));
        assert_eq!(grid.dim_len("station"), None);
        assert_eq!(grid.dims().len(), 2);
        assert!(!grid.contains("salt"));

        let repeated = ArrayD::from_shape_vec(IxDyn(&[2, 3]), vec![0.0; 6]).unwrap();
        let result = grid.add_variable("cov", &["lag", "lag"], GridValues::Float(repeated));
        assert!(result.is_err());
        assert_eq!(grid.dim_len("lag"), None);
    }

    #[test]
    fn test_expand_axis_broadcasts_along_dimension() {
        let grid = grid_2d();
        let temp = grid.variable("temp").unwrap();
        let depth = grid.variable("depth").unwrap();
        let expanded =
            expand_axis(&depth.dims, depth.as_float().unwrap(), &temp.dims, temp.shape()).unwrap();
        assert_eq!(expanded, vec![0.0, 10.0, 20.0, 0.0, 10.0, 20.0]);

        let t0 = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let t1 = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let times = ArrayD::from_shape_vec(IxDyn(&[2]), vec![t0, t1]).unwrap();
        let expanded = expand_axis(&["time".to_string()], &times, &temp.dims, temp.shape()).unwrap();
        assert_eq!(expanded, vec![t0, t0, t0, t1, t1, t1]);
    }

    #[test]
    fn test_insert_flags_takes_stream_shape() {
        let mut grid = grid_2d();
        let flags = vec![
            QartodFlag::Good,
            QartodFlag::Suspect,
            QartodFlag::Fail,
            QartodFlag::Good,
            QartodFlag::Missing,
            QartodFlag::Unknown,
        ];
        grid.insert_flags("temp", "temp_qartod_gross_range_test", &flags)
            .unwrap();

        let inserted = grid.variable("temp_qartod_gross_range_test").unwrap();
        assert_eq!(inserted.dims, vec!["time", "depth"]);
        assert_eq!(inserted.shape(), &[2, 3]);
        let values: Vec<u8> = inserted.as_flags().unwrap().iter().copied().collect();
        assert_eq!(values, vec![1, 3, 4, 1, 9, 2]);
        assert_eq!(inserted.attrs["ioos_qc_target"], json!("temp"));

        let short = grid.insert_flags("temp", "short", &flags[..2]);
        assert!(matches!(short, Err(QcError::ShapeMismatch { .. })));
        assert!(grid.insert_flags("salt", "salt_flags", &flags).is_err());
    }
}
