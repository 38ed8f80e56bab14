//! Table store for collected results.
//!
//! Lays collected results out as a polars [`DataFrame`]: the axis columns,
//! optionally the tested data, then one `UInt8` flag column per
//! `stream.package.test` under a CF-safe name. The frame can be written to
//! Parquet with the compression from [`QcSettings`].

use crate::error::{QcError, Result};
use crate::flags::flags_to_values;
use crate::results::{CollectedResult, CollectedResults, collect_results};
use crate::settings::QcSettings;
use crate::stream::ContextResult;
use crate::utils::cf_safe_name;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, warn};

/// Include/exclude selection of flag columns.
///
/// Names match a result's stream id, its test name or its qualified
/// `package.test` name.
#[derive(Debug, Clone, Default)]
pub struct ColumnFilter {
    include: Option<Vec<String>>,
    exclude: Vec<String>,
}

impl ColumnFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.include = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn exclude<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.exclude = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn allows(&self, result: &CollectedResult) -> bool {
        let qualified = format!("{}.{}", result.package, result.test);
        let matches = |name: &String| {
            *name == result.stream_id || *name == result.test || *name == qualified
        };
        if let Some(include) = &self.include {
            if !include.iter().any(matches) {
                return false;
            }
        }
        !self.exclude.iter().any(matches)
    }
}

/// Column name for a result's flags
pub fn flag_column_name(result: &CollectedResult) -> String {
    let label = [
        result.stream_id.as_str(),
        result.package.as_str(),
        result.test.as_str(),
    ]
    .iter()
    .filter(|part| !part.is_empty())
    .copied()
    .collect::<Vec<_>>()
    .join(".");
    cf_safe_name(&label)
}

/// Collected results laid out as a table
#[derive(Debug, Clone)]
pub struct TableStore {
    collected: CollectedResults,
    settings: QcSettings,
}

impl TableStore {
    pub fn new(collected: CollectedResults, settings: QcSettings) -> Self {
        Self {
            collected,
            settings,
        }
    }

    /// Collect a run, adding the rollup when the settings ask for it
    pub fn from_results<I>(results: I, settings: QcSettings) -> Result<Self>
    where
        I: IntoIterator<Item = Result<ContextResult>>,
    {
        let mut store = Self::new(collect_results(results)?, settings);
        if store.settings.compute_rollup {
            store.compute_aggregate()?;
        }
        Ok(store)
    }

    pub fn collected(&self) -> &CollectedResults {
        &self.collected
    }

    pub fn settings(&self) -> &QcSettings {
        &self.settings
    }

    pub fn stream_ids(&self) -> Vec<&str> {
        self.collected.stream_ids()
    }

    /// Add the total aggregate under the configured rollup name
    pub fn compute_aggregate(&mut self) -> Result<()> {
        let name = self.settings.rollup_name.clone();
        self.collected.compute_aggregate(&name)?;
        Ok(())
    }

    pub fn to_dataframe(&self, filter: &ColumnFilter) -> Result<DataFrame> {
        let axes = &self.settings.axes;
        let mut columns: Vec<Column> = Vec::new();
        let mut names: Vec<String> = Vec::new();
        let mut height: Option<usize> = None;

        let mut push = |columns: &mut Vec<Column>, names: &mut Vec<String>, column: Column| -> Result<()> {
            let expected = *height.get_or_insert(column.len());
            if column.len() != expected {
                return Err(QcError::shape(column.name().to_string(), expected, column.len()));
            }
            names.push(column.name().to_string());
            columns.push(column);
            Ok(())
        };

        for cr in self.collected.iter() {
            if self.settings.write_axes {
                if let Some(tinp) = cr.tinp.as_ref().filter(|_| !names.contains(&axes.time)) {
                    info!("Adding column {} from stream {}", axes.time, cr.stream_id);
                    let column = Column::new(axes.time.as_str().into(), tinp.clone());
                    push(&mut columns, &mut names, column)?;
                }
                for (name, values) in [(&axes.z, &cr.zinp), (&axes.lon, &cr.lon), (&axes.lat, &cr.lat)] {
                    if let Some(values) = values.as_ref().filter(|_| !names.contains(name)) {
                        info!("Adding column {} from stream {}", name, cr.stream_id);
                        let column = Column::new(name.as_str().into(), values.clone());
                        push(&mut columns, &mut names, column)?;
                    }
                }
            }

            if !filter.allows(cr) {
                debug!("Filtered out {}", cr.key());
                continue;
            }

            if self.settings.write_data && !cr.stream_id.is_empty() && !names.contains(&cr.stream_id) {
                let column = Column::new(cr.stream_id.as_str().into(), cr.data.clone());
                push(&mut columns, &mut names, column)?;
            }

            let column_name = flag_column_name(cr);
            if names.contains(&column_name) {
                warn!("Found duplicate QC results column: {}, skipping.", column_name);
                continue;
            }
            let column = Column::new(column_name.as_str().into(), flags_to_values(&cr.flags));
            push(&mut columns, &mut names, column)?;
        }

        Ok(DataFrame::new(columns)?)
    }

    /// Write the table to a Parquet file and return it
    pub fn save(&self, path: &Path, filter: &ColumnFilter) -> Result<DataFrame> {
        let mut df = self.to_dataframe(filter)?;
        let file = File::create(path)?;
        ParquetWriter::new(file)
            .with_compression(self.settings.compression.to_polars_compression())
            .finish(&mut df)?;
        info!(
            "Wrote {} rows x {} columns to {}",
            df.height(),
            df.width(),
            path.display()
        );
        Ok(df)
    }
}
