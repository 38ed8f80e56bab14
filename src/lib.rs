//! QARTOD QC Library
//!
//! Configuration-driven quality-control flagging for oceanographic,
//! atmospheric and wave time series, following the QARTOD flag standard.
//!
//! This library provides tools for:
//! - Parsing declarative QC configurations (flat, single-context or
//!   multi-context; JSON or YAML) into resolved test calls
//! - Running those calls against in-memory arrays, polars tables and
//!   gridded datasets, subset by each context's time window
//! - Scattering per-context results back into full-length flag arrays
//! - Aggregating flags by QARTOD priority and storing them as Parquet
//!
//! ```no_run
//! use qartod_qc::{ArrayStream, Config, QcStream, collect_results};
//!
//! let config: Config = r#"
//! temperature:
//!   qartod:
//!     gross_range_test:
//!       suspect_span: [0, 30]
//!       fail_span: [-5, 40]
//!     aggregate: {}
//! "#
//! .parse()?;
//!
//! let stream = ArrayStream::new(vec![12.0, 31.0, 45.0]);
//! let collected = collect_results(stream.run(&config))?;
//! for result in collected.results() {
//!     println!("{}: {:?}", result.key(), result.flags);
//! }
//! # Ok::<(), qartod_qc::QcError>(())
//! ```

pub mod checks;
pub mod config;
pub mod constants;
pub mod error;
pub mod flags;
pub mod grid;
pub mod region;
pub mod registry;
pub mod results;
pub mod settings;
pub mod store;
pub mod stream;
pub mod summary;
pub mod utils;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use config::{Call, Config, Context, ContextConfig, TimeWindow};
pub use error::{QcError, Result};
pub use flags::{FlagCounts, QartodFlag};
pub use grid::{GridDataset, GridValues, GridVariable};
pub use region::GeometryCollection;
pub use results::{CollectedResult, CollectedResults, ResultMap, collect_results, collect_results_dict};
pub use settings::{AxisNames, QcSettings};
pub use store::{ColumnFilter, TableStore};
pub use stream::{
    ArrayStream, ContextResult, GridStream, LabeledGridStream, QcStream, TableStream, TestFailure,
    TestResult,
};
pub use summary::summarize_flags;
