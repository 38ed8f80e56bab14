//! Integration tests for running configurations end to end
//!
//! These tests run configurations through the stream adapters, collect the
//! partial results and check the merged flags position by position.

use chrono::{Duration, NaiveDateTime};
use polars::prelude::*;
use qartod_qc::checks::qartod::{gross_range, qartod_compare};
use qartod_qc::checks::Span;
use qartod_qc::flags::flags_from_values;
use qartod_qc::{
    ArrayStream, ColumnFilter, Config, QartodFlag, QcSettings, QcStream, TableStore, TableStream,
    collect_results, collect_results_dict, summarize_flags,
};
use serde_json::json;
use tempfile::TempDir;

fn start() -> NaiveDateTime {
    qartod_qc::utils::parse_timestamp("2020-01-01T00:00:00").unwrap()
}

/// 50 hourly rows with `variable1 = 0..49`
fn fifty_rows() -> DataFrame {
    let times: Vec<NaiveDateTime> = (0..50).map(|i| start() + Duration::hours(i)).collect();
    let values: Vec<f64> = (0..50).map(f64::from).collect();
    DataFrame::new(vec![
        Column::new("time".into(), times),
        Column::new("variable1".into(), values),
    ])
    .unwrap()
}

fn codes(flags: &[QartodFlag]) -> Vec<u8> {
    flags.iter().map(|f| f.value()).collect()
}

#[test]
fn test_single_context_gross_range_with_aggregate() {
    let stream = TableStream::new(fifty_rows()).unwrap();
    let config: Config = r#"
variable1:
  qartod:
    gross_range_test:
      suspect_span: [20, 30]
      fail_span: [10, 40]
    aggregate: {}
"#
    .parse()
    .unwrap();

    let collected = collect_results(stream.run(&config)).unwrap();
    assert_eq!(collected.len(), 2);
    assert!(collected.failures().is_empty());

    let gross = collected.get("variable1", "qartod", "gross_range_test").unwrap();
    let expected: Vec<u8> = (0..50)
        .map(|v| match v {
            0..=9 => 4,
            10..=19 => 3,
            20..=30 => 1,
            31..=40 => 3,
            _ => 4,
        })
        .collect();
    assert_eq!(codes(&gross.flags), expected);

    let aggregate = collected.get("variable1", "qartod", "aggregate").unwrap();
    assert_eq!(aggregate.flags, gross.flags);
    assert_eq!(aggregate.data, (0..50).map(f64::from).collect::<Vec<_>>());

    let dict = collect_results_dict(stream.run(&config)).unwrap();
    assert_eq!(dict["variable1"]["qartod"]["gross_range_test"], gross.flags);
}

#[test]
fn test_disjoint_windows_govern_their_own_rows() {
    let stream = TableStream::new(fifty_rows()).unwrap();
    let config = Config::from_value(&json!({
        "contexts": [
            {
                "window": {"starting": "2020-01-01T00:00:00", "ending": "2020-01-02T01:00:00"},
                "streams": {"variable1": {"qartod": {"gross_range_test": {
                    "suspect_span": [20, 30], "fail_span": [10, 40]
                }}}}
            },
            {
                "window": {"starting": "2020-01-02T01:00:00"},
                "streams": {"variable1": {"qartod": {"gross_range_test": {
                    "suspect_span": [40, 45], "fail_span": [30, 48]
                }}}}
            }
        ]
    }))
    .unwrap();
    assert_eq!(config.contexts().len(), 2);

    let results: Vec<_> = stream.run(&config).collect::<qartod_qc::Result<_>>().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].subset_len(), 25);
    assert_eq!(results[1].subset_len(), 25);

    let collected = collect_results(results.into_iter().map(Ok)).unwrap();
    assert_eq!(collected.len(), 1);
    let merged = codes(&collected.results()[0].flags);

    assert_eq!(merged[0..10], [4; 10]);
    assert_eq!(merged[10..20], [3; 10]);
    assert_eq!(merged[20..25], [1; 5]);
    assert_eq!(merged[25..30], [4; 5]);
    assert_eq!(merged[30..40], [3; 10]);
    assert_eq!(merged[40..46], [1; 6]);
    assert_eq!(merged[46..49], [3; 3]);
    assert_eq!(merged[49], 4);
}

#[test]
fn test_scatter_is_lossless_and_leaves_gaps_unknown() {
    let values: Vec<f64> = (0..50).map(f64::from).collect();
    let times: Vec<NaiveDateTime> = (0..50).map(|i| start() + Duration::hours(i)).collect();
    let stream = ArrayStream::new(values.clone()).with_time(times);
    let config = Config::from_value(&json!({
        "window": {"starting": "2020-01-01T10:00:00", "ending": "2020-01-01T20:00:00"},
        "streams": {"variable1": {"qartod": {"gross_range_test": {
            "suspect_span": [12, 15], "fail_span": [11, 18]
        }}}}
    }))
    .unwrap();

    let collected = collect_results(stream.run(&config)).unwrap();
    let merged = &collected.results()[0].flags;
    let direct = gross_range(
        &values[10..20],
        Span::new(11.0, 18.0),
        Some(Span::new(12.0, 15.0)),
    );

    assert_eq!(merged.len(), 50);
    assert_eq!(&merged[10..20], direct.as_slice());
    assert!(merged[..10].iter().all(|&f| f == QartodFlag::Unknown));
    assert!(merged[20..].iter().all(|&f| f == QartodFlag::Unknown));
}

#[test]
fn test_aggregation_priority_law() {
    let a = flags_from_values(&[1, 1, 1, 9, 1, 1, 9, 9]).unwrap();
    let b = flags_from_values(&[2, 1, 1, 1, 1, 1, 9, 9]).unwrap();
    let c = flags_from_values(&[1, 3, 3, 4, 3, 1, 2, 9]).unwrap();

    let combined = qartod_compare(&[&a, &b, &c]).unwrap();
    assert_eq!(codes(&combined), vec![1, 3, 3, 4, 3, 1, 2, 9]);

    let reordered = qartod_compare(&[&c, &a, &b]).unwrap();
    assert_eq!(reordered, combined);

    assert!(qartod_compare(&[&a, &c[..4]]).is_err());
}

#[test]
fn test_partial_failures_and_stored_table() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("flags.parquet");

    let stream = TableStream::new(fifty_rows()).unwrap();
    let config = Config::from_value(&json!({
        "variable1": {"qartod": {
            "gross_range_test": {"suspect_span": [20, 30], "fail_span": [10, 40]},
            "spike_test": {"suspect_threshold": 0.5, "fail_threshold": 2},
            "flat_line_test": {"suspect_threshold": 7200, "fail_threshold": 3600, "tolerance": 0.1, "bad": true}
        }},
        "missing_column": {"qartod": {"gross_range_test": {"fail_span": [0, 1]}}}
    }))
    .unwrap();

    let store = TableStore::from_results(
        stream.run(&config),
        QcSettings::default().with_rollup("rollup").with_write_data(),
    )
    .unwrap();
    assert_eq!(store.collected().failures().len(), 1);
    assert_eq!(store.collected().failures()[0].test, "flat_line_test");
    assert_eq!(store.stream_ids(), vec!["variable1", ""]);

    let df = store.save(&path, &ColumnFilter::new()).unwrap();
    let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
    assert_eq!(
        names,
        vec![
            "time",
            "variable1",
            "variable1_qartod_gross_range_test",
            "variable1_qartod_spike_test",
            "qartod_rollup"
        ]
    );

    let read = ParquetReader::new(std::fs::File::open(&path).unwrap())
        .finish()
        .unwrap();
    assert_eq!(read.shape(), (50, 5));

    let summary = summarize_flags(store.collected());
    assert_eq!(summary["variable1"].total, 100);
    assert_eq!(summary["unknown"].total, 50);
}
