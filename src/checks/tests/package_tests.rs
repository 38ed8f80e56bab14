//! AXDS and ARGO kernel tests

use super::{flags, params, regular_times};
use crate::checks::argo::{pressure_increasing, speed, speed_test};
use crate::checks::axds::valid_range_test;
use crate::error::QcError;
use crate::registry::TestInputs;
use serde_json::json;

#[test]
fn test_valid_range_default_bounds() {
    let inp = vec![-1.0, 0.0, 5.0, 10.0, 11.0, f64::NAN];
    let result =
        valid_range_test(&TestInputs::new(&inp), &params(json!({"valid_span": [0, 10]}))).unwrap();
    assert_eq!(result, flags(&[4, 1, 1, 4, 4, 9]));
}

#[test]
fn test_valid_range_inclusivity_and_open_ends() {
    let inp = vec![-1.0, 0.0, 10.0];
    let inputs = TestInputs::new(&inp);

    let closed = params(json!({"valid_span": [0, 10], "start_inclusive": false, "end_inclusive": true}));
    assert_eq!(valid_range_test(&inputs, &closed).unwrap(), flags(&[4, 4, 1]));

    let open_start = params(json!({"valid_span": [null, 10]}));
    assert_eq!(valid_range_test(&inputs, &open_start).unwrap(), flags(&[1, 1, 4]));

    let bad = params(json!({"valid_span": [0, 10], "dtype": "float"}));
    assert!(matches!(
        valid_range_test(&inputs, &bad),
        Err(QcError::InvalidParameter { .. })
    ));
}

#[test]
fn test_pressure_increasing() {
    assert_eq!(
        pressure_increasing(&[0.0, 1.0, 2.0, 2.0, 3.0]),
        flags(&[1, 1, 1, 3, 1])
    );

    // Upcast profile
    assert_eq!(pressure_increasing(&[3.0, 2.0, 1.0, 1.0]), flags(&[1, 1, 1, 3]));

    assert_eq!(
        pressure_increasing(&[0.0, f64::NAN, 2.0]),
        flags(&[1, 9, 1])
    );
}

#[test]
fn test_speed() {
    let times = regular_times(3, 100);
    let lon = vec![0.0, 0.001, 1.0];
    let lat = vec![0.0, 0.0, 0.0];
    assert_eq!(speed(&lon, &lat, &times, 1.0, 100.0), flags(&[2, 3, 4]));

    let lat_missing = vec![0.0, f64::NAN, 0.0];
    assert_eq!(
        speed(&lon, &lat_missing, &times, 1.0, 100.0),
        flags(&[2, 9, 9])
    );

    assert_eq!(speed(&[0.0], &[0.0], &times[..1], 1.0, 100.0), flags(&[2]));
}

#[test]
fn test_speed_shape_mismatch() {
    let times = regular_times(2, 100);
    let lon = vec![0.0, 0.001, 1.0];
    let lat = vec![0.0, 0.0, 0.0];
    let inputs = TestInputs::default()
        .with_lon(&lon)
        .with_lat(&lat)
        .with_tinp(&times);
    let result = speed_test(
        &inputs,
        &params(json!({"suspect_threshold": 1, "fail_threshold": 100})),
    );
    assert!(matches!(result, Err(QcError::ShapeMismatch { .. })));
}
