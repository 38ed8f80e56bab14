//! QARTOD kernel tests

use super::{flags, params, regular_times};
use crate::checks::Span;
use crate::checks::qartod::*;
use crate::error::QcError;
use crate::flags::QartodFlag;
use crate::registry::{TestInputs, lookup};
use crate::utils::parse_timestamp;
use serde_json::json;

#[test]
fn test_compare_priority() {
    let a = flags(&[1, 1, 1, 9, 1, 1, 9, 9]);
    let b = flags(&[2, 1, 1, 1, 1, 1, 9, 9]);
    let c = flags(&[1, 3, 3, 4, 3, 1, 2, 9]);

    let result = qartod_compare(&[&a, &b, &c]).unwrap();
    assert_eq!(result, flags(&[1, 3, 3, 4, 3, 1, 2, 9]));

    // Order independent
    let reversed = qartod_compare(&[&c, &b, &a]).unwrap();
    assert_eq!(reversed, result);
}

#[test]
fn test_compare_shape_mismatch() {
    let a = flags(&[1, 1]);
    let b = flags(&[1, 1, 1]);
    assert!(matches!(
        qartod_compare(&[&a, &b]),
        Err(QcError::ShapeMismatch {
            expected: 2,
            found: 3,
            ..
        })
    ));
    assert!(qartod_compare(&[]).unwrap().is_empty());
}

#[test]
fn test_gross_range() {
    let inp: Vec<f64> = (0..13).map(f64::from).collect();
    let result = gross_range_test(
        &TestInputs::new(&inp),
        &params(json!({"suspect_span": [1, 11], "fail_span": [0, 12]})),
    )
    .unwrap();
    assert_eq!(result, flags(&[3, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 3]));
}

#[test]
fn test_gross_range_missing_and_fail() {
    let inp = vec![-5.0, f64::NAN, 5.0, 50.0];
    let result = gross_range(&inp, Span::new(10.0, 0.0), None);
    assert_eq!(result, flags(&[4, 9, 1, 4]));
}

#[test]
fn test_gross_range_parameter_errors() {
    let inp = vec![1.0];
    let inputs = TestInputs::new(&inp);

    let outside = params(json!({"suspect_span": [-1, 11], "fail_span": [0, 12]}));
    assert!(matches!(
        gross_range_test(&inputs, &outside),
        Err(QcError::InvalidParameter { .. })
    ));

    let too_long = params(json!({"fail_span": [0, 12, 13]}));
    assert!(gross_range_test(&inputs, &too_long).is_err());

    let unknown = params(json!({"fail_span": [0, 12], "bogus": 1}));
    assert!(gross_range_test(&inputs, &unknown).is_err());

    let missing = params(json!({"suspect_span": [0, 12]}));
    assert!(gross_range_test(&inputs, &missing).is_err());
}

#[test]
fn test_location_bbox() {
    let lon = vec![-101.0, -100.0, -99.0, 0.0, 99.0, 100.0, 101.0];
    let lat = vec![-41.0, -40.0, -39.0, 0.0, 39.0, 40.0, 41.0];
    let inputs = TestInputs::default().with_lon(&lon).with_lat(&lat);

    let result = location_test(&inputs, &params(json!({"bbox": [-100, -40, 100, 40]}))).unwrap();
    assert_eq!(result, flags(&[4, 1, 1, 1, 1, 1, 4]));
}

#[test]
fn test_location_missing_and_range() {
    let lon = vec![f64::NAN, 0.0, f64::NAN];
    let lat = vec![f64::NAN, f64::NAN, 0.0];
    assert_eq!(
        location(&lon, &lat, BoundingBox::default(), None),
        flags(&[9, 4, 4])
    );

    let lon = vec![0.0, 0.001, 1.0];
    let lat = vec![0.0, 0.0, 0.0];
    assert_eq!(
        location(&lon, &lat, BoundingBox::default(), Some(1000.0)),
        flags(&[1, 1, 3])
    );

    let inputs = TestInputs::default().with_lon(&lon);
    assert!(matches!(
        location_test(&inputs, &params(json!({}))),
        Err(QcError::MissingInput { .. })
    ));
    let bad_bbox = TestInputs::default().with_lon(&lon).with_lat(&lat);
    assert!(location_test(&bad_bbox, &params(json!({"bbox": [0, 1]}))).is_err());
}

#[test]
fn test_spike_average() {
    let inp = vec![-1.0, 0.0, 1.0, 2.0, 10.0, 3.0];
    let result = spike_test(
        &TestInputs::new(&inp),
        &params(json!({"suspect_threshold": 3, "fail_threshold": 10})),
    )
    .unwrap();
    assert_eq!(result, flags(&[2, 1, 1, 3, 3, 2]));
}

#[test]
fn test_spike_missing_neighbours() {
    let inp = vec![1.0, 2.0, f64::NAN, 4.0, 5.0];
    let result = spike(&inp, Some(1.0), Some(2.0), SpikeMethod::Average);
    assert_eq!(result, flags(&[2, 2, 9, 2, 2]));
}

#[test]
fn test_spike_differential() {
    let inp = vec![0.0, 0.0, 10.0, 0.0, 0.0];
    let result = spike(&inp, Some(3.0), Some(8.0), SpikeMethod::Differential);
    assert_eq!(result, flags(&[2, 1, 4, 1, 2]));

    // Zero thresholds are not applied
    let result = spike(&inp, Some(0.0), None, SpikeMethod::Average);
    assert_eq!(result, flags(&[2, 1, 1, 1, 2]));

    assert!(spike(&[], Some(1.0), None, SpikeMethod::Average).is_empty());
    assert_eq!(spike(&[1.0], Some(1.0), None, SpikeMethod::Average), flags(&[2]));
}

#[test]
fn test_spike_unknown_method() {
    let inp = vec![1.0, 2.0, 3.0];
    let result = spike_test(
        &TestInputs::new(&inp),
        &params(json!({"suspect_threshold": 1, "method": "median"})),
    );
    assert!(matches!(result, Err(QcError::InvalidParameter { .. })));
}

#[test]
fn test_rate_of_change() {
    let times = regular_times(5, 60);
    let inp = vec![0.0, 1.0, 2.0, 100.0, f64::NAN];
    let result = rate_of_change_test(
        &TestInputs::new(&inp).with_tinp(&times),
        &params(json!({"threshold": 0.5})),
    )
    .unwrap();
    assert_eq!(result, flags(&[1, 1, 1, 3, 9]));
}

#[test]
fn test_rate_of_change_needs_time() {
    let inp = vec![0.0, 1.0];
    let result = rate_of_change_test(&TestInputs::new(&inp), &params(json!({"threshold": 0.5})));
    assert!(matches!(result, Err(QcError::MissingInput { .. })));
}

#[test]
fn test_flat_line() {
    let times = regular_times(8, 1);
    let inp = vec![1.0, 2.0, 3.0, 3.0, 3.0, 3.0, 3.0, 4.0];
    let result = flat_line_test(
        &TestInputs::new(&inp).with_tinp(&times),
        &params(json!({"suspect_threshold": 2, "fail_threshold": 4, "tolerance": 0.1})),
    )
    .unwrap();
    assert_eq!(result, flags(&[1, 1, 1, 1, 3, 3, 4, 1]));
}

#[test]
fn test_flat_line_short_and_invalid() {
    let times = regular_times(2, 1);
    let result = flat_line(&[f64::NAN, 1.0], &times, 2.0, 4.0, 0.1).unwrap();
    assert_eq!(result, flags(&[9, 1]));

    let same = vec![times[0]; 4];
    assert!(flat_line(&[1.0, 1.0, 1.0, 1.0], &same, 2.0, 4.0, 0.1).is_err());
}

#[test]
fn test_attenuated_signal_whole_series() {
    let flat = vec![1.0, 1.0, 1.0, 1.0];
    assert_eq!(
        attenuated_signal(&flat, None, 8.0, 0.1, CheckType::Std, None).unwrap(),
        flags(&[4, 4, 4, 4])
    );

    let wave = vec![0.0, 10.0, 0.0, 10.0, f64::NAN];
    assert_eq!(
        attenuated_signal(&wave, None, 8.0, 2.0, CheckType::Std, None).unwrap(),
        flags(&[3, 3, 3, 3, 9])
    );
    assert_eq!(
        attenuated_signal(&wave, None, 8.0, 2.0, CheckType::Range, None).unwrap(),
        flags(&[1, 1, 1, 1, 9])
    );
}

#[test]
fn test_attenuated_signal_rolling() {
    let times = regular_times(6, 1);
    let inp = vec![0.0, 0.0, 0.0, 5.0, 0.0, 5.0];
    let result = attenuated_signal_test(
        &TestInputs::new(&inp).with_tinp(&times),
        &params(json!({"suspect_threshold": 1, "fail_threshold": 0.1, "test_period": 3})),
    )
    .unwrap();
    assert_eq!(result, flags(&[2, 4, 4, 1, 1, 1]));
}

#[test]
fn test_attenuated_signal_parameter_errors() {
    let times = regular_times(3, 1);
    let inp = vec![0.0, 1.0, 2.0];
    let inputs = TestInputs::new(&inp).with_tinp(&times);

    let both = params(json!({
        "suspect_threshold": 1, "fail_threshold": 0.1,
        "test_period": 3, "min_obs": 2, "min_period": 2
    }));
    assert!(attenuated_signal_test(&inputs, &both).is_err());

    let bad_type = params(json!({"suspect_threshold": 1, "fail_threshold": 0.1, "check_type": "mean"}));
    assert!(attenuated_signal_test(&inputs, &bad_type).is_err());
}

#[test]
fn test_attenuated_signal_period_overflow_is_an_error() {
    let times = regular_times(5, 3600);
    let inp = vec![0.0, 1.0, 2.0, 3.0, 4.0];
    let inputs = TestInputs::new(&inp).with_tinp(&times);

    for period in [1.0e13, 1.0e20] {
        let huge = params(json!({"suspect_threshold": 1, "fail_threshold": 0.1, "test_period": period}));
        assert!(matches!(
            attenuated_signal_test(&inputs, &huge),
            Err(QcError::InvalidParameter { .. })
        ));
    }
}

#[test]
fn test_climatology() {
    let tinp = vec![
        parse_timestamp("2020-01-15").unwrap(),
        parse_timestamp("2020-03-15").unwrap(),
        parse_timestamp("2020-05-15").unwrap(),
        parse_timestamp("2020-08-15").unwrap(),
        parse_timestamp("2020-09-15").unwrap(),
    ];
    let inp = vec![15.0, 25.0, 40.0, 10.0, f64::NAN];
    let config = params(json!({
        "config": [
            {"tspan": [1, 6], "vspan": [10, 20], "fspan": [0, 30], "period": "month"},
            {"tspan": ["2020-07-01", "2020-12-31"], "vspan": [5, 15]}
        ]
    }));

    let result = climatology_test(&TestInputs::new(&inp).with_tinp(&tinp), &config).unwrap();
    assert_eq!(result, flags(&[1, 3, 4, 1, 9]));
}

#[test]
fn test_climatology_depth_members() {
    let tinp = regular_times(2, 3600);
    let inp = vec![0.5, 0.5];
    let depth = vec![5.0, 20.0];
    let config = params(json!({
        "config": [{"tspan": [1, 12], "vspan": [0, 1], "zspan": [0, 10], "period": "month"}]
    }));

    let with_depth = climatology_test(
        &TestInputs::new(&inp).with_tinp(&tinp).with_zinp(&depth),
        &config,
    )
    .unwrap();
    assert_eq!(with_depth, flags(&[1, 2]));

    // No depth data: members with a zspan are skipped
    let without_depth = climatology_test(&TestInputs::new(&inp).with_tinp(&tinp), &config).unwrap();
    assert_eq!(without_depth, flags(&[2, 2]));
}

#[test]
fn test_climatology_periods() {
    let ts = parse_timestamp("2021-08-04T13:00:00").unwrap();
    assert_eq!(Period::Year.extract(&ts), 2021.0);
    assert_eq!(Period::Quarter.extract(&ts), 3.0);
    assert_eq!(Period::Month.extract(&ts), 8.0);
    assert_eq!(Period::Week.extract(&ts), 31.0);
    assert_eq!(Period::DayOfYear.extract(&ts), 216.0);
    assert_eq!(Period::DayOfWeek.extract(&ts), 2.0);
    assert_eq!(Period::Day.extract(&ts), 4.0);
    assert_eq!(Period::Hour.extract(&ts), 13.0);

    let inp = vec![1.0];
    let tinp = vec![ts];
    let unknown_period = params(json!({"config": [{"tspan": [1, 2], "vspan": [0, 1], "period": "fortnight"}]}));
    assert!(climatology_test(&TestInputs::new(&inp).with_tinp(&tinp), &unknown_period).is_err());
}

#[test]
fn test_density_inversion() {
    let inp = vec![1.0, 1.1, 1.0, 1.2];
    let z = vec![0.0, 1.0, 2.0, 3.0];
    assert_eq!(
        density_inversion(&inp, &z, Some(-0.03), Some(-0.05)),
        flags(&[1, 4, 4, 1])
    );

    let z_missing = vec![0.0, f64::NAN, 2.0, 3.0];
    assert_eq!(
        density_inversion(&inp, &z_missing, Some(-0.03), Some(-0.05)),
        flags(&[1, 9, 9, 1])
    );

    assert!(density_inversion(&[], &[], None, None).is_empty());
    assert_eq!(density_inversion(&[1.0], &[0.0], None, None), flags(&[2]));
}

#[test]
fn test_density_inversion_shape_mismatch() {
    let inp = vec![1.0, 1.1];
    let z = vec![0.0];
    let result = density_inversion_test(
        &TestInputs::new(&inp).with_zinp(&z),
        &params(json!({"suspect_threshold": -0.03})),
    );
    assert!(matches!(result, Err(QcError::ShapeMismatch { .. })));
}

#[test]
fn test_registry_dispatch_filters_inputs() {
    let inp = vec![5.0, 50.0];
    let lat = vec![0.0, 0.0];
    let def = lookup("qartod", "gross_range_test").unwrap();

    // Extra runtime inputs are dropped before the kernel sees them
    let inputs = TestInputs::new(&inp).with_lat(&lat).with_lon(&lat);
    let result = def.run(&inputs, &params(json!({"fail_span": [0, 10]}))).unwrap();
    assert_eq!(result, vec![QartodFlag::Good, QartodFlag::Fail]);
}
