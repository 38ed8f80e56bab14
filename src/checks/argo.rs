//! Tests from the ARGO QC manual.

use super::{ensure_same_len, mark_missing, parse_params};
use crate::error::Result;
use crate::flags::QartodFlag;
use crate::registry::{Params, TestInputs};
use crate::utils::{Timestamp, great_circle_distance, seconds_between};
use serde::Deserialize;

const PRESSURE_INCREASING: &str = "argo.pressure_increasing_test";
const SPEED: &str = "argo.speed_test";

/// SUSPECT where pressure stops increasing along the profile.
///
/// A profile whose mean step is negative is treated as an upcast, so the
/// check is for decreasing pressure instead.
pub fn pressure_increasing(inp: &[f64]) -> Vec<QartodFlag> {
    let mut flags = vec![QartodFlag::Good; inp.len()];
    let mut delta: Vec<f64> = inp.windows(2).map(|w| w[1] - w[0]).collect();

    let valid: Vec<f64> = delta.iter().copied().filter(|d| !d.is_nan()).collect();
    if !valid.is_empty() && valid.iter().sum::<f64>() / (valid.len() as f64) < 0.0 {
        delta.iter_mut().for_each(|d| *d = -*d);
    }

    for (k, d) in delta.iter().enumerate() {
        if *d <= 0.0 {
            flags[k + 1] = QartodFlag::Suspect;
        }
    }
    mark_missing(&mut flags, inp);
    flags
}

pub fn pressure_increasing_test(inputs: &TestInputs<'_>, _params: &Params) -> Result<Vec<QartodFlag>> {
    let inp = inputs.require_inp(PRESSURE_INCREASING)?;
    Ok(pressure_increasing(inp))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SpeedParams {
    suspect_threshold: f64,
    fail_threshold: f64,
}

/// Flag implausible platform speeds, in meters per second, between
/// consecutive positions. The first point is UNKNOWN; a point whose leg
/// touches a missing position is MISSING.
pub fn speed(
    lon: &[f64],
    lat: &[f64],
    tinp: &[Timestamp],
    suspect_threshold: f64,
    fail_threshold: f64,
) -> Vec<QartodFlag> {
    let n = lon.len();
    if n == 0 {
        return Vec::new();
    }

    let mut flags: Vec<QartodFlag> = lon
        .iter()
        .zip(lat)
        .map(|(x, y)| {
            if x.is_nan() || y.is_nan() {
                QartodFlag::Missing
            } else {
                QartodFlag::Good
            }
        })
        .collect();
    if n < 2 {
        flags[0] = QartodFlag::Unknown;
        return flags;
    }

    let dist = great_circle_distance(lat, lon);
    for i in 1..n {
        let speed = (dist[i] / seconds_between(&tinp[i - 1], &tinp[i])).abs();
        if speed > fail_threshold {
            flags[i] = QartodFlag::Fail;
        } else if speed > suspect_threshold {
            flags[i] = QartodFlag::Suspect;
        }
    }

    flags[0] = QartodFlag::Unknown;
    for i in 0..n {
        if dist[i].is_nan() || lon[i].is_nan() || lat[i].is_nan() {
            flags[i] = QartodFlag::Missing;
        }
    }
    flags
}

pub fn speed_test(inputs: &TestInputs<'_>, params: &Params) -> Result<Vec<QartodFlag>> {
    let lon = inputs.require_lon(SPEED)?;
    let lat = inputs.require_lat(SPEED)?;
    let tinp = inputs.require_tinp(SPEED)?;
    ensure_same_len(SPEED, lon.len(), lat.len())?;
    ensure_same_len(SPEED, lon.len(), tinp.len())?;
    let p: SpeedParams = parse_params(SPEED, params)?;
    Ok(speed(lon, lat, tinp, p.suspect_threshold, p.fail_threshold))
}
