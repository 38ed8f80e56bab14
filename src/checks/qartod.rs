//! Tests from the IOOS QARTOD manuals.

use super::{Span, ensure_same_len, mark_missing, parse_params};
use crate::error::{QcError, Result};
use crate::flags::QartodFlag;
use crate::registry::{Params, TestInputs};
use crate::utils::{
    Timestamp, great_circle_distance, median_interval_seconds, parse_timestamp_value,
    seconds_between,
};
use chrono::{Datelike, Duration, Timelike};
use serde::Deserialize;
use serde_json::Value;

const AGGREGATE: &str = "qartod.aggregate";
const GROSS_RANGE: &str = "qartod.gross_range_test";
const LOCATION: &str = "qartod.location_test";
const CLIMATOLOGY: &str = "qartod.climatology_test";
const SPIKE: &str = "qartod.spike_test";
const RATE_OF_CHANGE: &str = "qartod.rate_of_change_test";
const FLAT_LINE: &str = "qartod.flat_line_test";
const ATTENUATED_SIGNAL: &str = "qartod.attenuated_signal_test";
const DENSITY_INVERSION: &str = "qartod.density_inversion_test";

// =============================================================================
// Aggregate
// =============================================================================

/// Combine flag vectors position by position, keeping the highest priority flag.
///
/// Positions start at MISSING, so a position where every vector is MISSING
/// stays MISSING. All vectors must have the same length.
pub fn qartod_compare(vectors: &[&[QartodFlag]]) -> Result<Vec<QartodFlag>> {
    let Some(first) = vectors.first() else {
        return Ok(Vec::new());
    };
    let len = first.len();
    if let Some(bad) = vectors.iter().find(|v| v.len() != len) {
        return Err(QcError::shape(AGGREGATE, len, bad.len()));
    }

    let mut result = vec![QartodFlag::Missing; len];
    for vector in vectors {
        for (out, &flag) in result.iter_mut().zip(vector.iter()) {
            if flag > *out {
                *out = flag;
            }
        }
    }
    Ok(result)
}

// =============================================================================
// Gross range
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GrossRangeParams {
    fail_span: Vec<f64>,
    #[serde(default)]
    suspect_span: Option<Vec<f64>>,
}

/// FAIL outside `fail_span`, SUSPECT outside `suspect_span`, GOOD otherwise
pub fn gross_range(inp: &[f64], fail_span: Span, suspect_span: Option<Span>) -> Vec<QartodFlag> {
    let mut flags: Vec<QartodFlag> = inp
        .iter()
        .map(|&x| {
            if fail_span.excludes(x) {
                QartodFlag::Fail
            } else if suspect_span.is_some_and(|s| s.excludes(x)) {
                QartodFlag::Suspect
            } else {
                QartodFlag::Good
            }
        })
        .collect();
    mark_missing(&mut flags, inp);
    flags
}

pub fn gross_range_test(inputs: &TestInputs<'_>, params: &Params) -> Result<Vec<QartodFlag>> {
    let inp = inputs.require_inp(GROSS_RANGE)?;
    let p: GrossRangeParams = parse_params(GROSS_RANGE, params)?;

    let fail_span = Span::from_values(GROSS_RANGE, "fail_span", &p.fail_span)?;
    let suspect_span = match p.suspect_span {
        Some(values) => {
            let span = Span::from_values(GROSS_RANGE, "suspect_span", &values)?;
            if !span.within(&fail_span) {
                return Err(QcError::parameter(
                    GROSS_RANGE,
                    format!("suspect span {span:?} must fall within the fail span {fail_span:?}"),
                ));
            }
            Some(span)
        }
        None => None,
    };
    Ok(gross_range(inp, fail_span, suspect_span))
}

// =============================================================================
// Location
// =============================================================================

/// Longitude/latitude bounds as (minx, miny, maxx, maxy)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub minx: f64,
    pub miny: f64,
    pub maxx: f64,
    pub maxy: f64,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self {
            minx: -180.0,
            miny: -90.0,
            maxx: 180.0,
            maxy: 90.0,
        }
    }
}

impl BoundingBox {
    fn excludes(&self, lon: f64, lat: f64) -> bool {
        lon < self.minx || lat < self.miny || lon > self.maxx || lat > self.maxy
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LocationParams {
    #[serde(default)]
    bbox: Option<Vec<f64>>,
    #[serde(default)]
    range_max: Option<f64>,
}

/// Flag positions outside `bbox` as FAIL and jumps longer than `range_max` meters as SUSPECT
pub fn location(lon: &[f64], lat: &[f64], bbox: BoundingBox, range_max: Option<f64>) -> Vec<QartodFlag> {
    let mut flags: Vec<QartodFlag> = lon
        .iter()
        .zip(lat)
        .map(|(x, y)| match (x.is_nan(), y.is_nan()) {
            (true, true) => QartodFlag::Missing,
            (true, false) | (false, true) => QartodFlag::Fail,
            (false, false) => QartodFlag::Good,
        })
        .collect();

    if let Some(range_max) = range_max {
        if lon.len() > 1 {
            let dist = great_circle_distance(lat, lon);
            for (flag, d) in flags.iter_mut().zip(dist) {
                if d > range_max {
                    *flag = QartodFlag::Suspect;
                }
            }
        }
    }

    for (i, flag) in flags.iter_mut().enumerate() {
        if bbox.excludes(lon[i], lat[i]) {
            *flag = QartodFlag::Fail;
        }
    }
    flags
}

pub fn location_test(inputs: &TestInputs<'_>, params: &Params) -> Result<Vec<QartodFlag>> {
    let lon = inputs.require_lon(LOCATION)?;
    let lat = inputs.require_lat(LOCATION)?;
    ensure_same_len(LOCATION, lon.len(), lat.len())?;

    let p: LocationParams = parse_params(LOCATION, params)?;
    let bbox = match p.bbox.as_deref() {
        None => BoundingBox::default(),
        Some(&[minx, miny, maxx, maxy]) => BoundingBox {
            minx,
            miny,
            maxx,
            maxy,
        },
        Some(other) => {
            return Err(QcError::parameter(
                LOCATION,
                format!("bbox must have 4 values, found {}", other.len()),
            ));
        }
    };
    Ok(location(lon, lat, bbox, p.range_max))
}

// =============================================================================
// Climatology
// =============================================================================

/// Calendar component a periodic climatology span is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Year,
    Quarter,
    Month,
    #[serde(alias = "weekofyear")]
    Week,
    DayOfYear,
    DayOfWeek,
    Day,
    Hour,
}

impl Period {
    /// Value of this component for a timestamp (day of week counts from Monday = 0)
    pub fn extract(self, ts: &Timestamp) -> f64 {
        let value = match self {
            Period::Year => ts.year() as u32,
            Period::Quarter => ts.month0() / 3 + 1,
            Period::Month => ts.month(),
            Period::Week => ts.iso_week().week(),
            Period::DayOfYear => ts.ordinal(),
            Period::DayOfWeek => ts.weekday().num_days_from_monday(),
            Period::Day => ts.day(),
            Period::Hour => ts.hour(),
        };
        value as f64
    }
}

/// Time extent of a climatology member
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeSpan {
    Absolute(Timestamp, Timestamp),
    Periodic(Period, Span),
}

impl TimeSpan {
    fn contains(&self, ts: &Timestamp) -> bool {
        match self {
            TimeSpan::Absolute(start, end) => ts >= start && ts <= end,
            TimeSpan::Periodic(period, span) => span.contains(period.extract(ts)),
        }
    }
}

/// One climatology window
#[derive(Debug, Clone, PartialEq)]
pub struct ClimatologyMember {
    pub tspan: TimeSpan,
    pub vspan: Span,
    pub fspan: Option<Span>,
    pub zspan: Option<Span>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ClimatologyMemberDecl {
    tspan: Vec<Value>,
    vspan: Vec<f64>,
    #[serde(default)]
    fspan: Option<Vec<f64>>,
    #[serde(default)]
    zspan: Option<Vec<f64>>,
    #[serde(default)]
    period: Option<Period>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ClimatologyParams {
    config: Vec<ClimatologyMemberDecl>,
}

impl ClimatologyMemberDecl {
    fn into_member(self) -> Result<ClimatologyMember> {
        if self.tspan.len() != 2 {
            return Err(QcError::parameter(
                CLIMATOLOGY,
                format!("tspan must have 2 values, found {}", self.tspan.len()),
            ));
        }
        let tspan = match self.period {
            Some(period) => {
                let bounds = self
                    .tspan
                    .iter()
                    .map(|v| {
                        v.as_f64().ok_or_else(|| {
                            QcError::parameter(CLIMATOLOGY, format!("periodic tspan bound {v} is not numeric"))
                        })
                    })
                    .collect::<Result<Vec<f64>>>()?;
                TimeSpan::Periodic(period, Span::new(bounds[0], bounds[1]))
            }
            None => {
                let mut bounds = self
                    .tspan
                    .iter()
                    .map(|v| {
                        parse_timestamp_value(v)?.ok_or_else(|| {
                            QcError::parameter(CLIMATOLOGY, "tspan bounds cannot be null")
                        })
                    })
                    .collect::<Result<Vec<Timestamp>>>()?;
                bounds.sort();
                TimeSpan::Absolute(bounds[0], bounds[1])
            }
        };

        let fspan = self
            .fspan
            .map(|v| Span::from_values(CLIMATOLOGY, "fspan", &v))
            .transpose()?;
        let zspan = self
            .zspan
            .map(|v| Span::from_values(CLIMATOLOGY, "zspan", &v))
            .transpose()?;

        Ok(ClimatologyMember {
            tspan,
            vspan: Span::from_values(CLIMATOLOGY, "vspan", &self.vspan)?,
            fspan,
            zspan,
        })
    }
}

/// Flag values against the climatology member covering their time (and depth).
///
/// Positions covered by no member stay UNKNOWN. Members are applied in
/// order, so a later member overrides an earlier one where they overlap.
/// Members with a `zspan` are skipped when there is no valid depth data.
pub fn climatology(
    members: &[ClimatologyMember],
    inp: &[f64],
    tinp: &[Timestamp],
    zinp: Option<&[f64]>,
) -> Vec<QartodFlag> {
    let mut flags = vec![QartodFlag::Unknown; inp.len()];
    let has_depth = zinp.is_some_and(|z| z.iter().any(|v| !v.is_nan()));

    for member in members {
        if member.zspan.is_some() && !has_depth {
            continue;
        }
        for (i, flag) in flags.iter_mut().enumerate() {
            let x = inp[i];
            if x.is_nan() || !member.tspan.contains(&tinp[i]) {
                continue;
            }
            if let (Some(zspan), Some(z)) = (member.zspan, zinp) {
                if z[i].is_nan() || !zspan.contains(z[i]) {
                    continue;
                }
            }

            *flag = if member.fspan.is_some_and(|f| f.excludes(x)) {
                QartodFlag::Fail
            } else if member.vspan.excludes(x) {
                QartodFlag::Suspect
            } else {
                QartodFlag::Good
            };
        }
    }

    mark_missing(&mut flags, inp);
    flags
}

pub fn climatology_test(inputs: &TestInputs<'_>, params: &Params) -> Result<Vec<QartodFlag>> {
    let inp = inputs.require_inp(CLIMATOLOGY)?;
    let tinp = inputs.require_tinp(CLIMATOLOGY)?;
    ensure_same_len(CLIMATOLOGY, inp.len(), tinp.len())?;
    if let Some(z) = inputs.zinp {
        ensure_same_len(CLIMATOLOGY, inp.len(), z.len())?;
    }

    let p: ClimatologyParams = parse_params(CLIMATOLOGY, params)?;
    let members = p
        .config
        .into_iter()
        .map(ClimatologyMemberDecl::into_member)
        .collect::<Result<Vec<_>>>()?;
    Ok(climatology(&members, inp, tinp, inputs.zinp))
}

// =============================================================================
// Spike
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpikeMethod {
    /// Distance of a point from the mean of its neighbours
    #[default]
    Average,
    /// Smallest step to a neighbour, only where the steps change direction
    Differential,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SpikeParams {
    #[serde(default)]
    suspect_threshold: Option<f64>,
    #[serde(default)]
    fail_threshold: Option<f64>,
    #[serde(default)]
    method: SpikeMethod,
}

/// NaN when either operand is NaN, unlike `f64::min`
fn nan_min(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.min(b)
    }
}

/// Flag spikes against their neighbours. The first and last points are UNKNOWN.
///
/// A threshold of `None` or zero is not applied.
pub fn spike(
    inp: &[f64],
    suspect_threshold: Option<f64>,
    fail_threshold: Option<f64>,
    method: SpikeMethod,
) -> Vec<QartodFlag> {
    let n = inp.len();
    if n == 0 {
        return Vec::new();
    }

    let mut diff = vec![0.0; n];
    for i in 1..n.saturating_sub(1) {
        diff[i] = match method {
            SpikeMethod::Average => {
                let reference = (inp[i - 1] + inp[i + 1]) / 2.0;
                (inp[i] - reference).abs()
            }
            SpikeMethod::Differential => {
                let before = inp[i] - inp[i - 1];
                let after = inp[i + 1] - inp[i];
                if before * after >= 0.0 {
                    0.0
                } else {
                    nan_min(before.abs(), after.abs())
                }
            }
        };
    }

    let mut flags = vec![QartodFlag::Good; n];
    let active = |t: Option<f64>| t.filter(|t| *t != 0.0);
    if let Some(threshold) = active(suspect_threshold) {
        for (flag, d) in flags.iter_mut().zip(&diff) {
            if *d > threshold {
                *flag = QartodFlag::Suspect;
            }
        }
    }
    if let Some(threshold) = active(fail_threshold) {
        for (flag, d) in flags.iter_mut().zip(&diff) {
            if *d > threshold {
                *flag = QartodFlag::Fail;
            }
        }
    }

    flags[0] = QartodFlag::Unknown;
    flags[n - 1] = QartodFlag::Unknown;

    for i in 0..n {
        if inp[i].is_nan() {
            flags[i] = QartodFlag::Missing;
        } else if diff[i].is_nan() {
            flags[i] = QartodFlag::Unknown;
        }
    }
    flags
}

pub fn spike_test(inputs: &TestInputs<'_>, params: &Params) -> Result<Vec<QartodFlag>> {
    let inp = inputs.require_inp(SPIKE)?;
    let p: SpikeParams = parse_params(SPIKE, params)?;
    Ok(spike(inp, p.suspect_threshold, p.fail_threshold, p.method))
}

// =============================================================================
// Rate of change
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RateOfChangeParams {
    threshold: f64,
}

/// SUSPECT where the absolute rate of change from the previous point exceeds
/// `threshold` units per second
pub fn rate_of_change(inp: &[f64], tinp: &[Timestamp], threshold: f64) -> Vec<QartodFlag> {
    let mut flags = vec![QartodFlag::Good; inp.len()];
    for i in 1..inp.len() {
        let seconds = seconds_between(&tinp[i - 1], &tinp[i]);
        let rate = ((inp[i] - inp[i - 1]) / seconds).abs();
        if rate > threshold {
            flags[i] = QartodFlag::Suspect;
        }
    }
    mark_missing(&mut flags, inp);
    flags
}

pub fn rate_of_change_test(inputs: &TestInputs<'_>, params: &Params) -> Result<Vec<QartodFlag>> {
    let inp = inputs.require_inp(RATE_OF_CHANGE)?;
    let tinp = inputs.require_tinp(RATE_OF_CHANGE)?;
    ensure_same_len(RATE_OF_CHANGE, inp.len(), tinp.len())?;
    let p: RateOfChangeParams = parse_params(RATE_OF_CHANGE, params)?;
    Ok(rate_of_change(inp, tinp, p.threshold))
}

// =============================================================================
// Flat line
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FlatLineParams {
    suspect_threshold: f64,
    fail_threshold: f64,
    #[serde(default)]
    tolerance: f64,
}

/// Flag runs of near-identical values.
///
/// A threshold in seconds becomes a window of `threshold / median interval`
/// observations ending at each point. A point is flagged when the range of
/// the valid values in its window is below `tolerance`. Series shorter than
/// three points are GOOD.
pub fn flat_line(
    inp: &[f64],
    tinp: &[Timestamp],
    suspect_threshold: f64,
    fail_threshold: f64,
    tolerance: f64,
) -> Result<Vec<QartodFlag>> {
    let n = inp.len();
    let mut flags = vec![QartodFlag::Good; n];
    if n < 3 {
        mark_missing(&mut flags, inp);
        return Ok(flags);
    }

    let interval = median_interval_seconds(tinp).unwrap_or(0.0);
    if interval <= 0.0 {
        return Err(QcError::parameter(
            FLAT_LINE,
            format!("median time interval must be positive, found {interval}s"),
        ));
    }

    for (threshold, flag) in [
        (suspect_threshold, QartodFlag::Suspect),
        (fail_threshold, QartodFlag::Fail),
    ] {
        let count = (threshold.trunc() / interval).trunc() as usize;
        for i in count..n {
            let (lo, hi) = inp[i - count..=i]
                .iter()
                .filter(|v| !v.is_nan())
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                    (lo.min(v), hi.max(v))
                });
            if lo <= hi && (hi - lo).abs() < tolerance {
                flags[i] = flag;
            }
        }
    }

    mark_missing(&mut flags, inp);
    Ok(flags)
}

pub fn flat_line_test(inputs: &TestInputs<'_>, params: &Params) -> Result<Vec<QartodFlag>> {
    let inp = inputs.require_inp(FLAT_LINE)?;
    let tinp = inputs.require_tinp(FLAT_LINE)?;
    ensure_same_len(FLAT_LINE, inp.len(), tinp.len())?;
    let p: FlatLineParams = parse_params(FLAT_LINE, params)?;
    flat_line(inp, tinp, p.suspect_threshold, p.fail_threshold, p.tolerance)
}

// =============================================================================
// Attenuated signal
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckType {
    #[default]
    Std,
    Range,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AttenuatedSignalParams {
    suspect_threshold: f64,
    fail_threshold: f64,
    #[serde(default)]
    test_period: Option<f64>,
    #[serde(default)]
    min_obs: Option<usize>,
    #[serde(default)]
    min_period: Option<f64>,
    #[serde(default)]
    check_type: CheckType,
}

/// Optional rolling window for the attenuated signal test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollingWindow {
    /// Window length in seconds, covering `(t - period, t]`
    pub period: f64,
    /// Valid observations needed before a window yields a value
    pub min_obs: usize,
}

fn std_dev(values: &[f64], ddof: usize) -> f64 {
    if values.len() <= ddof {
        return f64::NAN;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (ss / (values.len() - ddof) as f64).sqrt()
}

fn value_range(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    hi - lo
}

/// Flag signals whose variability (std or range) is too low.
///
/// Without a window the whole series is summarized once (population std).
/// With a window each point is summarized over the preceding `period`
/// seconds (sample std); windows without enough observations are UNKNOWN.
pub fn attenuated_signal(
    inp: &[f64],
    tinp: Option<&[Timestamp]>,
    suspect_threshold: f64,
    fail_threshold: f64,
    check_type: CheckType,
    window: Option<RollingWindow>,
) -> Result<Vec<QartodFlag>> {
    let summarize = |values: &[f64], ddof: usize| match check_type {
        CheckType::Std => std_dev(values, ddof),
        CheckType::Range => value_range(values),
    };

    let check_values: Vec<f64> = match (window, tinp) {
        (Some(window), Some(tinp)) => {
            let period = window_duration(window.period)?;
            let cutoffs = tinp
                .iter()
                .map(|t| {
                    t.checked_sub_signed(period).ok_or_else(|| {
                        QcError::parameter(
                            ATTENUATED_SIGNAL,
                            format!("test_period {} reaches before the earliest timestamp", window.period),
                        )
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            let mut start = 0;
            (0..inp.len())
                .map(|i| {
                    while tinp[start] <= cutoffs[i] {
                        start += 1;
                    }
                    let valid: Vec<f64> = inp[start..=i]
                        .iter()
                        .copied()
                        .filter(|v| !v.is_nan())
                        .collect();
                    if valid.len() < window.min_obs.max(1) {
                        f64::NAN
                    } else {
                        summarize(&valid, 1)
                    }
                })
                .collect()
        }
        _ => {
            let valid: Vec<f64> = inp.iter().copied().filter(|v| !v.is_nan()).collect();
            vec![summarize(&valid, 0); inp.len()]
        }
    };

    let mut flags: Vec<QartodFlag> = check_values
        .iter()
        .map(|&v| {
            if v.is_nan() {
                QartodFlag::Unknown
            } else if v < fail_threshold {
                QartodFlag::Fail
            } else if v < suspect_threshold {
                QartodFlag::Suspect
            } else {
                QartodFlag::Good
            }
        })
        .collect();
    mark_missing(&mut flags, inp);
    Ok(flags)
}

fn window_duration(seconds: f64) -> Result<Duration> {
    let millis = (seconds * 1000.0).round();
    let out_of_range = || {
        QcError::parameter(ATTENUATED_SIGNAL, format!("test_period {seconds} is out of range"))
    };
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return Err(out_of_range());
    }
    Duration::try_milliseconds(millis as i64).ok_or_else(out_of_range)
}

pub fn attenuated_signal_test(inputs: &TestInputs<'_>, params: &Params) -> Result<Vec<QartodFlag>> {
    let inp = inputs.require_inp(ATTENUATED_SIGNAL)?;
    let p: AttenuatedSignalParams = parse_params(ATTENUATED_SIGNAL, params)?;
    if p.min_obs.is_some() && p.min_period.is_some() {
        return Err(QcError::parameter(
            ATTENUATED_SIGNAL,
            "specify either min_obs or min_period, not both",
        ));
    }

    let window = match p.test_period.filter(|period| *period > 0.0) {
        Some(period) => {
            let tinp = inputs.require_tinp(ATTENUATED_SIGNAL)?;
            ensure_same_len(ATTENUATED_SIGNAL, inp.len(), tinp.len())?;
            let min_obs = match (p.min_obs, p.min_period) {
                (Some(min_obs), _) => min_obs,
                (None, Some(min_period)) => {
                    let interval = median_interval_seconds(tinp).unwrap_or(0.0);
                    if interval <= 0.0 {
                        return Err(QcError::parameter(
                            ATTENUATED_SIGNAL,
                            "min_period needs a positive median time interval",
                        ));
                    }
                    (min_period / interval).trunc() as usize
                }
                (None, None) => 1,
            };
            Some(RollingWindow { period, min_obs })
        }
        None => None,
    };

    attenuated_signal(
        inp,
        inputs.tinp,
        p.suspect_threshold,
        p.fail_threshold,
        p.check_type,
        window,
    )
}

// =============================================================================
// Density inversion
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DensityInversionParams {
    #[serde(default)]
    suspect_threshold: Option<f64>,
    #[serde(default)]
    fail_threshold: Option<f64>,
}

fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        x
    }
}

/// Flag both ends of every step where density decreases with depth by more
/// than the threshold. A missing value or depth marks itself and the next
/// point MISSING.
pub fn density_inversion(
    inp: &[f64],
    zinp: &[f64],
    suspect_threshold: Option<f64>,
    fail_threshold: Option<f64>,
) -> Vec<QartodFlag> {
    let n = inp.len();
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![QartodFlag::Unknown];
    }

    let delta: Vec<f64> = (0..n - 1)
        .map(|k| sign(zinp[k + 1] - zinp[k]) * (inp[k + 1] - inp[k]))
        .collect();

    let mut flags = vec![QartodFlag::Good; n];
    for (threshold, flag) in [
        (suspect_threshold, QartodFlag::Suspect),
        (fail_threshold, QartodFlag::Fail),
    ] {
        let Some(threshold) = threshold else { continue };
        for (k, d) in delta.iter().enumerate() {
            if *d < threshold {
                flags[k] = flag;
                flags[k + 1] = flag;
            }
        }
    }

    for k in 0..n {
        if inp[k].is_nan() || zinp[k].is_nan() {
            flags[k] = QartodFlag::Missing;
            if k + 1 < n {
                flags[k + 1] = QartodFlag::Missing;
            }
        }
    }
    flags
}

pub fn density_inversion_test(inputs: &TestInputs<'_>, params: &Params) -> Result<Vec<QartodFlag>> {
    let inp = inputs.require_inp(DENSITY_INVERSION)?;
    let zinp = inputs.require_zinp(DENSITY_INVERSION)?;
    ensure_same_len(DENSITY_INVERSION, inp.len(), zinp.len())?;
    let p: DensityInversionParams = parse_params(DENSITY_INVERSION, params)?;
    Ok(density_inversion(inp, zinp, p.suspect_threshold, p.fail_threshold))
}
