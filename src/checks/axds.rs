//! Axiom Data Science tests.

use super::{mark_missing, parse_params};
use crate::error::Result;
use crate::flags::QartodFlag;
use crate::registry::{Params, TestInputs};
use serde::Deserialize;

const VALID_RANGE: &str = "axds.valid_range_test";

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ValidRangeParams {
    valid_span: (Option<f64>, Option<f64>),
    #[serde(default = "default_true")]
    start_inclusive: bool,
    #[serde(default)]
    end_inclusive: bool,
}

/// Open or closed bounds for [`valid_range`]; `None` leaves that side unbounded
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidSpan {
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub start_inclusive: bool,
    pub end_inclusive: bool,
}

impl ValidSpan {
    fn rejects(&self, x: f64) -> bool {
        let below = self.start.is_some_and(|start| {
            if self.start_inclusive {
                x < start
            } else {
                x <= start
            }
        });
        let above = self.end.is_some_and(|end| {
            if self.end_inclusive {
                x > end
            } else {
                x >= end
            }
        });
        below || above
    }
}

/// FAIL outside the valid span, GOOD inside
pub fn valid_range(inp: &[f64], span: ValidSpan) -> Vec<QartodFlag> {
    let mut flags: Vec<QartodFlag> = inp
        .iter()
        .map(|&x| {
            if span.rejects(x) {
                QartodFlag::Fail
            } else {
                QartodFlag::Good
            }
        })
        .collect();
    mark_missing(&mut flags, inp);
    flags
}

pub fn valid_range_test(inputs: &TestInputs<'_>, params: &Params) -> Result<Vec<QartodFlag>> {
    let inp = inputs.require_inp(VALID_RANGE)?;
    let p: ValidRangeParams = parse_params(VALID_RANGE, params)?;
    let span = ValidSpan {
        start: p.valid_span.0.filter(|v| !v.is_nan()),
        end: p.valid_span.1.filter(|v| !v.is_nan()),
        start_inclusive: p.start_inclusive,
        end_inclusive: p.end_inclusive,
    };
    Ok(valid_range(inp, span))
}
