//! QARTOD flag model.
//!
//! Defines the closed set of QC outcome codes and the priority ordering used
//! when several test results are merged into one aggregate flag.

use crate::constants::flag_values;
use crate::error::{QcError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A QARTOD quality flag.
///
/// The discriminant is the wire value. `Ord` is the aggregation priority,
/// not the numeric order: `Missing < Unknown < Good < Suspect < Fail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum QartodFlag {
    Good = flag_values::GOOD,
    Unknown = flag_values::UNKNOWN,
    Suspect = flag_values::SUSPECT,
    Fail = flag_values::FAIL,
    Missing = flag_values::MISSING,
}

impl QartodFlag {
    /// Aggregation priority levels, lowest first
    pub const PRIORITY: [QartodFlag; 5] = [
        QartodFlag::Missing,
        QartodFlag::Unknown,
        QartodFlag::Good,
        QartodFlag::Suspect,
        QartodFlag::Fail,
    ];

    /// Numeric flag value
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Position in `PRIORITY`
    pub fn priority(self) -> u8 {
        match self {
            QartodFlag::Missing => 0,
            QartodFlag::Unknown => 1,
            QartodFlag::Good => 2,
            QartodFlag::Suspect => 3,
            QartodFlag::Fail => 4,
        }
    }

    /// Upper-case flag name as used in CF `flag_meanings`
    pub fn name(self) -> &'static str {
        match self {
            QartodFlag::Good => "GOOD",
            QartodFlag::Unknown => "UNKNOWN",
            QartodFlag::Suspect => "SUSPECT",
            QartodFlag::Fail => "FAIL",
            QartodFlag::Missing => "MISSING",
        }
    }
}

impl PartialOrd for QartodFlag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QartodFlag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority().cmp(&other.priority())
    }
}

impl TryFrom<u8> for QartodFlag {
    type Error = QcError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            flag_values::GOOD => Ok(QartodFlag::Good),
            flag_values::UNKNOWN => Ok(QartodFlag::Unknown),
            flag_values::SUSPECT => Ok(QartodFlag::Suspect),
            flag_values::FAIL => Ok(QartodFlag::Fail),
            flag_values::MISSING => Ok(QartodFlag::Missing),
            other => Err(QcError::InvalidFlag { value: other }),
        }
    }
}

impl From<QartodFlag> for u8 {
    fn from(flag: QartodFlag) -> Self {
        flag.value()
    }
}

impl fmt::Display for QartodFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Convert raw flag codes into typed flags
pub fn flags_from_values(values: &[u8]) -> Result<Vec<QartodFlag>> {
    values.iter().map(|&v| QartodFlag::try_from(v)).collect()
}

/// Convert typed flags into raw flag codes
pub fn flags_to_values(flags: &[QartodFlag]) -> Vec<u8> {
    flags.iter().map(|f| f.value()).collect()
}

/// Per-flag occurrence counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagCounts {
    pub good: usize,
    pub unknown: usize,
    pub suspect: usize,
    pub fail: usize,
    pub missing: usize,
    pub total: usize,
}

impl FlagCounts {
    /// Count every flag in a slice
    pub fn from_flags(flags: &[QartodFlag]) -> Self {
        let mut counts = Self::default();
        counts.add_all(flags);
        counts
    }

    pub fn add(&mut self, flag: QartodFlag) {
        match flag {
            QartodFlag::Good => self.good += 1,
            QartodFlag::Unknown => self.unknown += 1,
            QartodFlag::Suspect => self.suspect += 1,
            QartodFlag::Fail => self.fail += 1,
            QartodFlag::Missing => self.missing += 1,
        }
        self.total += 1;
    }

    pub fn add_all(&mut self, flags: &[QartodFlag]) {
        for &flag in flags {
            self.add(flag);
        }
    }

    /// Count for a single flag
    pub fn get(&self, flag: QartodFlag) -> usize {
        match flag {
            QartodFlag::Good => self.good,
            QartodFlag::Unknown => self.unknown,
            QartodFlag::Suspect => self.suspect,
            QartodFlag::Fail => self.fail,
            QartodFlag::Missing => self.missing,
        }
    }

    /// Percentage of `flag` among all counted flags
    pub fn percentage(&self, flag: QartodFlag) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.get(flag) as f64 / self.total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_ordering() {
        assert!(QartodFlag::Missing < QartodFlag::Unknown);
        assert!(QartodFlag::Unknown < QartodFlag::Good);
        assert!(QartodFlag::Good < QartodFlag::Suspect);
        assert!(QartodFlag::Suspect < QartodFlag::Fail);

        let mut sorted = vec![
            QartodFlag::Fail,
            QartodFlag::Good,
            QartodFlag::Missing,
            QartodFlag::Suspect,
            QartodFlag::Unknown,
        ];
        sorted.sort();
        assert_eq!(sorted, QartodFlag::PRIORITY.to_vec());
    }

    #[test]
    fn test_value_conversion() {
        for &value in flag_values::ALL {
            let flag = QartodFlag::try_from(value).unwrap();
            assert_eq!(u8::from(flag), value);
        }
        assert!(matches!(
            QartodFlag::try_from(0),
            Err(QcError::InvalidFlag { value: 0 })
        ));
    }

    #[test]
    fn test_serde_uses_numeric_value() {
        let json = serde_json::to_string(&vec![QartodFlag::Good, QartodFlag::Missing]).unwrap();
        assert_eq!(json, "[1,9]");

        let parsed: Vec<QartodFlag> = serde_json::from_str("[3,4]").unwrap();
        assert_eq!(parsed, vec![QartodFlag::Suspect, QartodFlag::Fail]);
        assert!(serde_json::from_str::<QartodFlag>("7").is_err());
    }

    #[test]
    fn test_flag_counts() {
        let flags = flags_from_values(&[1, 1, 3, 4, 9, 2]).unwrap();
        let counts = FlagCounts::from_flags(&flags);

        assert_eq!(counts.good, 2);
        assert_eq!(counts.suspect, 1);
        assert_eq!(counts.fail, 1);
        assert_eq!(counts.missing, 1);
        assert_eq!(counts.unknown, 1);
        assert_eq!(counts.total, 6);
        assert!((counts.percentage(QartodFlag::Good) - 33.333).abs() < 0.01);
        assert_eq!(FlagCounts::default().percentage(QartodFlag::Fail), 0.0);
    }
}
