use crate::errors::{RangeError, RangeKind};
use serde::Serialize;

/// Numeric comparison used by most matches.
///
/// Written as `a-b` (inclusive), `<n`, `>n` or a bare `n`.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize)]
pub enum NumericRange {
    Between { lower: u64, upper: u64 },
    Less(u64),
    Greater(u64),
    Equal(u64),
}

impl NumericRange {
    /// Fails for a `Between` range with `lower > upper`.
    pub fn check(&self, kind: RangeKind) -> Result<(), RangeError> {
        match *self {
            NumericRange::Between { lower, upper } if lower > upper => Err(RangeError {
                kind,
                lower,
                upper,
            }),
            _ => Ok(()),
        }
    }

    /// Membership test without validation; an inverted range is empty.
    pub fn includes(&self, value: u64) -> bool {
        match *self {
            NumericRange::Between { lower, upper } => lower <= value && value <= upper,
            NumericRange::Less(n) => value < n,
            NumericRange::Greater(n) => value > n,
            NumericRange::Equal(n) => value == n,
        }
    }

    pub fn contains(&self, kind: RangeKind, value: u64) -> Result<bool, RangeError> {
        self.check(kind)?;
        Ok(self.includes(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_between() {
        let range = NumericRange::Between {
            lower: 10,
            upper: 20,
        };
        assert_eq!(range.contains(RangeKind::Port, 10), Ok(true));
        assert_eq!(range.contains(RangeKind::Port, 20), Ok(true));
        assert_eq!(range.contains(RangeKind::Port, 21), Ok(false));

        let single = NumericRange::Between {
            lower: 1024,
            upper: 1024,
        };
        assert_eq!(single.contains(RangeKind::Port, 1024), Ok(true));
    }

    #[test]
    fn test_inverted() {
        let range = NumericRange::Between {
            lower: 1024,
            upper: 10,
        };
        assert_eq!(
            range.contains(RangeKind::Port, 100),
            Err(RangeError {
                kind: RangeKind::Port,
                lower: 1024,
                upper: 10,
            })
        );
        assert!(!range.includes(100));
    }

    #[test]
    fn test_unary() {
        assert_eq!(NumericRange::Less(1).contains(RangeKind::Port, 0), Ok(true));
        assert_eq!(NumericRange::Less(0).contains(RangeKind::Port, 0), Ok(false));
        assert_eq!(NumericRange::Greater(0).contains(RangeKind::Bps, 1), Ok(true));
        assert_eq!(NumericRange::Equal(7).contains(RangeKind::Asn, 7), Ok(true));
        assert_eq!(NumericRange::Equal(7).contains(RangeKind::Asn, 8), Ok(false));
    }

    #[test]
    fn test_serialize() {
        assert_json!(
            NumericRange::Between {
                lower: 1,
                upper: 2
            },
            {"Between": {"lower": 1, "upper": 2}}
        );
        assert_json!(NumericRange::Less(5), {"Less": 5});
    }
}
