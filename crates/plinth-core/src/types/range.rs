//! Version intervals with inclusive/exclusive bounds.
//!
//! Ranges are written in bracket notation, `[1.2.0,2.0.0)`, where `[`/`]`
//! are inclusive and `(`/`)` exclusive. An empty upper bound means the
//! range is open-ended.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::version::{Version, VersionError};

/// Interval over versions
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Range {
    min: Version,
    min_inclusive: bool,
    max: Version,
    max_inclusive: bool,
}

/// Range construction and parsing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("Range minimum {min} is greater than maximum {max}")]
    Inverted { min: Version, max: Version },

    #[error("Range with both bounds excluded at {version} is empty")]
    Empty { version: Version },

    #[error("Invalid range syntax: {input}")]
    InvalidSyntax { input: String },

    #[error(transparent)]
    Version(#[from] VersionError),
}

impl Range {
    /// Create a range, rejecting inverted or empty bounds.
    ///
    /// Equal bounds need at least one inclusive side.
    pub fn new(
        min: Version,
        min_inclusive: bool,
        max: Version,
        max_inclusive: bool,
    ) -> Result<Self, RangeError> {
        match min.cmp(&max) {
            Ordering::Greater => Err(RangeError::Inverted { min, max }),
            Ordering::Equal if !min_inclusive && !max_inclusive => {
                Err(RangeError::Empty { version: min })
            },
            _ => Ok(Self {
                min,
                min_inclusive,
                max,
                max_inclusive,
            }),
        }
    }

    /// `[v,v]`
    pub fn exact(version: Version) -> Self {
        Self {
            min: version.clone(),
            min_inclusive: true,
            max: version,
            max_inclusive: true,
        }
    }

    /// `[v,)`
    pub fn at_least(version: Version) -> Self {
        Self {
            min: version,
            min_inclusive: true,
            max: Version::unbounded(),
            max_inclusive: false,
        }
    }

    /// `[0.0.0,)`, accepts every concrete version
    pub fn any() -> Self {
        Self::at_least(Version::zero())
    }

    /// Lower bound. Named apart from `Ord::min`, which `Range` also has.
    pub fn lower(&self) -> &Version {
        &self.min
    }

    /// Upper bound, the unbounded sentinel when open-ended
    pub fn upper(&self) -> &Version {
        &self.max
    }

    pub fn min_inclusive(&self) -> bool {
        self.min_inclusive
    }

    pub fn max_inclusive(&self) -> bool {
        self.max_inclusive
    }

    pub fn is_exact(&self) -> bool {
        self.min == self.max
    }

    /// Position of `version` relative to this range.
    ///
    /// `Less` means the version lies below the range, `Greater` above it and
    /// `Equal` that the range contains it.
    pub fn match_version(&self, version: &Version) -> Ordering {
        match version.cmp(&self.min) {
            Ordering::Less => return Ordering::Less,
            Ordering::Equal if !self.min_inclusive => return Ordering::Less,
            _ => {},
        }
        match version.cmp(&self.max) {
            Ordering::Greater => Ordering::Greater,
            Ordering::Equal if !self.max_inclusive => Ordering::Greater,
            _ => Ordering::Equal,
        }
    }

    pub fn contains(&self, version: &Version) -> bool {
        self.match_version(version) == Ordering::Equal
    }

    /// Tightest range common to every input, or `None` if there is none
    pub fn intersect<'a, I>(ranges: I) -> Option<Range>
    where
        I: IntoIterator<Item = &'a Range>,
    {
        let mut iter = ranges.into_iter();
        let first = iter.next()?;

        let mut min = &first.min;
        let mut min_inclusive = first.min_inclusive;
        let mut max = &first.max;
        let mut max_inclusive = first.max_inclusive;

        for range in iter {
            match range.min.cmp(min) {
                Ordering::Greater => {
                    min = &range.min;
                    min_inclusive = range.min_inclusive;
                },
                Ordering::Equal => min_inclusive &= range.min_inclusive,
                Ordering::Less => {},
            }
            match range.max.cmp(max) {
                Ordering::Less => {
                    max = &range.max;
                    max_inclusive = range.max_inclusive;
                },
                Ordering::Equal => max_inclusive &= range.max_inclusive,
                Ordering::Greater => {},
            }
        }

        Range::new(min.clone(), min_inclusive, max.clone(), max_inclusive).ok()
    }

    /// Same range with a replaced upper bound
    pub fn with_max(&self, max: Version, max_inclusive: bool) -> Result<Self, RangeError> {
        Self::new(self.min.clone(), self.min_inclusive, max, max_inclusive)
    }

    /// Same range with a replaced lower bound
    pub fn with_min(&self, min: Version, min_inclusive: bool) -> Result<Self, RangeError> {
        Self::new(min, min_inclusive, self.max.clone(), self.max_inclusive)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let open = if self.min_inclusive { '[' } else { '(' };
        let close = if self.max_inclusive { ']' } else { ')' };
        if self.max.is_unbounded() {
            write!(f, "{}{},{}", open, self.min, close)
        } else {
            write!(f, "{}{},{}{}", open, self.min, self.max, close)
        }
    }
}

impl FromStr for Range {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let syntax = || RangeError::InvalidSyntax {
            input: input.to_string(),
        };

        let mut chars = input.chars();
        let min_inclusive = match chars.next() {
            Some('[') => true,
            Some('(') => false,
            _ => return Err(syntax()),
        };
        let max_inclusive = match chars.next_back() {
            Some(']') => true,
            Some(')') => false,
            _ => return Err(syntax()),
        };

        let (low, high) = chars.as_str().split_once(',').ok_or_else(syntax)?;
        let min: Version = low.trim().parse()?;
        let high = high.trim();
        let max = if high.is_empty() {
            Version::unbounded()
        } else {
            high.parse()?
        };

        Range::new(min, min_inclusive, max, max_inclusive)
    }
}

impl Serialize for Range {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Range {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_version() -> impl Strategy<Value = Version> {
        (0u64..20, 0u64..20, 0u64..20, "[0-9]{0,3}")
            .prop_map(|(major, minor, micro, q)| Version::with_qualifier(major, minor, micro, q))
    }

    fn arb_range() -> impl Strategy<Value = Range> {
        (arb_version(), any::<bool>(), arb_version(), any::<bool>(), any::<bool>()).prop_filter_map(
            "valid range",
            |(a, a_inc, b, b_inc, open)| {
                let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                let hi = if open { Version::unbounded() } else { hi };
                Range::new(lo, a_inc, hi, b_inc).ok()
            },
        )
    }

    proptest! {
        #[test]
        fn range_round_trip(range in arb_range()) {
            let parsed: Range = range.to_string().parse().unwrap();
            prop_assert_eq!(parsed, range);
        }

        #[test]
        fn intersection_is_contained_in_inputs(a in arb_range(), b in arb_range(), probe in arb_version()) {
            if let Some(both) = Range::intersect(&[a.clone(), b.clone()]) {
                if both.contains(&probe) {
                    prop_assert!(a.contains(&probe));
                    prop_assert!(b.contains(&probe));
                }
            } else {
                prop_assert!(!(a.contains(&probe) && b.contains(&probe)));
            }
        }
    }
}
