//! OSGi-style version type with rkyv support.
//!
//! Versions have the form `major.minor.micro[.qualifier]`. Missing numeric
//! components default to zero, and the qualifier is compared as a plain
//! string so build stamps such as `001` < `002` order naturally.

use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Deserializer, Serialize as SerdeSerialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Feature or plugin version (major.minor.micro.qualifier)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Archive, Deserialize, Serialize)]
#[archive(check_bytes)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub micro: u64,
    pub qualifier: String,
    unbounded: bool,
}

/// Version parsing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid version format: {input}")]
    InvalidFormat { input: String },

    #[error("Invalid number in version: {component}")]
    InvalidNumber { component: String },

    #[error("Invalid qualifier: {qualifier}")]
    InvalidQualifier { qualifier: String },
}

impl Version {
    /// Create a new version without a qualifier
    pub fn new(major: u64, minor: u64, micro: u64) -> Self {
        Self {
            major,
            minor,
            micro,
            qualifier: String::new(),
            unbounded: false,
        }
    }

    /// Create a version carrying a build qualifier
    pub fn with_qualifier(major: u64, minor: u64, micro: u64, qualifier: impl Into<String>) -> Self {
        Self {
            qualifier: qualifier.into(),
            ..Self::new(major, minor, micro)
        }
    }

    /// Sentinel that sorts above every concrete version
    pub fn unbounded() -> Self {
        Self {
            unbounded: true,
            ..Self::new(0, 0, 0)
        }
    }

    /// Lowest representable version (`0.0.0`)
    pub fn zero() -> Self {
        Self::new(0, 0, 0)
    }

    pub fn is_unbounded(&self) -> bool {
        self.unbounded
    }

    /// Smallest version of the next micro release (`1.2.3.q` -> `1.2.4`).
    ///
    /// A saturated component carries into the next release up, and past
    /// the largest major the result is unbounded.
    pub fn next_patch(&self) -> Self {
        if self.unbounded {
            return self.clone();
        }
        match self.micro.checked_add(1) {
            Some(micro) => Self::new(self.major, self.minor, micro),
            None => self.next_minor(),
        }
    }

    /// Smallest version of the next minor release (`1.2.3.q` -> `1.3.0`)
    pub fn next_minor(&self) -> Self {
        if self.unbounded {
            return self.clone();
        }
        match self.minor.checked_add(1) {
            Some(minor) => Self::new(self.major, minor, 0),
            None => self.next_major(),
        }
    }

    /// Smallest version of the next major release (`1.2.3.q` -> `2.0.0`)
    pub fn next_major(&self) -> Self {
        if self.unbounded {
            return self.clone();
        }
        match self.major.checked_add(1) {
            Some(major) => Self::new(major, 0, 0),
            None => Self::unbounded(),
        }
    }

    /// True when both versions belong to the same three-part release
    pub fn same_release(&self, other: &Self) -> bool {
        !self.unbounded
            && !other.unbounded
            && (self.major, self.minor, self.micro) == (other.major, other.minor, other.micro)
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if input == "*" {
            return Ok(Version::unbounded());
        }
        if input.is_empty() {
            return Err(VersionError::InvalidFormat {
                input: input.to_string(),
            });
        }

        // Everything after the third dot belongs to the qualifier
        let mut parts = input.splitn(4, '.');
        let mut numbers = [0u64; 3];
        for slot in numbers.iter_mut() {
            match parts.next() {
                Some(component) => {
                    *slot = component.parse().map_err(|_| VersionError::InvalidNumber {
                        component: component.to_string(),
                    })?;
                },
                None => break,
            }
        }

        let qualifier = parts.next().unwrap_or_default().to_string();
        if !qualifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(VersionError::InvalidQualifier { qualifier });
        }

        Ok(Version::with_qualifier(numbers[0], numbers[1], numbers[2], qualifier))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unbounded {
            return f.write_str("*");
        }

        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;
        if !self.qualifier.is_empty() {
            write!(f, ".{}", self.qualifier)?;
        }
        Ok(())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.unbounded, other.unbounded) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => (self.major, self.minor, self.micro, &self.qualifier).cmp(&(
                other.major,
                other.minor,
                other.micro,
                &other.qualifier,
            )),
        }
    }
}

impl SerdeSerialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> SerdeDeserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = <String as SerdeDeserialize>::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn version_round_trip(
            major in 0u64..1000,
            minor in 0u64..1000,
            micro in 0u64..1000,
            qualifier in "[a-zA-Z0-9_-]{0,12}",
        ) {
            let original = Version::with_qualifier(major, minor, micro, qualifier);
            let parsed = Version::from_str(&original.to_string()).unwrap();
            prop_assert_eq!(parsed, original);
        }

        #[test]
        fn next_patch_is_strictly_greater(
            major in 0u64..100,
            minor in 0u64..100,
            micro in 0u64..100,
            qualifier in "[a-z0-9]{0,6}",
        ) {
            let v = Version::with_qualifier(major, minor, micro, qualifier);
            prop_assert!(v.next_patch() > v);
            prop_assert!(v.next_minor() >= v.next_patch());
            prop_assert!(v.next_major() >= v.next_minor());
        }
    }
}
