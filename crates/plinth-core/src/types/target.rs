//! Concrete (identifier, version) pairs.

use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};
use std::fmt;
use std::str::FromStr;

use super::version::{Version, VersionError};

/// One concrete release of a feature or plugin
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Archive,
    Deserialize,
    Serialize,
    SerdeDeserialize,
    SerdeSerialize,
)]
#[archive(check_bytes)]
pub struct Target {
    pub id: String,
    pub version: Version,
}

impl Target {
    pub fn new(id: impl Into<String>, version: Version) -> Self {
        Self {
            id: id.into(),
            version,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.version)
    }
}

/// Parses `id version`
impl FromStr for Target {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let (id, version) = input
            .split_once(char::is_whitespace)
            .ok_or_else(|| VersionError::InvalidFormat {
                input: input.to_string(),
            })?;
        Ok(Target::new(id, version.trim().parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_by_id_then_version() {
        let mut targets = vec![
            Target::new("foo", Version::new(1, 0, 0)),
            Target::new("bar", Version::new(2, 0, 0)),
            Target::new("bar", Version::new(1, 0, 0)),
        ];
        targets.sort();
        let rendered: Vec<String> = targets.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["bar 1.0.0", "bar 2.0.0", "foo 1.0.0"]);
    }

    #[test]
    fn test_parse() {
        let target: Target = "org.example.core 1.2.3.004".parse().unwrap();
        assert_eq!(target.id, "org.example.core");
        assert_eq!(target.version, Version::with_qualifier(1, 2, 3, "004"));
        assert!("lonely".parse::<Target>().is_err());
    }

    #[test]
    fn test_equality_needs_both_fields() {
        let a = Target::new("a", Version::new(1, 0, 0));
        assert_eq!(a, Target::new("a", Version::new(1, 0, 0)));
        assert_ne!(a, Target::new("a", Version::new(1, 0, 1)));
        assert_ne!(a, Target::new("b", Version::new(1, 0, 0)));
    }
}
