//! Range requirements on feature and plugin identifiers.
//!
//! Every constraint remembers who asserted it ([`ConstraintSource`]) so that
//! resolution failures can be explained back through their provenance.

use std::collections::BTreeSet;
use std::fmt;

use super::range::{Range, RangeError};
use super::target::Target;
use super::version::Version;

/// Provenance of a [`TargetConstraint`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConstraintSource {
    /// Declared by a concrete feature version
    Feature(Target),
    /// Inferred from unmatched plugin requirements
    Plugins { plugin_ids: BTreeSet<String> },
    /// Narrowed source range after a conflict with a fixed feature
    Retry { fixed_id: String, stale: Target },
    /// Parsed from a constraint line
    Text { origin: String, line: usize },
    /// Ad-hoc location such as an update-site URL
    Url(String),
}

impl ConstraintSource {
    /// Feature id that asserted the constraint, if any
    pub fn source_logical_id(&self) -> Option<&str> {
        match self {
            ConstraintSource::Feature(target) => Some(&target.id),
            _ => None,
        }
    }

    /// Human-readable provenance
    pub fn source_path_string(&self) -> String {
        match self {
            ConstraintSource::Feature(target) => target.to_string(),
            ConstraintSource::Plugins { plugin_ids } => {
                let ids: Vec<&str> = plugin_ids.iter().map(String::as_str).collect();
                format!("plugins {}", ids.join(", "))
            },
            ConstraintSource::Retry { fixed_id, stale } => {
                format!("retry of {} around fixed {}", stale, fixed_id)
            },
            ConstraintSource::Text { origin, line } => format!("{}:{}", origin, line),
            ConstraintSource::Url(url) => url.clone(),
        }
    }
}

impl fmt::Display for ConstraintSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source_path_string())
    }
}

/// Required or optional range constraint on a target id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetConstraint {
    pub source: ConstraintSource,
    pub required: bool,
    pub target_id: String,
    pub range: Range,
}

impl TargetConstraint {
    /// Create a required constraint
    pub fn new(source: ConstraintSource, target_id: impl Into<String>, range: Range) -> Self {
        Self {
            source,
            required: true,
            target_id: target_id.into(),
            range,
        }
    }

    /// Mark this constraint optional
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn is_match(&self, target: &Target) -> bool {
        target.id == self.target_id && self.range.contains(&target.version)
    }

    pub fn contains(&self, version: &Version) -> bool {
        self.range.contains(version)
    }

    /// Parse a single `<id> <range>` line.
    ///
    /// A bare version in place of the range means "that version or newer".
    pub fn parse_line(line: &str, source: ConstraintSource) -> Result<Self, RangeError> {
        let input = line.trim();
        let (id, range_text) = input
            .split_once(char::is_whitespace)
            .ok_or_else(|| RangeError::InvalidSyntax {
                input: input.to_string(),
            })?;

        let range_text = range_text.trim();
        let range = if range_text.starts_with('[') || range_text.starts_with('(') {
            range_text.parse()?
        } else {
            Range::at_least(range_text.parse()?)
        };

        Ok(Self::new(source, id, range))
    }

    /// Parse a block of constraint lines, skipping blanks and `#` comments
    pub fn parse_lines(text: &str, origin: &str) -> Result<Vec<Self>, RangeError> {
        text.lines()
            .enumerate()
            .filter(|(_, line)| {
                let trimmed = line.trim();
                !trimmed.is_empty() && !trimmed.starts_with('#')
            })
            .map(|(index, line)| {
                let source = ConstraintSource::Text {
                    origin: origin.to_string(),
                    line: index + 1,
                };
                Self::parse_line(line, source)
            })
            .collect()
    }
}

impl fmt::Display for TargetConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.target_id, self.range)?;
        if !self.required {
            f.write_str(" (optional)")?;
        }
        write!(f, " from {}", self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_source() -> ConstraintSource {
        ConstraintSource::Text {
            origin: "test".to_string(),
            line: 1,
        }
    }

    #[test]
    fn test_parse_line() {
        let c = TargetConstraint::parse_line("com.example.feature [1.2.0,2.0.0)", text_source()).unwrap();
        assert_eq!(c.target_id, "com.example.feature");
        assert_eq!(c.range.to_string(), "[1.2.0,2.0.0)");
        assert!(c.required);
    }

    #[test]
    fn test_parse_line_bare_version() {
        let c = TargetConstraint::parse_line("a 1.5", text_source()).unwrap();
        assert_eq!(c.range, Range::at_least(Version::new(1, 5, 0)));
    }

    #[test]
    fn test_parse_line_rejects_garbage() {
        assert!(TargetConstraint::parse_line("no-range", text_source()).is_err());
        assert!(TargetConstraint::parse_line("a [2.0.0,1.0.0]", text_source()).is_err());
    }

    #[test]
    fn test_parse_lines_tracks_line_numbers() {
        let text = "# header\n\na [1.0.0,2.0.0)\nb (1.0.0,1.5.0]\n";
        let parsed = TargetConstraint::parse_lines(text, "extra.txt").unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].source.source_path_string(), "extra.txt:4");
        assert_eq!(parsed[1].source.source_logical_id(), None);
    }

    #[test]
    fn test_is_match() {
        let c = TargetConstraint::parse_line("a [1.0.0,2.0.0)", text_source()).unwrap();
        assert!(c.is_match(&Target::new("a", Version::new(1, 9, 0))));
        assert!(!c.is_match(&Target::new("a", Version::new(2, 0, 0))));
        assert!(!c.is_match(&Target::new("b", Version::new(1, 0, 0))));
    }

    #[test]
    fn test_feature_source_logical_id() {
        let source = ConstraintSource::Feature(Target::new("org.base", Version::new(3, 4, 0)));
        assert_eq!(source.source_logical_id(), Some("org.base"));
        assert_eq!(source.source_path_string(), "org.base 3.4.0");
    }

    #[test]
    fn test_constraints_deduplicate_in_sets() {
        let mut set = BTreeSet::new();
        let c = TargetConstraint::parse_line("a [1.0.0,2.0.0)", text_source()).unwrap();
        set.insert(c.clone());
        set.insert(c);
        assert_eq!(set.len(), 1);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn constraint_line_round_trip(
            id in "[a-z]{1,8}(\\.[a-z]{1,8}){0,2}",
            lo in (0u64..10, 0u64..10, 0u64..10),
            span in (0u64..5, 0u64..10, 0u64..10),
            min_inclusive in any::<bool>(),
            max_inclusive in any::<bool>(),
        ) {
            let min = Version::new(lo.0, lo.1, lo.2);
            let max = Version::new(lo.0 + span.0 + 1, span.1, span.2);
            let range = Range::new(min, min_inclusive, max, max_inclusive).unwrap();
            let line = format!("{} {}", id, range);

            let source = ConstraintSource::Url("mem://".to_string());
            let parsed = TargetConstraint::parse_line(&line, source).unwrap();
            prop_assert_eq!(parsed.target_id, id);
            prop_assert_eq!(parsed.range, range);
        }
    }
}
