//! Version-selection policies
//!
//! A [`ChoiceAlgorithm`] decides which version of a feature to pick inside a
//! range, how to react when a choice collides with a fixed feature, and what
//! to warn about once a resolution succeeds.
//!
//! Two policies exist:
//! - `Latest` always takes the highest version in range.
//! - `LatestBuildOfLeastMatch` (LBLM) takes the lowest release in range, but
//!   the newest build of that release. Builds are versions that differ only
//!   in their qualifier.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use plinth_catalog::FeatureCatalog;
use plinth_core::types::{Range, Target, TargetConstraint, Version};

use crate::choice::MismatchedConstraintsResult;
use crate::diagnostics::{Diagnostic, ResultKind};

/// Version-selection policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChoiceAlgorithm {
    /// Highest version in range
    Latest,
    /// Newest build of the lowest release in range
    #[default]
    #[serde(alias = "lblm")]
    LatestBuildOfLeastMatch,
}

impl ChoiceAlgorithm {
    /// Pick a target among `options` that lies within `range`
    pub fn choose_target(&self, options: &[Target], range: &Range) -> Option<Target> {
        let in_range: Vec<Target> = options
            .iter()
            .filter(|target| range.contains(&target.version))
            .cloned()
            .collect();

        match self {
            ChoiceAlgorithm::Latest => in_range.into_iter().max(),
            ChoiceAlgorithm::LatestBuildOfLeastMatch => {
                drop_non_latest(&in_range).into_iter().min()
            },
        }
    }

    /// Split constraints that exclude a fixed feature's version into those a
    /// retry of their source might fix and those it cannot.
    ///
    /// Under `Latest` sources can only move down, so a constraint whose range
    /// lies below the fixed version may be dropped by an older source. Under
    /// LBLM sources only move up, so the opposite holds. Constraints that
    /// accept the fixed version are ignored.
    pub fn partition_around_version<'a, I>(
        &self,
        fixed: &Target,
        constraints: I,
    ) -> (Vec<TargetConstraint>, Vec<TargetConstraint>)
    where
        I: IntoIterator<Item = &'a TargetConstraint>,
    {
        let mut possible = Vec::new();
        let mut impossible = Vec::new();

        for constraint in constraints {
            let position = constraint.range.match_version(&fixed.version);
            let retryable = match (self, position) {
                (_, Ordering::Equal) => continue,
                (ChoiceAlgorithm::Latest, Ordering::Greater) => true,
                (ChoiceAlgorithm::Latest, Ordering::Less) => false,
                (ChoiceAlgorithm::LatestBuildOfLeastMatch, Ordering::Less) => true,
                (ChoiceAlgorithm::LatestBuildOfLeastMatch, Ordering::Greater) => false,
            };
            if retryable {
                possible.push(constraint.clone());
            } else {
                impossible.push(constraint.clone());
            }
        }

        (possible, impossible)
    }

    /// Narrow the range a source feature may be chosen from so that `stale`
    /// is excluded.
    ///
    /// `range` is the source's current intersection. Returns `None` when the
    /// narrowed range is empty or no option of the source lies within it.
    pub fn pick_new_source_range(&self, options: &[Target], stale: &Target, range: &Range) -> Option<Range> {
        let bound = match self {
            ChoiceAlgorithm::Latest => {
                Range::new(Version::zero(), true, stale.version.clone(), false).ok()?
            },
            ChoiceAlgorithm::LatestBuildOfLeastMatch => Range::at_least(stale.version.next_patch()),
        };
        let narrowed = Range::intersect([range, &bound])?;

        options
            .iter()
            .any(|option| option.id == stale.id && narrowed.contains(&option.version))
            .then_some(narrowed)
    }

    /// Detect a starting constraint that admits an older release than the
    /// one LBLM ended up choosing.
    ///
    /// `original` holds the constraints contributed by starting features,
    /// `all` every constraint on the chosen feature, and `available` the
    /// catalog's versions of it. Always `None` under `Latest`.
    pub fn questionable_starting_constraints(
        &self,
        original: &[TargetConstraint],
        all: &[TargetConstraint],
        available: &[Target],
        chosen: &Target,
    ) -> Option<MismatchedConstraintsResult> {
        if *self == ChoiceAlgorithm::Latest {
            return None;
        }

        let low = original.iter().map(|c| c.range.lower()).min()?;
        let boundary = low.next_patch();
        if chosen.version < boundary {
            return None;
        }

        let older_available = available
            .iter()
            .any(|target| target.version >= *low && target.version < boundary);
        if !older_available {
            return None;
        }

        let starting_constraints = original
            .iter()
            .filter(|c| c.range.lower().next_patch() <= chosen.version)
            .cloned()
            .collect();
        let narrower_constraints = all
            .iter()
            .filter(|c| *c.range.lower() >= boundary)
            .cloned()
            .collect();

        Some(MismatchedConstraintsResult {
            chosen: chosen.clone(),
            starting_constraints,
            narrower_constraints,
        })
    }

    /// Advisory diagnostics about a successful resolution.
    ///
    /// Under LBLM each chosen feature with newer releases in the catalog gets
    /// one warning listing the latest build of every such release.
    pub fn warnings_on_results<C: FeatureCatalog>(&self, catalog: &C, chosen: &[Target]) -> Vec<Diagnostic> {
        if *self == ChoiceAlgorithm::Latest {
            return Vec::new();
        }

        chosen
            .iter()
            .filter_map(|target| {
                let newer: Vec<Target> = catalog
                    .feature_version_set(&target.id)?
                    .into_iter()
                    .filter(|option| option.id == target.id && option.version > target.version)
                    .collect();
                let newer = drop_non_latest(&newer);
                if newer.is_empty() {
                    return None;
                }

                let listed: Vec<String> = newer.iter().map(|option| option.version.to_string()).collect();
                Some(
                    Diagnostic::warning(
                        ResultKind::NewerReleaseAvailable,
                        format!("{} was chosen but {} available", target, listed.join(", ")),
                    )
                    .about(target.id.clone())
                    .with_chosen(target.version.clone()),
                )
            })
            .collect()
    }
}

/// Keep only the newest build of every release.
///
/// Output is sorted ascending. An element survives when the next element
/// belongs to a different id or to a later release.
pub fn drop_non_latest(options: &[Target]) -> Vec<Target> {
    let mut sorted = options.to_vec();
    sorted.sort();
    sorted.dedup();

    let mut kept = Vec::with_capacity(sorted.len());
    for (index, target) in sorted.iter().enumerate() {
        match sorted.get(index + 1) {
            Some(next) if next.id == target.id && next.version < target.version.next_patch() => {},
            _ => kept.push(target.clone()),
        }
    }
    kept
}

impl fmt::Display for ChoiceAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChoiceAlgorithm::Latest => f.write_str("latest"),
            ChoiceAlgorithm::LatestBuildOfLeastMatch => f.write_str("lblm"),
        }
    }
}

impl FromStr for ChoiceAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "latest" => Ok(ChoiceAlgorithm::Latest),
            "lblm" | "latest-build-of-least-match" => Ok(ChoiceAlgorithm::LatestBuildOfLeastMatch),
            other => Err(format!("unknown choice algorithm '{}', expected 'latest' or 'lblm'", other)),
        }
    }
}
