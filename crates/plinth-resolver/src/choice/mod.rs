//! Per-feature choice records

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use plinth_core::types::{Feature, Range, Target, TargetConstraint, Version};

/// A chosen (or fixed) feature version and every constraint that has been
/// applied to it
#[derive(Debug, Clone)]
pub struct ChoiceDetails {
    feature: Arc<Feature>,
    fixed: bool,
    constraints: BTreeSet<TargetConstraint>,
}

impl ChoiceDetails {
    /// Record a version picked by the solver
    pub fn chosen(feature: Arc<Feature>) -> Self {
        Self {
            feature,
            fixed: false,
            constraints: BTreeSet::new(),
        }
    }

    /// Record a fixed contribution
    pub fn fixed(feature: Arc<Feature>) -> Self {
        Self {
            feature,
            fixed: true,
            constraints: BTreeSet::new(),
        }
    }

    pub fn target(&self) -> &Target {
        &self.feature.target
    }

    pub fn feature(&self) -> &Arc<Feature> {
        &self.feature
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    pub fn constraints(&self) -> &BTreeSet<TargetConstraint> {
        &self.constraints
    }

    pub fn add_constraint(&mut self, constraint: TargetConstraint) {
        self.constraints.insert(constraint);
    }

    pub fn add_constraints<I>(&mut self, constraints: I)
    where
        I: IntoIterator<Item = TargetConstraint>,
    {
        self.constraints.extend(constraints);
    }

    /// Intersection of all applied constraints, `None` if there are none or
    /// they do not overlap
    pub fn intersection(&self) -> Option<Range> {
        Range::intersect(self.constraints.iter().map(|c| &c.range))
    }
}

impl fmt::Display for ChoiceDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.target())?;
        if self.fixed {
            f.write_str(" (fixed)")?;
        }
        Ok(())
    }
}

/// Evidence that a starting constraint admits an older release than the one
/// chosen, because some narrower constraint pushed the choice up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MismatchedConstraintsResult {
    pub chosen: Target,
    /// Starting-feature constraints whose lower bound sits below the choice
    pub starting_constraints: Vec<TargetConstraint>,
    /// Constraints whose lower bound excludes the lowest admitted release
    pub narrower_constraints: Vec<TargetConstraint>,
}

impl MismatchedConstraintsResult {
    pub fn feature_id(&self) -> &str {
        &self.chosen.id
    }

    pub fn chosen_version(&self) -> &Version {
        &self.chosen.version
    }
}

impl fmt::Display for MismatchedConstraintsResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let starting: Vec<String> = self.starting_constraints.iter().map(ToString::to_string).collect();
        let narrower: Vec<String> = self.narrower_constraints.iter().map(ToString::to_string).collect();
        write!(
            f,
            "{} was chosen although starting constraints [{}] admit older releases; narrowed by [{}]",
            self.chosen,
            starting.join("; "),
            narrower.join("; ")
        )
    }
}
