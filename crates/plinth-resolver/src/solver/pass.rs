//! One resolution pass: grouping constraints and resolving each group

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::debug;

use plinth_catalog::FeatureCatalog;
use plinth_core::types::{ConstraintSource, Feature, Range, TargetConstraint};

use super::ConstraintSolver;
use crate::choice::ChoiceDetails;
use crate::diagnostics::{Diagnostic, ResolutionFailure, ResultKind};

/// State threaded through the iterations of a pass
pub(super) struct PassState {
    pub(super) choices: BTreeMap<String, ChoiceDetails>,
    /// Features whose constraints have not been grouped yet
    pub(super) worklist: Vec<Arc<Feature>>,
    /// Constraints that invalidated an earlier choice, applied on the next pass
    pub(super) future: BTreeMap<String, BTreeSet<TargetConstraint>>,
    /// Constraints inferred by the solver, applied on the first iteration
    pub(super) discovered: BTreeMap<String, TargetConstraint>,
    pub(super) first_iteration: bool,
}

/// Outcome of one iteration
pub(super) enum Step {
    Continue(PassState),
    Restart(PassState),
    Done(PassState),
}

fn joined(constraints: &[TargetConstraint]) -> String {
    let rendered: Vec<String> = constraints.iter().map(ToString::to_string).collect();
    rendered.join("; ")
}

impl<C: FeatureCatalog> ConstraintSolver<C> {
    pub(super) fn step(&mut self, mut state: PassState) -> Result<Step, ResolutionFailure> {
        let groups = self.collect_groups(&mut state);
        state.first_iteration = false;

        // Every group is resolved so one pass records all stale choices
        let mut restart = false;
        for (id, constraints) in groups {
            restart |= self.resolve_group(&mut state, &id, constraints)?;
        }
        if restart {
            return Ok(Step::Restart(state));
        }

        if !state.worklist.is_empty() {
            return Ok(Step::Continue(state));
        }
        if self.satisfy_plugins(&mut state)? {
            return Ok(Step::Restart(state));
        }
        Ok(Step::Done(state))
    }

    /// Drain the worklist into constraint groups keyed by target id
    fn collect_groups(&mut self, state: &mut PassState) -> BTreeMap<String, BTreeSet<TargetConstraint>> {
        let worklist = std::mem::take(&mut state.worklist);
        let mut groups: BTreeMap<String, BTreeSet<TargetConstraint>> = BTreeMap::new();

        for feature in &worklist {
            for constraint in &feature.feature_constraints {
                groups
                    .entry(constraint.target_id.clone())
                    .or_default()
                    .insert(constraint.clone());
            }
        }

        if state.first_iteration {
            for (id, constraint) in &state.discovered {
                if !state.choices.contains_key(id) {
                    groups.entry(id.clone()).or_default().insert(constraint.clone());
                }
            }
        }

        let mut assumed = Vec::new();
        for (id, group) in groups.iter_mut() {
            if let Some(contingent) = self.contingent.get(id) {
                for constraint in contingent {
                    if group.insert(constraint.clone()) {
                        assumed.push(constraint.clone());
                    }
                }
            }
            if !state.choices.contains_key(id) {
                if let Some(future) = state.future.get(id) {
                    group.extend(future.iter().cloned());
                }
            }
        }

        for constraint in assumed {
            let diagnostic = Diagnostic::debug(ResultKind::AssumingConstraint, format!("assuming {}", constraint))
                .about(constraint.target_id.clone())
                .with_constraints([constraint]);
            self.report(diagnostic);
        }

        groups
    }

    /// Resolve the constraints collected for one id; `true` requests a restart
    fn resolve_group(
        &mut self,
        state: &mut PassState,
        id: &str,
        constraints: BTreeSet<TargetConstraint>,
    ) -> Result<bool, ResolutionFailure> {
        let Some(intersection) = Range::intersect(constraints.iter().map(|c| &c.range)) else {
            let mut involved = constraints;
            if let Some(existing) = state.choices.get(id) {
                involved.extend(existing.constraints().iter().cloned());
            }
            return Err(self.failure(
                &state.choices,
                ResultKind::NoIntersection,
                id,
                format!("constraints on {} have no version in common", id),
                involved.into_iter().collect(),
            ));
        };

        if let Some(fixed) = self.fixed.get(id).cloned() {
            return self.resolve_fixed(state, id, constraints, &intersection, &fixed);
        }

        if let Some(start) = self.starting.get(id).cloned() {
            self.check_starting(state, id, &constraints, &start)?;
            return Ok(false);
        }

        if let Some(existing) = state.choices.get_mut(id) {
            if intersection.contains(&existing.target().version) {
                existing.add_constraints(constraints);
                return Ok(false);
            }
            return self.defer_to_future(state, id, constraints);
        }

        self.choose_new(state, id, &intersection, constraints)
    }

    fn choose_new(
        &mut self,
        state: &mut PassState,
        id: &str,
        intersection: &Range,
        constraints: BTreeSet<TargetConstraint>,
    ) -> Result<bool, ResolutionFailure> {
        match self.choose_feature(&state.choices, id, intersection, &constraints) {
            Ok(feature) => {
                debug!("Chose {} within {}", feature.target, intersection);
                let mut details = ChoiceDetails::chosen(feature.clone());
                details.add_constraints(constraints);
                state.choices.insert(id.to_string(), details);
                state.worklist.push(feature);
                Ok(false)
            },
            Err(failure)
                if constraints.iter().all(|c| !c.required)
                    && matches!(failure.kind, ResultKind::NotFound | ResultKind::Unmatched) =>
            {
                debug!("Skipping optional feature {}: {}", id, failure.message);
                Ok(false)
            },
            Err(failure) => Err(failure),
        }
    }

    /// A chosen feature no longer satisfies new constraints: remember them
    /// for the next pass
    fn defer_to_future(
        &mut self,
        state: &mut PassState,
        id: &str,
        constraints: BTreeSet<TargetConstraint>,
    ) -> Result<bool, ResolutionFailure> {
        let Some(existing) = state.choices.get(id) else {
            return Ok(false);
        };
        let stale = existing.target().clone();
        let mut union = existing.constraints().clone();
        union.extend(constraints.iter().cloned());

        if Range::intersect(union.iter().map(|c| &c.range)).is_none() {
            return Err(self.failure(
                &state.choices,
                ResultKind::NoIntersection,
                id,
                format!("{} was chosen but later constraints leave no common version", stale),
                union.into_iter().collect(),
            ));
        }

        let fresh: Vec<TargetConstraint> = constraints
            .into_iter()
            .filter(|c| !c.contains(&stale.version))
            .collect();
        let diagnostic = Diagnostic::warning(
            ResultKind::AddingFutureConstraint,
            format!("{} does not satisfy {}; restarting", stale, joined(&fresh)),
        )
        .about(id)
        .with_chosen(stale.version.clone())
        .with_constraints(fresh.iter().cloned());
        self.report(diagnostic);

        state.future.entry(id.to_string()).or_default().extend(fresh);
        Ok(true)
    }

    fn resolve_fixed(
        &mut self,
        state: &mut PassState,
        id: &str,
        constraints: BTreeSet<TargetConstraint>,
        intersection: &Range,
        fixed: &Arc<Feature>,
    ) -> Result<bool, ResolutionFailure> {
        if intersection.contains(&fixed.target.version) {
            if let Some(details) = state.choices.get_mut(id) {
                details.add_constraints(constraints);
            }
            return Ok(false);
        }

        let (possible, impossible) = self.algorithm.partition_around_version(&fixed.target, &constraints);
        if !impossible.is_empty() || possible.is_empty() {
            let offending = if impossible.is_empty() {
                constraints.into_iter().collect()
            } else {
                impossible
            };
            return Err(self.failure(
                &state.choices,
                ResultKind::FixedMismatch,
                id,
                format!("fixed {} cannot satisfy {}", fixed.target, joined(&offending)),
                offending,
            ));
        }

        for constraint in &possible {
            let source = constraint.source.source_logical_id().map(str::to_string);
            match source {
                Some(source) if self.starting.contains_key(&source) => {
                    return Err(self.failure(
                        &state.choices,
                        ResultKind::StartingMismatchOnFixed,
                        id,
                        format!(
                            "starting feature {} requires {} {} but {} is fixed",
                            source, id, constraint.range, fixed.target
                        ),
                        vec![constraint.clone()],
                    ));
                },
                Some(source) if state.choices.get(&source).is_some_and(|d| !d.is_fixed()) => {
                    self.retry_source(state, fixed, &source, constraint)?;
                },
                _ => {
                    return Err(self.failure(
                        &state.choices,
                        ResultKind::FixedMismatch,
                        id,
                        format!("fixed {} cannot satisfy {}", fixed.target, constraint),
                        vec![constraint.clone()],
                    ));
                },
            }
        }

        Ok(true)
    }

    /// Narrow the range of a chosen feature whose constraint conflicts with
    /// a fixed feature, so the next pass picks a different version of it
    fn retry_source(
        &mut self,
        state: &mut PassState,
        fixed: &Arc<Feature>,
        source: &str,
        constraint: &TargetConstraint,
    ) -> Result<(), ResolutionFailure> {
        let Some(details) = state.choices.get(source) else {
            return Ok(());
        };
        let stale = details.target().clone();
        let range = details.intersection().unwrap_or_else(Range::any);
        let options = self.catalog.feature_version_set(source).unwrap_or_default();

        let Some(narrowed) = self.algorithm.pick_new_source_range(&options, &stale, &range) else {
            return Err(self.failure(
                &state.choices,
                ResultKind::ExhaustedOptionsOnFixed,
                fixed.id(),
                format!(
                    "no version of {} other than {} is compatible with fixed {}",
                    source, stale.version, fixed.target
                ),
                vec![constraint.clone()],
            ));
        };

        let inferred = TargetConstraint::new(
            ConstraintSource::Retry {
                fixed_id: fixed.id().to_string(),
                stale: stale.clone(),
            },
            source,
            narrowed,
        );
        let diagnostic = Diagnostic::warning(
            ResultKind::InferredConstraint,
            format!("retrying {} within {} to accommodate fixed {}", source, inferred.range, fixed.target),
        )
        .about(source)
        .with_chosen(stale.version)
        .with_constraints([inferred.clone()]);
        self.report(diagnostic);

        state.discovered.insert(source.to_string(), inferred);
        Ok(())
    }

    /// Starting features are never re-chosen; their constraints must hold
    /// as given and may only come from other starting features
    fn check_starting(
        &self,
        state: &PassState,
        id: &str,
        constraints: &BTreeSet<TargetConstraint>,
        start: &Feature,
    ) -> Result<(), ResolutionFailure> {
        let through: Vec<TargetConstraint> = constraints
            .iter()
            .filter(|c| {
                c.source
                    .source_logical_id()
                    .is_some_and(|source| !self.starting.contains_key(source))
            })
            .cloned()
            .collect();
        if !through.is_empty() {
            let sources: BTreeSet<&str> = through.iter().filter_map(|c| c.source.source_logical_id()).collect();
            let sources: Vec<&str> = sources.into_iter().collect();
            return Err(self.failure(
                &state.choices,
                ResultKind::DonutHole,
                id,
                format!(
                    "starting feature {} is also required through {}, which is not a starting feature",
                    id,
                    sources.join(", ")
                ),
                through,
            ));
        }

        let violations: Vec<TargetConstraint> = constraints
            .iter()
            .filter(|c| !c.contains(&start.target.version))
            .cloned()
            .collect();
        if !violations.is_empty() {
            return Err(self.failure(
                &state.choices,
                ResultKind::InvalidInitialState,
                id,
                format!("starting {} does not satisfy {}", start.target, joined(&violations)),
                violations,
            ));
        }

        Ok(())
    }
}
