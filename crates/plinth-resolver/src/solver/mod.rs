//! Restarting constraint solver
//!
//! [`ConstraintSolver`] picks one version for every feature reachable from
//! the starting contributions. It works in passes: each pass chooses greedily
//! with the active [`ChoiceAlgorithm`], and when a later constraint proves an
//! earlier choice wrong the pass is abandoned and a new one starts with the
//! extra knowledge (discovered and future constraints) carried over.

mod pass;
mod plugins;


use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, info};

use plinth_catalog::FeatureCatalog;
use plinth_core::error::{PlinthError, PlinthResult};
use plinth_core::types::{Feature, Range, Target, TargetConstraint};

use crate::algorithm::ChoiceAlgorithm;
use crate::choice::{ChoiceDetails, MismatchedConstraintsResult};
use crate::diagnostics::{Diagnostic, DiagnosticSink, ResolutionFailure, ResultKind, TracingSink};
use crate::graph::ProvenanceGraph;

use self::pass::{PassState, Step};

/// Passes allowed per search before giving up
pub const DEFAULT_MAX_RESTARTS: usize = 64;

/// Feature-version solver over a [`FeatureCatalog`]
pub struct ConstraintSolver<C> {
    catalog: C,
    algorithm: ChoiceAlgorithm,
    starting: BTreeMap<String, Arc<Feature>>,
    fixed: BTreeMap<String, Arc<Feature>>,
    contingent: BTreeMap<String, BTreeSet<TargetConstraint>>,
    max_restarts: usize,
    sink: Box<dyn DiagnosticSink>,
    diagnostics: Vec<Diagnostic>,
    choices: BTreeMap<String, ChoiceDetails>,
    last_failure: Option<ResolutionFailure>,
}

impl<C: FeatureCatalog> ConstraintSolver<C> {
    /// Create a solver for the given starting and fixed contributions.
    ///
    /// Each feature id may appear at most once per role.
    pub fn new<S, F>(catalog: C, starting: S, fixed: F, algorithm: ChoiceAlgorithm) -> PlinthResult<Self>
    where
        S: IntoIterator<Item = Arc<Feature>>,
        F: IntoIterator<Item = Arc<Feature>>,
    {
        Ok(Self {
            catalog,
            algorithm,
            starting: index_contributions("starting", starting)?,
            fixed: index_contributions("fixed", fixed)?,
            contingent: BTreeMap::new(),
            max_restarts: DEFAULT_MAX_RESTARTS,
            sink: Box::new(TracingSink),
            diagnostics: Vec::new(),
            choices: BTreeMap::new(),
            last_failure: None,
        })
    }

    pub fn with_max_restarts(mut self, max_restarts: usize) -> Self {
        self.max_restarts = max_restarts;
        self
    }

    /// Replace the default `tracing` sink
    pub fn with_sink(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn algorithm(&self) -> ChoiceAlgorithm {
        self.algorithm
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Constraints applied whenever their target id is being resolved,
    /// without ever introducing the id themselves
    pub fn add_contingent_constraints<I>(&mut self, constraints: I)
    where
        I: IntoIterator<Item = TargetConstraint>,
    {
        for constraint in constraints {
            self.contingent
                .entry(constraint.target_id.clone())
                .or_default()
                .insert(constraint);
        }
    }

    /// Run a search, reporting only whether it succeeded
    pub fn search(&mut self) -> bool {
        self.try_search().is_ok()
    }

    /// Run a search and return the chosen targets, sorted, fixed excluded
    pub fn try_search(&mut self) -> Result<Vec<Target>, ResolutionFailure> {
        self.diagnostics.clear();
        self.choices.clear();
        self.last_failure = None;

        let mut discovered = BTreeMap::new();
        let mut future = BTreeMap::new();
        let mut restarts = 0usize;

        loop {
            info!("Starting resolution pass {}", restarts + 1);
            let mut state = self.seed_pass(discovered, future);

            loop {
                match self.step(state) {
                    Ok(Step::Continue(next)) => state = next,
                    Ok(Step::Restart(next)) => {
                        restarts += 1;
                        if restarts > self.max_restarts {
                            let failure = ResolutionFailure {
                                kind: ResultKind::RestartLimit,
                                subject: String::new(),
                                message: format!("gave up after {} restarts", self.max_restarts),
                                constraints: Vec::new(),
                                tree: String::new(),
                            };
                            return Err(self.fail(failure));
                        }
                        debug!("Restarting with {} discovered constraints", next.discovered.len());
                        discovered = next.discovered;
                        future = next.future;
                        break;
                    },
                    Ok(Step::Done(done)) => {
                        self.choices = done.choices;
                        let resolved = self.resolved_targets();
                        info!("Resolved {} features in {} passes", resolved.len(), restarts + 1);
                        return Ok(resolved);
                    },
                    Err(failure) => return Err(self.fail(failure)),
                }
            }
        }
    }

    /// Search, then report advisory diagnostics about the result
    pub fn search_and_warn(&mut self) -> Option<Vec<Target>> {
        let resolved = self.try_search().ok()?;

        for warning in self.algorithm.warnings_on_results(&self.catalog, &resolved) {
            self.report(warning);
        }
        for mismatch in self.compute_mismatched_initial_constraints() {
            let diagnostic = Diagnostic::warning(ResultKind::MismatchedStartingConstraint, mismatch.to_string())
                .about(mismatch.chosen.id.clone())
                .with_chosen(mismatch.chosen.version.clone())
                .with_constraints(mismatch.starting_constraints.iter().cloned())
                .with_constraints(mismatch.narrower_constraints.iter().cloned());
            self.report(diagnostic);
        }

        Some(resolved)
    }

    /// Choices of the last search, fixed contributions included
    pub fn results(&self) -> impl Iterator<Item = &ChoiceDetails> {
        self.choices.values()
    }

    /// Diagnostics reported by the last search
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn last_failure(&self) -> Option<&ResolutionFailure> {
        self.last_failure.as_ref()
    }

    /// Pick a version of `id` inside `range` and load its model.
    ///
    /// A failure's provenance tree is drawn from `choices`, the choices
    /// made so far by the caller's pass.
    pub fn choose_feature(
        &self,
        choices: &BTreeMap<String, ChoiceDetails>,
        id: &str,
        range: &Range,
        constraints: &BTreeSet<TargetConstraint>,
    ) -> Result<Arc<Feature>, ResolutionFailure> {
        let options = match self.catalog.feature_version_set(id) {
            Some(options) if !options.is_empty() => options,
            _ => {
                return Err(self.failure(
                    choices,
                    ResultKind::NotFound,
                    id,
                    format!("feature {} is not in the catalog", id),
                    constraints.iter().cloned().collect(),
                ))
            },
        };

        let Some(target) = self.algorithm.choose_target(&options, range) else {
            let available: Vec<String> = options.iter().map(|t| t.version.to_string()).collect();
            return Err(self.failure(
                choices,
                ResultKind::Unmatched,
                id,
                format!("no version of {} in {}; available: {}", id, range, available.join(", ")),
                constraints.iter().cloned().collect(),
            ));
        };

        self.catalog.feature_model(&target).map_err(|e| {
            self.failure(
                choices,
                ResultKind::NotFound,
                id,
                e.to_string(),
                constraints.iter().cloned().collect(),
            )
        })
    }

    /// Per starting-constrained choice, evidence that LBLM chose a newer
    /// release than the starting constraints asked for. Sorted by feature id.
    pub fn compute_mismatched_initial_constraints(&self) -> Vec<MismatchedConstraintsResult> {
        self.choices
            .values()
            .filter(|details| !details.is_fixed())
            .filter_map(|details| {
                let all: Vec<TargetConstraint> = details.constraints().iter().cloned().collect();
                let original: Vec<TargetConstraint> = all
                    .iter()
                    .filter(|c| self.is_starting_source(c))
                    .cloned()
                    .collect();
                if original.is_empty() {
                    return None;
                }
                let available = self.catalog.feature_version_set(&details.target().id).unwrap_or_default();
                self.algorithm
                    .questionable_starting_constraints(&original, &all, &available, details.target())
            })
            .collect()
    }

    fn seed_pass(
        &self,
        discovered: BTreeMap<String, TargetConstraint>,
        future: BTreeMap<String, BTreeSet<TargetConstraint>>,
    ) -> PassState {
        let choices = self
            .fixed
            .iter()
            .map(|(id, feature)| (id.clone(), ChoiceDetails::fixed(feature.clone())))
            .collect();

        PassState {
            choices,
            worklist: self.starting.values().cloned().collect(),
            future,
            discovered,
            first_iteration: true,
        }
    }

    fn resolved_targets(&self) -> Vec<Target> {
        self.choices
            .values()
            .filter(|details| !details.is_fixed())
            .map(|details| details.target().clone())
            .collect()
    }

    fn is_starting_source(&self, constraint: &TargetConstraint) -> bool {
        constraint
            .source
            .source_logical_id()
            .is_some_and(|id| self.starting.contains_key(id))
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        self.sink.emit(&diagnostic);
        self.diagnostics.push(diagnostic);
    }

    fn fail(&mut self, failure: ResolutionFailure) -> ResolutionFailure {
        self.report(failure.to_diagnostic());
        self.last_failure = Some(failure.clone());
        failure
    }

    /// Build a failure with the provenance tree rooted at `subject`
    fn failure(
        &self,
        choices: &BTreeMap<String, ChoiceDetails>,
        kind: ResultKind,
        subject: &str,
        message: String,
        constraints: Vec<TargetConstraint>,
    ) -> ResolutionFailure {
        let mut graph = ProvenanceGraph::from_constraints(choices.values().flat_map(|d| d.constraints()));
        for constraint in &constraints {
            graph.add_constraint(constraint);
        }

        let tree = graph.render(&[subject], |id| {
            if let Some(feature) = self.starting.get(id) {
                Some(format!("starting {}", feature.target.version))
            } else if let Some(details) = choices.get(id) {
                let role = if details.is_fixed() { "fixed" } else { "chosen" };
                Some(format!("{} {}", role, details.target().version))
            } else {
                None
            }
        });

        ResolutionFailure {
            kind,
            subject: subject.to_string(),
            message,
            constraints,
            tree,
        }
    }
}

fn index_contributions<I>(role: &'static str, features: I) -> PlinthResult<BTreeMap<String, Arc<Feature>>>
where
    I: IntoIterator<Item = Arc<Feature>>,
{
    let mut indexed = BTreeMap::new();
    for feature in features {
        let id = feature.id().to_string();
        if indexed.insert(id.clone(), feature).is_some() {
            return Err(PlinthError::DuplicateContribution { role, id });
        }
    }
    Ok(indexed)
}
