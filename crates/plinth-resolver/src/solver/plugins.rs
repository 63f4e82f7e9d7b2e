//! Plugin-satisfaction phase
//!
//! Once every feature constraint is settled, the plugins required by the
//! starting and chosen features must be provided by some feature in the
//! result. When they are not, the catalog is searched for a feature that
//! ships the plugin, and a constraint on that feature is inferred.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::debug;

use plinth_catalog::FeatureCatalog;
use plinth_core::types::{ConstraintSource, Feature, Range, Target, TargetConstraint};

use super::pass::PassState;
use super::ConstraintSolver;
use crate::algorithm::ChoiceAlgorithm;
use crate::diagnostics::{Diagnostic, ResolutionFailure, ResultKind};

impl<C: FeatureCatalog> ConstraintSolver<C> {
    /// Check plugin requirements; `true` requests a restart with inferred
    /// constraints
    pub(super) fn satisfy_plugins(&mut self, state: &mut PassState) -> Result<bool, ResolutionFailure> {
        let consumers: Vec<Arc<Feature>> = self
            .starting
            .values()
            .cloned()
            .chain(
                state
                    .choices
                    .values()
                    .filter(|d| !d.is_fixed())
                    .map(|d| d.feature().clone()),
            )
            .collect();
        let provided: Vec<&Target> = consumers
            .iter()
            .chain(self.fixed.values())
            .flat_map(|feature| feature.plugins.iter().map(|p| &p.target))
            .collect();

        let mut unmatched: BTreeMap<String, BTreeSet<TargetConstraint>> = BTreeMap::new();
        for feature in &consumers {
            for constraint in feature.plugin_constraints.iter().filter(|c| c.required) {
                if !provided.iter().any(|target| constraint.is_match(target)) {
                    unmatched
                        .entry(constraint.target_id.clone())
                        .or_default()
                        .insert(constraint.clone());
                }
            }
        }
        if unmatched.is_empty() {
            return Ok(false);
        }

        let plugin_ids: Vec<&str> = unmatched.keys().map(String::as_str).collect();
        self.report(Diagnostic::warning(
            ResultKind::ExhaustivePluginSearch,
            format!("searching the catalog for features providing {}", plugin_ids.join(", ")),
        ));

        let excluded: BTreeSet<String> = state.choices.keys().chain(self.starting.keys()).cloned().collect();
        let candidates = self.scan_for_features_with_plugins(&unmatched, &excluded);

        let mut restart = false;
        let mut unresolved = Vec::new();
        for (plugin_id, constraints) in &unmatched {
            let features: Vec<&String> = candidates.get(plugin_id).into_iter().flatten().collect();
            match features.as_slice() {
                [] => {
                    self.report(
                        Diagnostic::warning(
                            ResultKind::NoFeaturesWithPluginConstraint,
                            format!("no feature in the catalog provides plugin {}", plugin_id),
                        )
                        .about(plugin_id.clone())
                        .with_constraints(constraints.iter().cloned()),
                    );
                    unresolved.push(plugin_id.clone());
                },
                [feature_id] => match self.infer_plugin_constraint(feature_id, plugin_id, constraints) {
                    Some(inferred) if merge_discovered(state, inferred.clone()) => {
                        self.report(
                            Diagnostic::warning(
                                ResultKind::InferredConstraint,
                                format!("requiring {} {} to provide plugin {}", feature_id, inferred.range, plugin_id),
                            )
                            .about((*feature_id).clone())
                            .with_constraints([inferred]),
                        );
                        restart = true;
                    },
                    _ => unresolved.push(plugin_id.clone()),
                },
                _ => {
                    let names: Vec<&str> = features.iter().map(|s| s.as_str()).collect();
                    self.report(
                        Diagnostic::warning(
                            ResultKind::MultiplePossibleFeaturesForPlugin,
                            format!("plugin {} is provided by several features: {}", plugin_id, names.join(", ")),
                        )
                        .about(plugin_id.clone())
                        .with_constraints(constraints.iter().cloned()),
                    );
                    unresolved.push(plugin_id.clone());
                },
            }
        }

        if restart {
            return Ok(true);
        }

        for plugin_id in &unresolved {
            let constraints = unmatched.get(plugin_id).into_iter().flatten().cloned();
            self.report(
                Diagnostic::error(
                    ResultKind::UnmatchedPlugins,
                    format!("no feature can be added to provide plugin {}", plugin_id),
                )
                .about(plugin_id.clone())
                .with_constraints(constraints),
            );
        }

        let subject = unresolved.first().cloned().unwrap_or_default();
        let offending: Vec<TargetConstraint> = unresolved
            .iter()
            .filter_map(|plugin_id| unmatched.get(plugin_id))
            .flatten()
            .cloned()
            .collect();
        Err(self.failure(
            &state.choices,
            ResultKind::UnmatchedPlugins,
            &subject,
            format!("unmatched plugin requirements: {}", unresolved.join(", ")),
            offending,
        ))
    }

    /// Find catalog features whose latest version ships one of the
    /// unmatched plugins.
    ///
    /// Features in `excluded` and fixed features are skipped. Returns the
    /// candidate feature ids per plugin id.
    pub fn scan_for_features_with_plugins(
        &self,
        unmatched: &BTreeMap<String, BTreeSet<TargetConstraint>>,
        excluded: &BTreeSet<String>,
    ) -> BTreeMap<String, BTreeSet<String>> {
        let mut candidates: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for id in self.catalog.available_feature_ids() {
            if excluded.contains(&id) || self.fixed.contains_key(&id) {
                continue;
            }
            let Some(latest) = self.catalog.feature_version_set(&id).and_then(|v| v.into_iter().max()) else {
                continue;
            };
            let model = match self.catalog.feature_model(&latest) {
                Ok(model) => model,
                Err(e) => {
                    debug!("Skipping {} during plugin scan: {}", latest, e);
                    continue;
                },
            };
            for plugin in &model.plugins {
                if unmatched.contains_key(&plugin.target.id) {
                    candidates
                        .entry(plugin.target.id.clone())
                        .or_default()
                        .insert(id.clone());
                }
            }
        }

        candidates
    }

    /// Constraint on `feature_id` covering the versions that ship a plugin
    /// satisfying every constraint on `plugin_id`.
    ///
    /// Satisfying versions need not be contiguous; the inferred range covers
    /// the run the active algorithm would prefer.
    fn infer_plugin_constraint(
        &self,
        feature_id: &str,
        plugin_id: &str,
        constraints: &BTreeSet<TargetConstraint>,
    ) -> Option<TargetConstraint> {
        let mut versions = self.catalog.feature_version_set(feature_id)?;
        versions.sort();

        let satisfies = |target: &Target| {
            self.catalog.feature_model(target).is_ok_and(|model| {
                model
                    .plugins
                    .iter()
                    .any(|p| p.target.id == plugin_id && constraints.iter().all(|c| c.is_match(&p.target)))
            })
        };

        let mut runs: Vec<(Target, Target)> = Vec::new();
        let mut current: Option<(Target, Target)> = None;
        for target in versions {
            if satisfies(&target) {
                current = Some(match current.take() {
                    Some((first, _)) => (first, target),
                    None => (target.clone(), target),
                });
            } else if let Some(run) = current.take() {
                runs.push(run);
            }
        }
        runs.extend(current);

        if runs.len() > 1 {
            debug!("{} ships plugin {} in {} separate version runs", feature_id, plugin_id, runs.len());
        }
        let (low, high) = match self.algorithm {
            ChoiceAlgorithm::Latest => runs.pop()?,
            ChoiceAlgorithm::LatestBuildOfLeastMatch => runs.into_iter().next()?,
        };
        let range = Range::new(low.version, true, high.version, true).ok()?;

        Some(TargetConstraint::new(
            ConstraintSource::Plugins {
                plugin_ids: BTreeSet::from([plugin_id.to_string()]),
            },
            feature_id,
            range,
        ))
    }
}

/// Record an inferred plugin constraint, intersecting with one already
/// inferred for the same feature. `false` if the two cannot both hold.
fn merge_discovered(state: &mut PassState, inferred: TargetConstraint) -> bool {
    let Some(existing) = state.discovered.get(&inferred.target_id) else {
        state.discovered.insert(inferred.target_id.clone(), inferred);
        return true;
    };

    let Some(range) = Range::intersect([&existing.range, &inferred.range]) else {
        return false;
    };
    let mut plugin_ids = BTreeSet::new();
    for source in [&existing.source, &inferred.source] {
        if let ConstraintSource::Plugins { plugin_ids: ids } = source {
            plugin_ids.extend(ids.iter().cloned());
        }
    }

    let merged = TargetConstraint::new(ConstraintSource::Plugins { plugin_ids }, inferred.target_id.clone(), range);
    state.discovered.insert(inferred.target_id, merged);
    true
}
