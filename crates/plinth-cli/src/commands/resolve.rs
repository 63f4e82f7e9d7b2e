//! `plinth resolve` command implementation.
//!
//! Loads plinth.toml and its catalog, runs the solver, and prints the chosen
//! version of every feature or the failure that stopped the search.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use camino::Utf8PathBuf;
use plinth_catalog::{FeatureCatalog, MemoizedCatalog};
use plinth_core::error::PlinthResult;
use plinth_core::types::{Feature, Target};
use plinth_resolver::{ConstraintSolver, Severity};
use tracing::debug;

use super::CommandContext;
use crate::output::errors::ErrorFormatter;

/// Execute the `plinth resolve` command
pub async fn execute(
    config: Option<&Utf8PathBuf>,
    overrides: HashMap<String, String>,
    ctx: &CommandContext,
) -> PlinthResult<bool> {
    let start_time = Instant::now();

    let loaded = ctx.load_config(config, overrides).await?;
    let install = &loaded.config.install;
    let policy = loaded.config.resolver.policy();

    let catalog = MemoizedCatalog::new(ctx.load_catalog(&loaded).await?);
    let starting = models(&catalog, install.starting_targets()?)?;
    let fixed = models(&catalog, install.fixed_targets()?)?;
    let contingent = install.contingent_constraints("plinth.toml [install.contingent]")?;

    ctx.output.step(&format!(
        "Resolving {} starting features with policy {}",
        starting.len(),
        policy
    ));

    let mut solver = ConstraintSolver::new(&catalog, starting, fixed, policy)?
        .with_max_restarts(loaded.config.resolver.max_restarts());
    solver.add_contingent_constraints(contingent);

    let resolved = solver.search_and_warn();
    debug!("Catalog lookups: {:?}", catalog.stats());

    for diagnostic in solver.diagnostics().iter().filter(|d| d.severity == Severity::Warning) {
        ctx.output.warn(&diagnostic.to_string());
    }

    match resolved {
        Some(targets) => {
            for target in &targets {
                ctx.output.success(&target.to_string());
            }
            let fixed_count = solver.results().filter(|choice| choice.is_fixed()).count();
            if fixed_count > 0 {
                ctx.output.info(&format!("{} fixed features left in place", fixed_count));
            }
            ctx.output.info(&format!(
                "Resolved {} features in {:.2}s",
                targets.len(),
                start_time.elapsed().as_secs_f64()
            ));
            Ok(true)
        },
        None => {
            if let Some(failure) = solver.last_failure() {
                eprint!("{}", ErrorFormatter::new().format_failure(failure));
            }
            Ok(false)
        },
    }
}

/// Look up the dependency models of configured targets
fn models<C: FeatureCatalog>(catalog: &C, targets: Vec<Target>) -> PlinthResult<Vec<Arc<Feature>>> {
    targets.iter().map(|target| catalog.feature_model(target)).collect()
}
