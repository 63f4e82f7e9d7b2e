//! `plinth check` command implementation.
//!
//! Validates plinth.toml and confirms that every starting and fixed feature
//! exists in the configured catalog.

use camino::Utf8PathBuf;
use plinth_catalog::FeatureCatalog;
use plinth_core::error::PlinthResult;

use super::CommandContext;

/// Execute the `plinth check` command
pub async fn execute(config: Option<&Utf8PathBuf>, ctx: &CommandContext) -> PlinthResult<bool> {
    let loaded = ctx.load_config(config, Default::default()).await?;
    let install = &loaded.config.install;
    let catalog = ctx.load_catalog(&loaded).await?;

    let mut missing = 0usize;
    let targets = install
        .starting_targets()?
        .into_iter()
        .chain(install.fixed_targets()?);
    for target in targets {
        if let Err(err) = catalog.feature_model(&target) {
            ctx.output.error(&err.to_string());
            missing += 1;
        }
    }

    let contingent = install.contingent_constraints("plinth.toml")?;
    for constraint in &contingent {
        if catalog.feature_version_set(&constraint.target_id).is_none() {
            ctx.output.warn(&format!(
                "contingent constraint {} names a feature the catalog does not know",
                constraint
            ));
        }
    }

    if missing > 0 {
        ctx.output.error(&format!("{} configured features are missing from the catalog", missing));
        return Ok(false);
    }

    ctx.output.success(&format!(
        "Configuration is valid: {} starting, {} fixed, {} contingent, policy {}",
        install.starting.len(),
        install.fixed.len(),
        contingent.len(),
        loaded.config.resolver.policy()
    ));
    Ok(true)
}
