//! `plinth versions` command implementation.

use camino::Utf8PathBuf;
use plinth_catalog::FeatureCatalog;
use plinth_core::error::{PlinthError, PlinthResult};
use plinth_resolver::drop_non_latest;

use super::{suggest_similar, CommandContext};

/// Execute the `plinth versions` command
pub async fn execute(
    feature: &str,
    config: Option<&Utf8PathBuf>,
    catalog: Option<&Utf8PathBuf>,
    ctx: &CommandContext,
) -> PlinthResult<bool> {
    let catalog = match catalog {
        Some(path) => ctx.load_catalog_file(path).await?,
        None => {
            let loaded = ctx.load_config(config, Default::default()).await?;
            ctx.load_catalog(&loaded).await?
        },
    };

    let Some(versions) = catalog.feature_version_set(feature) else {
        if let Some(suggestion) = suggest_similar(feature, &catalog.available_feature_ids()) {
            ctx.output.info(&format!("Did you mean '{}'?", suggestion));
        }
        return Err(PlinthError::FeatureNotFound {
            id: feature.to_string(),
        });
    };

    let latest_builds = drop_non_latest(&versions);
    for target in &versions {
        if latest_builds.contains(target) {
            ctx.output.step(&format!("{} (latest build)", target.version));
        } else {
            ctx.output.step(&target.version.to_string());
        }
    }

    Ok(true)
}
