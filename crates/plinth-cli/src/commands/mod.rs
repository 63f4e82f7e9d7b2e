//! Command implementations and dispatch logic.
//!
//! Each command is an async function that takes a [`CommandContext`] and
//! returns whether it succeeded. Errors are reserved for unusable input.

use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use plinth_catalog::InMemoryCatalog;
use plinth_config::{ConfigLayering, ConfigLoader, PlinthToml};
use plinth_core::error::{PlinthError, PlinthResult};
use tracing::{debug, info};

pub mod check;
pub mod resolve;
pub mod versions;


use crate::{output::OutputHandler, Commands};

/// Shared context for all commands
pub struct CommandContext {
    pub cwd: Utf8PathBuf,
    pub output: OutputHandler,
}

/// Configuration after layering, with the directory its paths are relative to
pub struct LoadedConfig {
    pub config: PlinthToml,
    pub base_dir: Utf8PathBuf,
}

impl CommandContext {
    /// Create a new command context
    pub fn new() -> PlinthResult<Self> {
        let cwd = std::env::current_dir().map_err(|e| PlinthError::Io {
            message: "Failed to get current directory".to_string(),
            source: e,
        })?;
        let cwd = Utf8PathBuf::from_path_buf(cwd).map_err(|path| PlinthError::ConfigValidation {
            field: "cwd".to_string(),
            reason: format!("current directory {} is not valid UTF-8", path.display()),
        })?;

        Ok(Self {
            cwd,
            output: OutputHandler::new(),
        })
    }

    /// Load and layer configuration: global, project, environment, flags
    pub async fn load_config(
        &self,
        explicit: Option<&Utf8PathBuf>,
        cli_overrides: HashMap<String, String>,
    ) -> PlinthResult<LoadedConfig> {
        let loader = ConfigLoader::new(self.cwd.clone());
        let (project, source) = match explicit {
            Some(path) => loader.load_explicit_config(path).await?,
            None => loader.load_project_config().await?,
        };
        debug!("Loaded configuration from {:?}", source);

        let global = loader.load_global_config().await?;
        let config = ConfigLayering::merge_configs(
            global,
            project,
            ConfigLayering::collect_env_overrides(),
            cli_overrides,
        )?;

        let base_dir = source.base_dir().unwrap_or_else(|| self.cwd.clone());
        Ok(LoadedConfig { config, base_dir })
    }

    /// Load the catalog a configuration points at
    pub async fn load_catalog(&self, loaded: &LoadedConfig) -> PlinthResult<InMemoryCatalog> {
        let path = loaded.config.install.catalog_path(&loaded.base_dir);
        self.load_catalog_file(&path).await
    }

    pub async fn load_catalog_file(&self, path: &Utf8Path) -> PlinthResult<InMemoryCatalog> {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        };
        InMemoryCatalog::load_from_file(&path).await
    }
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> PlinthResult<bool> {
    match command {
        Commands::Resolve {
            config,
            catalog,
            policy,
            max_restarts,
        } => {
            info!("Resolving (policy override: {:?})", policy);
            let mut overrides = HashMap::new();
            if let Some(catalog) = catalog {
                overrides.insert("catalog".to_string(), catalog);
            }
            if let Some(policy) = policy {
                overrides.insert("policy".to_string(), policy);
            }
            if let Some(max_restarts) = max_restarts {
                overrides.insert("max-restarts".to_string(), max_restarts.to_string());
            }
            resolve::execute(config.as_ref(), overrides, ctx).await
        },
        Commands::Versions {
            feature,
            config,
            catalog,
        } => {
            info!("Listing versions of {}", feature);
            versions::execute(&feature, config.as_ref(), catalog.as_ref(), ctx).await
        },
        Commands::Check { config } => {
            info!("Checking configuration");
            check::execute(config.as_ref(), ctx).await
        },
    }
}

/// Suggest the closest known id based on edit distance
pub fn suggest_similar<'a, I>(input: &str, candidates: I) -> Option<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut best_match = None;
    let mut best_distance = usize::MAX;

    for candidate in candidates {
        let distance = edit_distance(input, candidate);
        if distance < best_distance && distance <= 2 {
            best_distance = distance;
            best_match = Some(candidate);
        }
    }

    best_match.cloned()
}

/// Levenshtein distance between two strings
fn edit_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    for (i, a_char) in a_chars.iter().enumerate() {
        let mut current = Vec::with_capacity(b_chars.len() + 1);
        current.push(i + 1);
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            let value = (previous[j] + cost).min(previous[j + 1] + 1).min(current[j] + 1);
            current.push(value);
        }
        previous = current;
    }

    previous[b_chars.len()]
}
