//! Configuration layering, project discovery, and environment overrides

use std::collections::HashMap;

use camino::Utf8PathBuf;

use plinth_core::error::PlinthError;
use plinth_resolver::ChoiceAlgorithm;

use crate::toml::{GlobalConfig, PlinthToml, ResolverSection};
use crate::ConfigResult;

/// Name of the project configuration file
pub const PROJECT_CONFIG_FILE: &str = "plinth.toml";

/// Prefix of environment variables that override configuration
pub const ENV_PREFIX: &str = "PLINTH_";

/// Main configuration loading interface
pub struct ConfigLoader {
    /// Current working directory
    cwd: Utf8PathBuf,
}

/// Configuration layering and merging
pub struct ConfigLayering;

/// Where a loaded configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Global config file
    Global(Utf8PathBuf),
    /// Project plinth.toml file
    Project(Utf8PathBuf),
    /// Environment variable
    Environment(String),
    /// CLI flag
    CommandLine,
}

impl ConfigSource {
    /// Directory relative paths in the configuration are resolved against
    pub fn base_dir(&self) -> Option<Utf8PathBuf> {
        match self {
            ConfigSource::Global(path) | ConfigSource::Project(path) => path.parent().map(|p| p.to_path_buf()),
            _ => None,
        }
    }
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new(cwd: Utf8PathBuf) -> Self {
        Self { cwd }
    }

    pub fn cwd(&self) -> &Utf8PathBuf {
        &self.cwd
    }

    /// Load the nearest plinth.toml
    pub async fn load_project_config(&self) -> ConfigResult<(PlinthToml, ConfigSource)> {
        let path = self.resolve_config_path(PROJECT_CONFIG_FILE)?;
        if !path.exists() {
            return Err(PlinthError::ConfigValidation {
                field: "config".to_string(),
                reason: format!(
                    "No {} found in current directory or parent directories",
                    PROJECT_CONFIG_FILE
                ),
            });
        }
        let config = crate::toml::load_from_file(&path).await?;
        Ok((config, ConfigSource::Project(path)))
    }

    /// Load an explicitly named configuration file
    pub async fn load_explicit_config(&self, path: &Utf8PathBuf) -> ConfigResult<(PlinthToml, ConfigSource)> {
        let path = if path.is_absolute() {
            path.clone()
        } else {
            self.cwd.join(path)
        };
        let config = crate::toml::load_from_file(&path).await?;
        Ok((config, ConfigSource::Project(path)))
    }

    /// Find configuration file in project (walks up directory tree)
    pub fn resolve_config_path(&self, filename: &str) -> ConfigResult<Utf8PathBuf> {
        let mut current = self.cwd.as_path();

        loop {
            let config_path = current.join(filename);
            if config_path.exists() {
                return Ok(config_path);
            }

            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }

        // Path in the working directory even if it doesn't exist
        Ok(self.cwd.join(filename))
    }

    /// Location of the global configuration file
    pub fn global_config_path() -> ConfigResult<Utf8PathBuf> {
        let home_dir = dirs::home_dir().ok_or_else(|| PlinthError::ConfigValidation {
            field: "home_dir".to_string(),
            reason: "Could not determine home directory".to_string(),
        })?;

        Ok(Utf8PathBuf::try_from(home_dir)
            .map_err(|e| PlinthError::ConfigValidation {
                field: "home_dir".to_string(),
                reason: format!("Invalid home directory path: {}", e),
            })?
            .join(".plinth")
            .join("config.toml"))
    }

    /// Load global configuration
    pub async fn load_global_config(&self) -> ConfigResult<Option<GlobalConfig>> {
        let path = Self::global_config_path()?;
        if !path.exists() {
            return Ok(None);
        }
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| PlinthError::io(format!("Failed to read {}", path), e))?;
        crate::toml::parse_global_config(&content).map(Some)
    }
}

impl ConfigLayering {
    /// Merge configuration layers; later layers win
    pub fn merge_configs(
        global_config: Option<GlobalConfig>,
        project_config: PlinthToml,
        env_overrides: HashMap<String, String>,
        cli_overrides: HashMap<String, String>,
    ) -> ConfigResult<PlinthToml> {
        let mut merged = project_config;

        if let Some(global) = global_config {
            Self::fill_resolver_defaults(&mut merged.resolver, global.resolver);
        }

        Self::apply_env_overrides(&mut merged, &env_overrides)?;
        Self::apply_cli_overrides(&mut merged, &cli_overrides)?;

        Ok(merged)
    }

    fn fill_resolver_defaults(resolver: &mut ResolverSection, global: ResolverSection) {
        if resolver.policy.is_none() {
            resolver.policy = global.policy;
        }
        if resolver.max_restarts.is_none() {
            resolver.max_restarts = global.max_restarts;
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(config: &mut PlinthToml, overrides: &HashMap<String, String>) -> ConfigResult<()> {
        for (key, value) in overrides {
            match key.as_str() {
                "PLINTH_POLICY" => config.resolver.policy = Some(parse_policy(key, value)?),
                "PLINTH_MAX_RESTARTS" => config.resolver.max_restarts = Some(parse_restarts(key, value)?),
                "PLINTH_CATALOG" => config.install.catalog = Utf8PathBuf::from(value),
                _ => {},
            }
        }

        Ok(())
    }

    /// Apply CLI flag overrides
    fn apply_cli_overrides(config: &mut PlinthToml, overrides: &HashMap<String, String>) -> ConfigResult<()> {
        for (key, value) in overrides {
            match key.as_str() {
                "policy" => config.resolver.policy = Some(parse_policy("--policy", value)?),
                "max-restarts" => config.resolver.max_restarts = Some(parse_restarts("--max-restarts", value)?),
                "catalog" => config.install.catalog = Utf8PathBuf::from(value),
                _ => {},
            }
        }

        Ok(())
    }

    /// Collect environment variable overrides
    pub fn collect_env_overrides() -> HashMap<String, String> {
        std::env::vars().filter(|(key, _)| key.starts_with(ENV_PREFIX)).collect()
    }
}

fn parse_policy(field: &str, value: &str) -> ConfigResult<ChoiceAlgorithm> {
    value.parse().map_err(|reason| PlinthError::ConfigValidation {
        field: field.to_string(),
        reason,
    })
}

fn parse_restarts(field: &str, value: &str) -> ConfigResult<usize> {
    value.parse().map_err(|e| PlinthError::ConfigValidation {
        field: field.to_string(),
        reason: format!("expected a non-negative integer, got '{}': {}", value, e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toml::parse_plinth_toml;
    use tempfile::TempDir;

    const PROJECT: &str = r#"
[install]
catalog = "catalog.json"
starting = ["com.example.a 1.0.0"]
"#;

    fn temp_path(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap()
    }

    #[tokio::test]
    async fn test_resolve_config_path_walks_up() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_path(&temp_dir);
        let nested = root.join("sub").join("dir");
        tokio::fs::create_dir_all(&nested).await.unwrap();
        tokio::fs::write(root.join(PROJECT_CONFIG_FILE), PROJECT).await.unwrap();

        let loader = ConfigLoader::new(nested);
        let resolved = loader.resolve_config_path(PROJECT_CONFIG_FILE).unwrap();
        assert_eq!(resolved, root.join(PROJECT_CONFIG_FILE));
    }

    #[tokio::test]
    async fn test_load_project_config() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_path(&temp_dir);
        tokio::fs::write(root.join(PROJECT_CONFIG_FILE), PROJECT).await.unwrap();

        let loader = ConfigLoader::new(root.clone());
        let (config, source) = loader.load_project_config().await.unwrap();

        assert_eq!(config.install.starting, vec!["com.example.a 1.0.0"]);
        assert_eq!(source, ConfigSource::Project(root.join(PROJECT_CONFIG_FILE)));
        assert_eq!(source.base_dir(), Some(root));
    }

    #[tokio::test]
    async fn test_load_explicit_config() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_path(&temp_dir);
        tokio::fs::write(root.join("other.toml"), PROJECT).await.unwrap();

        let loader = ConfigLoader::new(root.clone());
        let (_, source) = loader.load_explicit_config(&Utf8PathBuf::from("other.toml")).await.unwrap();
        assert_eq!(source, ConfigSource::Project(root.join("other.toml")));
    }

    #[tokio::test]
    async fn test_missing_project_config() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::new(temp_path(&temp_dir));
        // A plinth.toml in an ancestor of the temp dir would be found instead
        if loader.resolve_config_path(PROJECT_CONFIG_FILE).unwrap().exists() {
            return;
        }
        let err = loader.load_project_config().await.unwrap_err();
        assert!(err.to_string().contains("No plinth.toml found"));
    }

    #[test]
    fn test_merge_configs() {
        let mut project = parse_plinth_toml(PROJECT).unwrap();
        project.resolver.max_restarts = Some(10);

        let global = GlobalConfig {
            resolver: ResolverSection {
                policy: Some(ChoiceAlgorithm::Latest),
                max_restarts: Some(99),
            },
        };

        let env_overrides = HashMap::from([("PLINTH_CATALOG".to_string(), "env.json".to_string())]);
        let cli_overrides = HashMap::from([("policy".to_string(), "lblm".to_string())]);

        let merged = ConfigLayering::merge_configs(Some(global.clone()), project.clone(), env_overrides, HashMap::new()).unwrap();
        // Project value wins over global, global fills the gap
        assert_eq!(merged.resolver.max_restarts(), 10);
        assert_eq!(merged.resolver.policy(), ChoiceAlgorithm::Latest);
        assert_eq!(merged.install.catalog, "env.json");

        let merged = ConfigLayering::merge_configs(Some(global), project, HashMap::new(), cli_overrides).unwrap();
        assert_eq!(merged.resolver.policy(), ChoiceAlgorithm::LatestBuildOfLeastMatch);
    }

    #[test]
    fn test_invalid_overrides_rejected() {
        let project = parse_plinth_toml(PROJECT).unwrap();

        let env = HashMap::from([("PLINTH_MAX_RESTARTS".to_string(), "many".to_string())]);
        let err = ConfigLayering::merge_configs(None, project.clone(), env, HashMap::new()).unwrap_err();
        assert!(matches!(err, PlinthError::ConfigValidation { ref field, .. } if field == "PLINTH_MAX_RESTARTS"));

        let cli = HashMap::from([("policy".to_string(), "newest".to_string())]);
        let err = ConfigLayering::merge_configs(None, project, HashMap::new(), cli).unwrap_err();
        assert!(err.to_string().contains("unknown choice algorithm"));
    }

    #[test]
    fn test_collect_env_overrides() {
        std::env::set_var("PLINTH_TEST_COLLECT", "1");
        std::env::set_var("NOT_PLINTH_TEST_COLLECT", "ignored");

        let overrides = ConfigLayering::collect_env_overrides();

        assert!(overrides.contains_key("PLINTH_TEST_COLLECT"));
        assert!(!overrides.contains_key("NOT_PLINTH_TEST_COLLECT"));

        std::env::remove_var("PLINTH_TEST_COLLECT");
        std::env::remove_var("NOT_PLINTH_TEST_COLLECT");
    }
}
