//! plinth.toml configuration parsing and serialization

use std::collections::BTreeSet;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use plinth_core::error::PlinthError;
use plinth_core::types::{ConstraintSource, Target, TargetConstraint};
use plinth_resolver::{ChoiceAlgorithm, DEFAULT_MAX_RESTARTS};

use crate::ConfigResult;

/// Complete plinth.toml configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlinthToml {
    /// Solver settings
    #[serde(default)]
    pub resolver: ResolverSection,

    /// What to resolve
    pub install: InstallSection,
}

/// `[resolver]` section, also accepted in the global config
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolverSection {
    /// Version-selection policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<ChoiceAlgorithm>,

    /// Restarts allowed per search
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_restarts: Option<usize>,
}

/// `[install]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallSection {
    /// JSON catalog, relative to the config file
    pub catalog: Utf8PathBuf,

    /// Features to install, as `id version`
    #[serde(default)]
    pub starting: Vec<String>,

    /// Features already installed, as `id version`
    #[serde(default)]
    pub fixed: Vec<String>,

    /// Extra constraint lines, as `id range`
    #[serde(default)]
    pub contingent: Vec<String>,
}

/// Global configuration in `~/.plinth/config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub resolver: ResolverSection,
}

impl ResolverSection {
    pub fn policy(&self) -> ChoiceAlgorithm {
        self.policy.unwrap_or_default()
    }

    pub fn max_restarts(&self) -> usize {
        self.max_restarts.unwrap_or(DEFAULT_MAX_RESTARTS)
    }
}

impl InstallSection {
    pub fn starting_targets(&self) -> ConfigResult<Vec<Target>> {
        parse_targets("install.starting", &self.starting)
    }

    pub fn fixed_targets(&self) -> ConfigResult<Vec<Target>> {
        parse_targets("install.fixed", &self.fixed)
    }

    /// Parse contingent lines; `origin` names them in diagnostics
    pub fn contingent_constraints(&self, origin: &str) -> ConfigResult<Vec<TargetConstraint>> {
        self.contingent
            .iter()
            .enumerate()
            .map(|(index, line)| {
                let source = ConstraintSource::Text {
                    origin: origin.to_string(),
                    line: index + 1,
                };
                TargetConstraint::parse_line(line, source).map_err(|e| PlinthError::ConfigValidation {
                    field: "install.contingent".to_string(),
                    reason: format!("'{}': {}", line, e),
                })
            })
            .collect()
    }

    /// Catalog path resolved against the directory holding the config
    pub fn catalog_path(&self, config_dir: &Utf8Path) -> Utf8PathBuf {
        if self.catalog.is_absolute() {
            self.catalog.clone()
        } else {
            config_dir.join(&self.catalog)
        }
    }
}

fn parse_targets(field: &str, entries: &[String]) -> ConfigResult<Vec<Target>> {
    entries
        .iter()
        .map(|entry| {
            entry.parse::<Target>().map_err(|e| PlinthError::ConfigValidation {
                field: field.to_string(),
                reason: format!("'{}': {}", entry, e),
            })
        })
        .collect()
}

/// Convert a toml error into a located parse error
fn toml_error(content: &str, error: toml::de::Error) -> PlinthError {
    let (line, column) = match error.span() {
        Some(span) => {
            let before = &content[..span.start.min(content.len())];
            let line = before.matches('\n').count() + 1;
            let column = before.rfind('\n').map_or(before.len(), |nl| before.len() - nl - 1) + 1;
            (line, column)
        },
        None => (0, 0),
    };
    PlinthError::TomlParse {
        message: error.message().to_string(),
        line,
        column,
    }
}

/// Parse TOML string to PlinthToml configuration
pub fn parse_plinth_toml(content: &str) -> ConfigResult<PlinthToml> {
    let config: PlinthToml = toml::from_str(content).map_err(|e| toml_error(content, e))?;
    validate_config(&config)?;
    Ok(config)
}

/// Parse the global configuration file
pub fn parse_global_config(content: &str) -> ConfigResult<GlobalConfig> {
    toml::from_str(content).map_err(|e| toml_error(content, e))
}

/// Serialize PlinthToml to TOML string
pub fn serialize_plinth_toml(config: &PlinthToml) -> ConfigResult<String> {
    toml::to_string_pretty(config).map_err(|e| PlinthError::ConfigValidation {
        field: "config".to_string(),
        reason: format!("TOML serialization error: {}", e),
    })
}

/// Validate configuration completeness
pub fn validate_config(config: &PlinthToml) -> ConfigResult<()> {
    let install = &config.install;

    if install.catalog.as_str().is_empty() {
        return Err(PlinthError::ConfigValidation {
            field: "install.catalog".to_string(),
            reason: "a catalog path is required".to_string(),
        });
    }

    let starting = install.starting_targets()?;
    if starting.is_empty() {
        return Err(PlinthError::ConfigValidation {
            field: "install.starting".to_string(),
            reason: "at least one starting feature is required".to_string(),
        });
    }
    let fixed = install.fixed_targets()?;
    install.contingent_constraints("plinth.toml")?;

    let starting_ids = unique_ids("install.starting", &starting)?;
    let fixed_ids = unique_ids("install.fixed", &fixed)?;
    if let Some(id) = starting_ids.intersection(&fixed_ids).next() {
        return Err(PlinthError::ConfigValidation {
            field: "install.fixed".to_string(),
            reason: format!("'{}' is listed as both starting and fixed", id),
        });
    }

    Ok(())
}

fn unique_ids<'a>(field: &str, targets: &'a [Target]) -> ConfigResult<BTreeSet<&'a str>> {
    let mut ids = BTreeSet::new();
    for target in targets {
        if !ids.insert(target.id.as_str()) {
            return Err(PlinthError::ConfigValidation {
                field: field.to_string(),
                reason: format!("'{}' is listed more than once", target.id),
            });
        }
    }
    Ok(ids)
}

/// Load and parse plinth.toml from file path
pub async fn load_from_file(path: &Utf8Path) -> ConfigResult<PlinthToml> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| PlinthError::io(format!("Failed to read {}", path), e))?;

    parse_plinth_toml(&content).map_err(|e| match e {
        PlinthError::TomlParse { message, line, column } => PlinthError::TomlParse {
            message: format!("in file {}: {}", path, message),
            line,
            column,
        },
        PlinthError::ConfigValidation { field, reason } => PlinthError::ConfigValidation {
            field,
            reason: format!("in file {}: {}", path, reason),
        },
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[install]
catalog = "catalog.json"
starting = ["com.example.a 1.0.0"]
"#;

    #[test]
    fn test_parse_minimal_config() {
        let config = parse_plinth_toml(MINIMAL).unwrap();
        assert_eq!(config.install.catalog, "catalog.json");
        assert_eq!(config.resolver.policy(), ChoiceAlgorithm::LatestBuildOfLeastMatch);
        assert_eq!(config.resolver.max_restarts(), DEFAULT_MAX_RESTARTS);
        assert!(config.install.fixed.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[resolver]
policy = "latest"
max-restarts = 8

[install]
catalog = "sites/catalog.json"
starting = ["com.example.a 1.0.0", "com.example.b 2.1.0.004"]
fixed = ["org.base 3.4.0"]
contingent = ["com.example.c [1.0.0,2.0.0)", "com.example.d 1.5.0"]
"#;
        let config = parse_plinth_toml(toml).unwrap();
        assert_eq!(config.resolver.policy(), ChoiceAlgorithm::Latest);
        assert_eq!(config.resolver.max_restarts(), 8);

        let starting = config.install.starting_targets().unwrap();
        assert_eq!(starting[1].to_string(), "com.example.b 2.1.0.004");
        assert_eq!(config.install.fixed_targets().unwrap()[0].id, "org.base");

        let contingent = config.install.contingent_constraints("plinth.toml").unwrap();
        assert_eq!(contingent[0].range.to_string(), "[1.0.0,2.0.0)");
        assert_eq!(contingent[1].range.to_string(), "[1.5.0,)");
        assert_eq!(contingent[1].source.to_string(), "plinth.toml:2");
    }

    #[test]
    fn test_lblm_alias() {
        let toml = format!("[resolver]\npolicy = \"lblm\"\n{}", MINIMAL);
        let config = parse_plinth_toml(&toml).unwrap();
        assert_eq!(config.resolver.policy, Some(ChoiceAlgorithm::LatestBuildOfLeastMatch));
    }

    #[test]
    fn test_missing_starting_rejected() {
        let toml = "[install]\ncatalog = \"catalog.json\"\n";
        let err = parse_plinth_toml(toml).unwrap_err();
        assert!(matches!(err, PlinthError::ConfigValidation { ref field, .. } if field == "install.starting"));
    }

    #[test]
    fn test_invalid_entries_rejected() {
        let bad_target = "[install]\ncatalog = \"c.json\"\nstarting = [\"a\"]\n";
        assert!(parse_plinth_toml(bad_target).is_err());

        let bad_range = "[install]\ncatalog = \"c.json\"\nstarting = [\"a 1.0.0\"]\ncontingent = [\"b [2.0.0,1.0.0]\"]\n";
        assert!(parse_plinth_toml(bad_range).is_err());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let toml = "[install]\ncatalog = \"c.json\"\nstarting = [\"a 1.0.0\", \"a 2.0.0\"]\n";
        assert!(parse_plinth_toml(toml).unwrap_err().to_string().contains("more than once"));

        let toml = "[install]\ncatalog = \"c.json\"\nstarting = [\"a 1.0.0\"]\nfixed = [\"a 1.0.0\"]\n";
        assert!(parse_plinth_toml(toml).unwrap_err().to_string().contains("both starting and fixed"));
    }

    #[test]
    fn test_syntax_error_has_location() {
        let toml = "[install]\ncatalog = \"c.json\"\nstarting = [\"a 1.0.0\"\n";
        match parse_plinth_toml(toml).unwrap_err() {
            PlinthError::TomlParse { line, .. } => assert!(line >= 3),
            other => panic!("expected TomlParse, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let toml = format!("[resolver]\npolicy = \"newest\"\n{}", MINIMAL);
        assert!(matches!(parse_plinth_toml(&toml), Err(PlinthError::TomlParse { .. })));
    }

    #[test]
    fn test_round_trip_serialization() {
        let toml = r#"
[resolver]
policy = "latest"

[install]
catalog = "catalog.json"
starting = ["a 1.0.0"]
contingent = ["b [1.0.0,2.0.0)"]
"#;
        let config = parse_plinth_toml(toml).unwrap();
        let serialized = serialize_plinth_toml(&config).unwrap();
        let reparsed = parse_plinth_toml(&serialized).unwrap();
        assert_eq!(config, reparsed);
    }

    #[test]
    fn test_catalog_path_relative_to_config() {
        let config = parse_plinth_toml(MINIMAL).unwrap();
        assert_eq!(
            config.install.catalog_path(Utf8Path::new("/work/project")),
            Utf8PathBuf::from("/work/project/catalog.json")
        );
    }

    #[test]
    fn test_global_config() {
        let global = parse_global_config("[resolver]\nmax-restarts = 3\n").unwrap();
        assert_eq!(global.resolver.max_restarts(), 3);
        assert_eq!(global.resolver.policy, None);
        assert_eq!(parse_global_config("").unwrap(), GlobalConfig::default());
    }
}
