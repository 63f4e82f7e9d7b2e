//! JSON catalog file format
//!
//! A catalog file lists every known feature version together with its
//! requirements and the plugins it ships. Ranges use bracket notation.

use serde::{Deserialize, Serialize};

use plinth_core::types::{ConstraintSource, Feature, PluginEntry, Range, Target, TargetConstraint, Version};

/// Top-level catalog document
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CatalogFile {
    /// All feature versions
    #[serde(default)]
    pub features: Vec<FeatureEntry>,
}

/// One feature version
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeatureEntry {
    /// Feature id
    pub id: String,
    /// Feature version
    pub version: Version,
    /// Requirements on other features
    #[serde(default)]
    pub requires: Vec<RequirementEntry>,
    /// Requirements on plugins
    #[serde(default, rename = "plugin-requires")]
    pub plugin_requires: Vec<RequirementEntry>,
    /// Provided plugins
    #[serde(default)]
    pub plugins: Vec<PluginRecord>,
}

/// Requirement on a feature or plugin id
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RequirementEntry {
    /// Required id
    pub id: String,
    /// Accepted versions, defaults to any
    #[serde(default = "Range::any")]
    pub range: Range,
    /// Optional requirements may stay unresolved
    #[serde(default)]
    pub optional: bool,
}

/// Plugin shipped by a feature version
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PluginRecord {
    pub id: String,
    pub version: Version,
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
    #[serde(default)]
    pub ws: Option<String>,
    #[serde(default)]
    pub unpack: bool,
}

impl RequirementEntry {
    fn to_constraint(&self, source: &ConstraintSource) -> TargetConstraint {
        let constraint = TargetConstraint::new(source.clone(), self.id.clone(), self.range.clone());
        if self.optional {
            constraint.optional()
        } else {
            constraint
        }
    }
}

impl FeatureEntry {
    pub fn target(&self) -> Target {
        Target::new(self.id.clone(), self.version.clone())
    }

    /// Build the feature model this entry describes
    pub fn to_feature(&self) -> Feature {
        let mut feature = Feature::new(self.target());
        let source = feature.source();

        feature.feature_constraints = self.requires.iter().map(|r| r.to_constraint(&source)).collect();
        feature.plugin_constraints = self
            .plugin_requires
            .iter()
            .map(|r| r.to_constraint(&source))
            .collect();
        feature.plugins = self
            .plugins
            .iter()
            .map(|p| {
                let entry = PluginEntry::new(Target::new(p.id.clone(), p.version.clone())).for_platform(
                    p.os.as_deref(),
                    p.arch.as_deref(),
                    p.ws.as_deref(),
                );
                if p.unpack {
                    entry.unpacked()
                } else {
                    entry
                }
            })
            .collect();

        feature
    }
}
