//! Feature models as supplied by a catalog.

use serde::{Deserialize, Serialize};

use super::constraint::{ConstraintSource, TargetConstraint};
use super::range::Range;
use super::target::Target;

/// Plugin shipped inside a feature
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PluginEntry {
    pub target: Target,
    /// Operating system filter (`*` matches any)
    #[serde(default = "wildcard")]
    pub os: String,
    /// Architecture filter
    #[serde(default = "wildcard")]
    pub arch: String,
    /// Window-system filter
    #[serde(default = "wildcard")]
    pub ws: String,
    /// Whether the plugin is installed as a directory
    #[serde(default)]
    pub unpack: bool,
}

fn wildcard() -> String {
    "*".to_string()
}

impl PluginEntry {
    /// Plugin without platform filters
    pub fn new(target: Target) -> Self {
        Self {
            target,
            os: wildcard(),
            arch: wildcard(),
            ws: wildcard(),
            unpack: false,
        }
    }

    pub fn unpacked(mut self) -> Self {
        self.unpack = true;
        self
    }

    /// Restrict to a platform; `None` leaves a filter as wildcard
    pub fn for_platform(mut self, os: Option<&str>, arch: Option<&str>, ws: Option<&str>) -> Self {
        self.os = os.map_or_else(wildcard, str::to_string);
        self.arch = arch.map_or_else(wildcard, str::to_string);
        self.ws = ws.map_or_else(wildcard, str::to_string);
        self
    }
}

/// Dependency model of one feature version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    pub target: Target,
    /// Constraints on other features
    pub feature_constraints: Vec<TargetConstraint>,
    /// Constraints on plugins
    pub plugin_constraints: Vec<TargetConstraint>,
    /// Plugins this feature provides
    pub plugins: Vec<PluginEntry>,
}

impl Feature {
    /// Create a feature with no dependencies
    pub fn new(target: Target) -> Self {
        Self {
            target,
            feature_constraints: Vec::new(),
            plugin_constraints: Vec::new(),
            plugins: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.target.id
    }

    /// Provenance for constraints declared by this feature
    pub fn source(&self) -> ConstraintSource {
        ConstraintSource::Feature(self.target.clone())
    }

    /// Add a required feature constraint sourced from this feature
    pub fn requires(mut self, feature_id: &str, range: Range) -> Self {
        let constraint = TargetConstraint::new(self.source(), feature_id, range);
        self.feature_constraints.push(constraint);
        self
    }

    /// Add an optional feature constraint sourced from this feature
    pub fn optionally_requires(mut self, feature_id: &str, range: Range) -> Self {
        let constraint = TargetConstraint::new(self.source(), feature_id, range).optional();
        self.feature_constraints.push(constraint);
        self
    }

    /// Add a required plugin constraint sourced from this feature
    pub fn requires_plugin(mut self, plugin_id: &str, range: Range) -> Self {
        let constraint = TargetConstraint::new(self.source(), plugin_id, range);
        self.plugin_constraints.push(constraint);
        self
    }

    /// Declare a provided plugin
    pub fn provides(mut self, plugin: PluginEntry) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// True if some provided plugin satisfies the constraint
    pub fn provides_match(&self, constraint: &TargetConstraint) -> bool {
        self.plugins.iter().any(|p| constraint.is_match(&p.target))
    }
}
