//! Feature catalog abstraction and the in-memory implementation

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use camino::Utf8Path;
use tracing::debug;

use plinth_core::error::PlinthError;
use plinth_core::types::{Feature, Target, Version};

use crate::format::CatalogFile;
use crate::CatalogResult;

/// Read-only lookup of feature versions and their dependency models.
///
/// Implementations must return the same model for the same target for the
/// lifetime of a search; wrap lazy catalogs in
/// [`MemoizedCatalog`](crate::MemoizedCatalog) to guarantee that.
pub trait FeatureCatalog {
    /// Every known version of a feature id, or `None` if the id is unknown
    fn feature_version_set(&self, id: &str) -> Option<Vec<Target>>;

    /// Full dependency model of one feature version
    fn feature_model(&self, target: &Target) -> CatalogResult<Arc<Feature>>;

    /// Every feature id the catalog knows about
    fn available_feature_ids(&self) -> BTreeSet<String>;
}

impl<C: FeatureCatalog + ?Sized> FeatureCatalog for &C {
    fn feature_version_set(&self, id: &str) -> Option<Vec<Target>> {
        (**self).feature_version_set(id)
    }

    fn feature_model(&self, target: &Target) -> CatalogResult<Arc<Feature>> {
        (**self).feature_model(target)
    }

    fn available_feature_ids(&self) -> BTreeSet<String> {
        (**self).available_feature_ids()
    }
}

impl<C: FeatureCatalog + ?Sized> FeatureCatalog for Arc<C> {
    fn feature_version_set(&self, id: &str) -> Option<Vec<Target>> {
        (**self).feature_version_set(id)
    }

    fn feature_model(&self, target: &Target) -> CatalogResult<Arc<Feature>> {
        (**self).feature_model(target)
    }

    fn available_feature_ids(&self) -> BTreeSet<String> {
        (**self).available_feature_ids()
    }
}

/// Catalog held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    features: BTreeMap<String, BTreeMap<Version, Arc<Feature>>>,
}

impl InMemoryCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a feature model, returning the one it replaced
    pub fn insert(&mut self, feature: Feature) -> Option<Arc<Feature>> {
        let target = feature.target.clone();
        self.features
            .entry(target.id)
            .or_default()
            .insert(target.version, Arc::new(feature))
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with_feature(mut self, feature: Feature) -> Self {
        self.insert(feature);
        self
    }

    /// Number of feature versions
    pub fn len(&self) -> usize {
        self.features.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Build a catalog from a parsed catalog file
    pub fn from_file(file: &CatalogFile) -> CatalogResult<Self> {
        let mut catalog = Self::new();
        for entry in &file.features {
            if catalog.insert(entry.to_feature()).is_some() {
                return Err(PlinthError::CatalogParse {
                    message: format!("duplicate entry for {}", entry.target()),
                });
            }
        }
        Ok(catalog)
    }

    /// Parse a JSON catalog document
    pub fn from_json_str(json: &str) -> CatalogResult<Self> {
        let file: CatalogFile = serde_json::from_str(json).map_err(|e| PlinthError::CatalogParse {
            message: e.to_string(),
        })?;
        Self::from_file(&file)
    }

    /// Load a JSON catalog from disk
    pub async fn load_from_file(path: &Utf8Path) -> CatalogResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| PlinthError::io(format!("Failed to read catalog {}", path), e))?;
        let catalog = Self::from_json_str(&content)?;
        debug!("Loaded {} feature versions from {}", catalog.len(), path);
        Ok(catalog)
    }
}

impl FeatureCatalog for InMemoryCatalog {
    fn feature_version_set(&self, id: &str) -> Option<Vec<Target>> {
        let versions = self.features.get(id)?;
        Some(
            versions
                .keys()
                .map(|version| Target::new(id, version.clone()))
                .collect(),
        )
    }

    fn feature_model(&self, target: &Target) -> CatalogResult<Arc<Feature>> {
        self.features
            .get(&target.id)
            .and_then(|versions| versions.get(&target.version))
            .cloned()
            .ok_or_else(|| PlinthError::ModelUnavailable {
                target: target.to_string(),
            })
    }

    fn available_feature_ids(&self) -> BTreeSet<String> {
        self.features.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plinth_core::types::Range;

    fn feature(id: &str, version: &str) -> Feature {
        Feature::new(Target::new(id, version.parse().unwrap()))
    }

    #[test]
    fn test_versions_are_sorted() {
        let catalog = InMemoryCatalog::new()
            .with_feature(feature("a", "1.1.0"))
            .with_feature(feature("a", "1.0.0"))
            .with_feature(feature("b", "2.0.0"));

        let versions = catalog.feature_version_set("a").unwrap();
        let rendered: Vec<String> = versions.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["a 1.0.0", "a 1.1.0"]);
        assert!(catalog.feature_version_set("missing").is_none());
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_feature_model_is_shared() {
        let catalog = InMemoryCatalog::new()
            .with_feature(feature("a", "1.0.0").requires("b", Range::any()));
        let target = Target::new("a", Version::new(1, 0, 0));

        let first = catalog.feature_model(&target).unwrap();
        let second = catalog.feature_model(&target).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.feature_constraints.len(), 1);
    }

    #[test]
    fn test_missing_model_is_an_error() {
        let catalog = InMemoryCatalog::new().with_feature(feature("a", "1.0.0"));
        let err = catalog
            .feature_model(&Target::new("a", Version::new(9, 0, 0)))
            .unwrap_err();
        assert!(matches!(err, PlinthError::ModelUnavailable { .. }));
    }

    #[test]
    fn test_available_ids() {
        let catalog = InMemoryCatalog::new()
            .with_feature(feature("b", "1.0.0"))
            .with_feature(feature("a", "1.0.0"));
        let ids: Vec<String> = catalog.available_feature_ids().into_iter().collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_duplicate_entries_rejected() {
        let json = r#"{"features": [
            {"id": "a", "version": "1.0.0"},
            {"id": "a", "version": "1.0.0"}
        ]}"#;
        let err = InMemoryCatalog::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("duplicate entry for a 1.0.0"));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(InMemoryCatalog::from_json_str("{not json").is_err());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(dir.path().join("catalog.json")).unwrap();
        tokio::fs::write(&path, r#"{"features": [{"id": "a", "version": "1.0.0"}]}"#)
            .await
            .unwrap();

        let catalog = InMemoryCatalog::load_from_file(&path).await.unwrap();
        assert_eq!(catalog.len(), 1);
    }
}
