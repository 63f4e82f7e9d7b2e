//! Common utilities for benchmarks

use std::sync::Arc;

use criterion::Criterion;
use plinth_catalog::{FeatureCatalog, InMemoryCatalog};
use plinth_core::types::{Feature, Target, Version};
use pprof::criterion::{Output, PProfProfiler};
use serde_json::{json, Value};

/// Configure criterion with flamegraph profiling support
pub fn criterion_config() -> Criterion {
    Criterion::default()
        .warm_up_time(std::time::Duration::from_secs(3))
        .measurement_time(std::time::Duration::from_secs(10))
        .sample_size(100)
        .with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)))
}

/// Shape of a generated catalog
#[derive(Debug, Clone, Copy)]
pub struct CatalogShape {
    /// Dependency layers below the root feature
    pub depth: usize,
    /// Features per layer
    pub width: usize,
    /// Minor releases per feature
    pub releases: u64,
    /// Builds per release
    pub builds: u64,
}

impl CatalogShape {
    pub fn feature_count(&self) -> usize {
        self.depth * self.width + 1
    }
}

fn feature_id(layer: usize, index: usize) -> String {
    format!("com.bench.l{}.f{}", layer, index)
}

/// JSON catalog where every feature of a layer requires every feature of
/// the next layer within `[1.0.0,2.0.0)`, rooted at `com.bench.root 1.0.0`
pub fn layered_catalog_json(shape: CatalogShape) -> String {
    let next_layer = |layer: usize| -> Vec<Value> {
        if layer >= shape.depth {
            return Vec::new();
        }
        (0..shape.width)
            .map(|index| json!({"id": feature_id(layer, index), "range": "[1.0.0,2.0.0)"}))
            .collect()
    };

    let mut features = vec![json!({
        "id": "com.bench.root",
        "version": "1.0.0",
        "requires": next_layer(0),
    })];

    for layer in 0..shape.depth {
        let requires = next_layer(layer + 1);
        for index in 0..shape.width {
            for minor in 0..shape.releases {
                for build in 1..=shape.builds {
                    features.push(json!({
                        "id": feature_id(layer, index),
                        "version": format!("1.{}.0.{:03}", minor, build),
                        "requires": requires.clone(),
                    }));
                }
            }
        }
    }

    json!({ "features": features }).to_string()
}

/// In-memory form of [`layered_catalog_json`]
pub fn layered_catalog(shape: CatalogShape) -> InMemoryCatalog {
    InMemoryCatalog::from_json_str(&layered_catalog_json(shape))
        .unwrap_or_else(|e| panic!("generated catalog is invalid: {}", e))
}

/// Model of the generated root feature
pub fn root_feature(catalog: &InMemoryCatalog) -> Arc<Feature> {
    catalog
        .feature_model(&Target::new("com.bench.root", Version::new(1, 0, 0)))
        .unwrap_or_else(|e| panic!("generated catalog has no root: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_catalog_shape() {
        let shape = CatalogShape {
            depth: 2,
            width: 3,
            releases: 2,
            builds: 2,
        };
        let catalog = layered_catalog(shape);
        assert_eq!(catalog.len(), 1 + 2 * 3 * 2 * 2);
        assert_eq!(catalog.available_feature_ids().len(), shape.feature_count());
        assert_eq!(root_feature(&catalog).feature_constraints.len(), 3);
    }
}
