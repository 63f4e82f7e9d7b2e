//! Memoizing catalog wrapper
//!
//! The solver requires that a target always yields the same feature model
//! within one search. Catalogs that build models lazily (from descriptors,
//! remote sites, ...) are wrapped in [`MemoizedCatalog`] to guarantee it.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use plinth_core::types::{Feature, Target};

use crate::catalog::FeatureCatalog;
use crate::CatalogResult;

/// Catalog wrapper that memoizes version sets and feature models
#[derive(Debug)]
pub struct MemoizedCatalog<C> {
    /// Wrapped catalog
    inner: C,
    /// Version sets by feature id (`None` for unknown ids)
    versions: DashMap<String, Option<Vec<Target>>>,
    /// Feature models by target
    models: DashMap<Target, Arc<Feature>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

/// Memoization statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of memoized version sets
    pub version_sets: usize,
    /// Number of memoized feature models
    pub models: usize,
    /// Lookups answered from memory
    pub hits: usize,
    /// Lookups forwarded to the wrapped catalog
    pub misses: usize,
}

impl<C: FeatureCatalog> MemoizedCatalog<C> {
    /// Wrap a catalog
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            versions: DashMap::new(),
            models: DashMap::new(),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Access the wrapped catalog
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Get memoization statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            version_sets: self.versions.len(),
            models: self.models.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Forget everything memoized so far
    pub fn clear(&self) {
        self.versions.clear();
        self.models.clear();
    }

    fn record(&self, hit: bool) {
        let counter = if hit { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl<C: FeatureCatalog> FeatureCatalog for MemoizedCatalog<C> {
    fn feature_version_set(&self, id: &str) -> Option<Vec<Target>> {
        if let Some(cached) = self.versions.get(id) {
            self.record(true);
            return cached.clone();
        }

        self.record(false);
        let fetched = self.inner.feature_version_set(id);
        self.versions.insert(id.to_string(), fetched.clone());
        fetched
    }

    fn feature_model(&self, target: &Target) -> CatalogResult<Arc<Feature>> {
        if let Some(cached) = self.models.get(target) {
            self.record(true);
            return Ok(cached.clone());
        }

        self.record(false);
        // Failures are not memoized so a transient error can be retried
        let model = self.inner.feature_model(target)?;
        let model = self
            .models
            .entry(target.clone())
            .or_insert(model)
            .clone();
        Ok(model)
    }

    fn available_feature_ids(&self) -> BTreeSet<String> {
        self.inner.available_feature_ids()
    }
}
