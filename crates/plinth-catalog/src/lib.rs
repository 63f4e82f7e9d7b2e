//! Feature catalogs for the Plinth resolver
//!
//! This crate defines the read-only catalog abstraction the solver consumes,
//! an in-memory implementation loadable from JSON, and a memoizing wrapper
//! for catalogs that build feature models lazily.

pub mod cache;
pub mod catalog;
pub mod format;

// Re-export main types
pub use cache::{CacheStats, MemoizedCatalog};
pub use catalog::{FeatureCatalog, InMemoryCatalog};
pub use format::{CatalogFile, FeatureEntry, PluginRecord, RequirementEntry};

use plinth_core::error::PlinthError;

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, PlinthError>;
