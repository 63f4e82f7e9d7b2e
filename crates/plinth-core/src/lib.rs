//! # plinth-core
//!
//! Core types shared across all Plinth crates.
//!
//! This crate provides:
//! - Version and Range types with bracket-notation parsing
//! - Target, TargetConstraint and ConstraintSource for provenance-aware constraints
//! - Feature and PluginEntry models as supplied by a catalog
//! - PlinthError enum for unified error handling
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (Version, Range, Feature, etc.)
//! - `error`: Error types and result aliases

pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{PlinthError, PlinthResult};
pub use types::{
    ConstraintSource, Feature, PluginEntry, Range, RangeError, Target, TargetConstraint, Version,
    VersionError,
};
