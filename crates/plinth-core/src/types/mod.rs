//! Core data types for feature resolution.
//!
//! This module provides the fundamental types used throughout Plinth:
//! - Versions and version ranges
//! - Targets (id + version pairs)
//! - Constraints and their provenance
//! - Feature models with provided plugins

pub mod constraint;
pub mod feature;
pub mod range;
pub mod target;
pub mod version;

// Re-export all public types
pub use constraint::{ConstraintSource, TargetConstraint};
pub use feature::{Feature, PluginEntry};
pub use range::{Range, RangeError};
pub use target::Target;
pub use version::{Version, VersionError};
