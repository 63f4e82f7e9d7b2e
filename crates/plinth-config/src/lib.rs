//! Configuration parsing for Plinth
//!
//! This crate handles parsing and validation of plinth.toml and the global
//! `~/.plinth/config.toml`, layering them with environment and command-line
//! overrides.

pub mod merge;
pub mod toml;

// Re-export main types
pub use merge::{ConfigLayering, ConfigLoader, ConfigSource, PROJECT_CONFIG_FILE};
pub use toml::{GlobalConfig, InstallSection, PlinthToml, ResolverSection};

use plinth_core::error::PlinthError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, PlinthError>;
