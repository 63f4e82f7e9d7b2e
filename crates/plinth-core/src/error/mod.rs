//! Error types and result aliases for Plinth operations.
//!
//! Provides a unified error type covering catalog, configuration and
//! programmer errors across the workspace. Resolution failures are not part
//! of this type: the solver reports them as values of its own.

use thiserror::Error;

use crate::types::{RangeError, VersionError};

/// Unified error type for all Plinth operations
#[derive(Error, Debug)]
pub enum PlinthError {
    // Config errors
    #[error("Failed to parse plinth.toml: {message} at line {line}, column {column}")]
    TomlParse {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // Catalog errors
    #[error("Failed to parse catalog: {message}")]
    CatalogParse { message: String },

    #[error("Feature '{id}' not found in catalog")]
    FeatureNotFound { id: String },

    #[error("Feature model for {target} is not available")]
    ModelUnavailable { target: String },

    // Model errors
    #[error(transparent)]
    Range(#[from] RangeError),

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error("{role} contribution '{id}' is listed more than once")]
    DuplicateContribution { role: &'static str, id: String },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for Plinth operations
pub type PlinthResult<T> = Result<T, PlinthError>;

impl PlinthError {
    /// Create an IO error from std::io::Error
    pub fn io(message: String, source: std::io::Error) -> Self {
        Self::Io { message, source }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PlinthError::Io { .. })
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            PlinthError::FeatureNotFound { .. } => {
                Some("Check the feature id spelling or list ids with 'plinth versions'")
            },
            PlinthError::Range(_) => {
                Some("Ranges are written as [low,high), e.g. 'com.example.feature [1.2.0,2.0.0)'")
            },
            PlinthError::DuplicateContribution { .. } => {
                Some("Each feature id may appear only once among starting or fixed features")
            },
            PlinthError::TomlParse { .. } | PlinthError::ConfigValidation { .. } => {
                Some("Run 'plinth check' to validate plinth.toml")
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Range;

    #[test]
    fn test_range_error_converts() {
        let err: PlinthError = "[2.0.0,1.0.0]".parse::<Range>().unwrap_err().into();
        assert!(err.to_string().contains("greater than"));
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn test_duplicate_contribution_message() {
        let err = PlinthError::DuplicateContribution {
            role: "starting",
            id: "com.example.a".to_string(),
        };
        assert_eq!(err.to_string(), "starting contribution 'com.example.a' is listed more than once");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_io_is_recoverable() {
        let err = PlinthError::io(
            "read catalog".to_string(),
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(err.is_recoverable());
    }
}
