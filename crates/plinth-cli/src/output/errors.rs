//! Error formatting with actionable suggestions.
//!
//! Configuration and catalog problems are [`PlinthError`]s; a search that
//! runs but fails produces a [`ResolutionFailure`] with the dependency tree
//! that led to it.

use std::error::Error;

use plinth_core::error::PlinthError;
use plinth_resolver::ResolutionFailure;

use super::colors::ColorSupport;

/// Error formatter with suggestions
pub struct ErrorFormatter {
    colors: ColorSupport,
}

impl ErrorFormatter {
    pub fn new() -> Self {
        Self::with_colors(ColorSupport::detect())
    }

    pub fn with_colors(colors: ColorSupport) -> Self {
        Self { colors }
    }

    /// Format an error with its suggestion and source chain
    pub fn format_error(&self, error: &PlinthError) -> String {
        let mut output = format!("{}: {}\n", self.colors.red("error"), error);

        if let Some(suggestion) = error.suggestion() {
            output.push_str(&format!("\n{}: {}\n", self.colors.dim("help"), suggestion));
        }

        let mut source = error.source();
        while let Some(err) = source {
            output.push_str(&format!("{}: {}\n", self.colors.dim("caused by"), err));
            source = err.source();
        }

        output
    }

    /// Format a failed search: kind, message, constraints, then the tree
    pub fn format_failure(&self, failure: &ResolutionFailure) -> String {
        let mut output = format!(
            "{} {}: {}\n",
            self.colors.red("resolution failed"),
            self.colors.bold(failure.kind.as_str()),
            failure.message
        );

        for constraint in &failure.constraints {
            output.push_str(&format!(
                "  {} {} from {}\n",
                self.colors.dim("-->"),
                constraint,
                self.colors.cyan(&constraint.source.to_string())
            ));
        }

        if !failure.tree.is_empty() {
            output.push('\n');
            output.push_str(&failure.tree);
            if !failure.tree.ends_with('\n') {
                output.push('\n');
            }
        }

        output
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}
