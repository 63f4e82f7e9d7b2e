//! Structured resolution diagnostics
//!
//! Every decision the solver wants to explain is a [`Diagnostic`] tagged with
//! a [`ResultKind`]. Diagnostics flow through a [`DiagnosticSink`]; the
//! default sink forwards them to `tracing`.

use std::fmt;

use serde::Serialize;
use tracing::{debug, error, warn};

use plinth_core::types::{TargetConstraint, Version};

/// Classification of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultKind {
    // Terminal failures
    NoIntersection,
    NotFound,
    Unmatched,
    DonutHole,
    InvalidInitialState,
    FixedMismatch,
    StartingMismatchOnFixed,
    ExhaustedOptionsOnFixed,
    UnmatchedPlugins,
    MultiplePossibleFeaturesForPlugin,
    RestartLimit,

    // Advisory
    ExhaustivePluginSearch,
    NoFeaturesWithPluginConstraint,
    AssumingConstraint,
    AddingFutureConstraint,
    InferredConstraint,
    NewerReleaseAvailable,
    MismatchedStartingConstraint,
}

impl ResultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultKind::NoIntersection => "NO_INTERSECTION",
            ResultKind::NotFound => "NOT_FOUND",
            ResultKind::Unmatched => "UNMATCHED",
            ResultKind::DonutHole => "DONUT_HOLE",
            ResultKind::InvalidInitialState => "INVALID_INITIAL_STATE",
            ResultKind::FixedMismatch => "FIXED_MISMATCH",
            ResultKind::StartingMismatchOnFixed => "STARTING_MISMATCH_ON_FIXED",
            ResultKind::ExhaustedOptionsOnFixed => "EXHAUSTED_OPTIONS_ON_FIXED",
            ResultKind::UnmatchedPlugins => "UNMATCHED_PLUGINS",
            ResultKind::MultiplePossibleFeaturesForPlugin => "MULTIPLE_POSSIBLE_FEATURES_FOR_PLUGIN",
            ResultKind::RestartLimit => "RESTART_LIMIT",
            ResultKind::ExhaustivePluginSearch => "EXHAUSTIVE_PLUGIN_SEARCH",
            ResultKind::NoFeaturesWithPluginConstraint => "NO_FEATURES_WITH_PLUGIN_CONSTRAINT",
            ResultKind::AssumingConstraint => "ASSUMING_CONSTRAINT",
            ResultKind::AddingFutureConstraint => "ADDING_FUTURE_CONSTRAINT",
            ResultKind::InferredConstraint => "INFERRED_CONSTRAINT",
            ResultKind::NewerReleaseAvailable => "NEWER_RELEASE_AVAILABLE",
            ResultKind::MismatchedStartingConstraint => "MISMATCHED_STARTING_CONSTRAINT",
        }
    }

    /// Whether this kind ends a search
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ResultKind::NoIntersection
                | ResultKind::NotFound
                | ResultKind::Unmatched
                | ResultKind::DonutHole
                | ResultKind::InvalidInitialState
                | ResultKind::FixedMismatch
                | ResultKind::StartingMismatchOnFixed
                | ResultKind::ExhaustedOptionsOnFixed
                | ResultKind::UnmatchedPlugins
                | ResultKind::MultiplePossibleFeaturesForPlugin
                | ResultKind::RestartLimit
        )
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How loudly a diagnostic should be surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Warning,
    Error,
}

/// One explained solver decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: ResultKind,
    pub severity: Severity,
    /// Feature or plugin id the diagnostic is about
    pub subject: Option<String>,
    pub message: String,
    /// Constraints involved in the decision
    pub constraints: Vec<TargetConstraint>,
    /// Version chosen for the subject, if any
    pub chosen: Option<Version>,
}

impl Diagnostic {
    fn with_severity(severity: Severity, kind: ResultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            subject: None,
            message: message.into(),
            constraints: Vec::new(),
            chosen: None,
        }
    }

    pub fn debug(kind: ResultKind, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Debug, kind, message)
    }

    pub fn warning(kind: ResultKind, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Warning, kind, message)
    }

    pub fn error(kind: ResultKind, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Error, kind, message)
    }

    pub fn about(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_constraints<I>(mut self, constraints: I) -> Self
    where
        I: IntoIterator<Item = TargetConstraint>,
    {
        self.constraints.extend(constraints);
        self
    }

    pub fn with_chosen(mut self, version: Version) -> Self {
        self.chosen = Some(version);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

/// Receiver for solver diagnostics
pub trait DiagnosticSink {
    fn emit(&mut self, diagnostic: &Diagnostic);
}

impl<F: FnMut(&Diagnostic)> DiagnosticSink for F {
    fn emit(&mut self, diagnostic: &Diagnostic) {
        self(diagnostic)
    }
}

/// Default sink: logs through `tracing` at the diagnostic's severity
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&mut self, diagnostic: &Diagnostic) {
        let subject = diagnostic.subject.as_deref().unwrap_or("-");
        match diagnostic.severity {
            Severity::Debug => debug!(code = %diagnostic.kind, subject, "{}", diagnostic.message),
            Severity::Warning => warn!(code = %diagnostic.kind, subject, "{}", diagnostic.message),
            Severity::Error => error!(code = %diagnostic.kind, subject, "{}", diagnostic.message),
        }
    }
}

/// Terminal resolution failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ResolutionFailure {
    pub kind: ResultKind,
    /// Feature or plugin id the failure is about
    pub subject: String,
    pub message: String,
    /// Offending constraints
    pub constraints: Vec<TargetConstraint>,
    /// Rendered dependency tree walking back through provenance
    pub tree: String,
}

impl ResolutionFailure {
    /// Diagnostic reported when the failure ends a search
    pub fn to_diagnostic(&self) -> Diagnostic {
        let message = if self.tree.is_empty() {
            self.message.clone()
        } else {
            format!("{}\n{}", self.message, self.tree)
        };
        Diagnostic::error(self.kind, message)
            .about(self.subject.clone())
            .with_constraints(self.constraints.iter().cloned())
    }
}
