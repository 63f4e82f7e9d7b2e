//! Feature-version resolution for Plinth
//!
//! This crate picks one version of every feature reachable from a set of
//! starting features, honouring range constraints, fixed base-install
//! features and plugin requirements. Failures are explained as structured
//! diagnostics together with the chain of constraints that led to them.

pub mod algorithm;
pub mod choice;
pub mod diagnostics;
pub mod graph;
pub mod solver;

// Re-export main types
pub use algorithm::{drop_non_latest, ChoiceAlgorithm};
pub use choice::{ChoiceDetails, MismatchedConstraintsResult};
pub use diagnostics::{Diagnostic, DiagnosticSink, ResolutionFailure, ResultKind, Severity, TracingSink};
pub use graph::ProvenanceGraph;
pub use solver::{ConstraintSolver, DEFAULT_MAX_RESTARTS};
